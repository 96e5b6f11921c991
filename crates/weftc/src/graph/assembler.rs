//! Assembler - converts an analyzed program to a node/edge graph

use super::module::*;
use crate::common::{CompileResult, Span};
use crate::frontend::ast::{ConfigValues, FlowNodeKind, FlowStmt, Program};
use crate::sema::{AnalysisResult, EXPR_TASK_PREFIX, ScopeId, ScopeTree, SymbolKind};
use crate::types::Type;
use indexmap::IndexMap;
use tracing::trace;

/// Produces the compiled bodies embedded in a `Module`
pub trait BytecodeGenerator {
    fn generate(&self, program: &Program, analysis: &AnalysisResult) -> CompileResult<Vec<u8>>;
}

/// Generator that emits an empty blob
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBytecode;

impl BytecodeGenerator for NoBytecode {
    fn generate(&self, _program: &Program, _analysis: &AnalysisResult) -> CompileResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Builds a `Module` from a program and its analysis. Performs no
/// validation: callers must only assemble programs without errors.
pub struct Assembler<'a> {
    source: &'a str,
    module: Module,
    node_counter: usize,
}

impl<'a> Assembler<'a> {
    /// `source` is the text the program was parsed from; config values are
    /// sliced out of it verbatim
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            module: Module::new(),
            node_counter: 0,
        }
    }

    pub fn assemble(&mut self, program: &Program, analysis: &AnalysisResult, wasm: Vec<u8>) -> Module {
        let symbols = &analysis.symbols;
        let root = symbols.root();

        for task in program.tasks() {
            if let Some(Type::Task(ty)) = symbols.find(root, &task.name).and_then(|id| symbols.scope(id).ty()) {
                self.module.tasks.push(TaskRecord::new(&task.name, ty));
            }
        }
        for id in synthesized_tasks(symbols, root) {
            let scope = symbols.scope(id);
            if let (Some(name), Some(Type::Task(ty))) = (scope.name(), scope.ty()) {
                self.module.tasks.push(TaskRecord::new(name, ty));
            }
        }
        for func in program.functions() {
            if let Some(Type::Function(ty)) = symbols.find(root, &func.name).and_then(|id| symbols.scope(id).ty()) {
                self.module
                    .functions
                    .push(FunctionRecord::new(&func.name, &ty.params, ty.ret.as_deref()));
            }
        }

        for flow in program.flows() {
            self.assemble_flow(symbols, flow);
        }

        self.module.wasm = wasm;
        self.node_counter = 0;
        std::mem::take(&mut self.module)
    }

    fn assemble_flow(&mut self, symbols: &ScopeTree, flow: &FlowStmt) {
        let mut prev: Option<String> = None;

        for (i, flow_node) in flow.nodes.iter().enumerate() {
            let node = match &flow_node.kind {
                FlowNodeKind::Channel(name) if names_task(symbols, name) => Node {
                    key: self.new_key(name),
                    node_type: name.clone(),
                    config: IndexMap::new(),
                },
                FlowNodeKind::Channel(channel) => {
                    // A leading channel feeds the flow; any later one is a sink
                    let base = if i == 0 { ON_NODE } else { WRITE_NODE };
                    let mut config = IndexMap::new();
                    config.insert("channel".to_string(), channel.clone());
                    Node {
                        key: self.new_key(base),
                        node_type: base.to_string(),
                        config,
                    }
                }
                FlowNodeKind::Task(invocation) => {
                    let config = match &invocation.config {
                        ConfigValues::Named(values) => values
                            .iter()
                            .map(|v| (v.name.clone(), v.value.span.slice(self.source).to_string()))
                            .collect(),
                        ConfigValues::Anonymous(_) => IndexMap::new(),
                    };
                    Node {
                        key: self.new_key(&invocation.name),
                        node_type: invocation.name.clone(),
                        config,
                    }
                }
                FlowNodeKind::Expr(_) => {
                    let name = synthesized_for(symbols, flow_node.span)
                        .unwrap_or_else(|| self.new_key("expression"));
                    Node {
                        key: name.clone(),
                        node_type: name,
                        config: IndexMap::new(),
                    }
                }
            };
            trace!(key = %node.key, node_type = %node.node_type, "emitting node");

            if let Some(prev) = prev.take() {
                self.module.edges.push(Edge {
                    source: Handle::new(prev, OUTPUT_PARAM),
                    target: Handle::new(node.key.clone(), INPUT_PARAM),
                });
            }
            prev = Some(node.key.clone());
            self.module.nodes.push(node);
        }
    }

    fn new_key(&mut self, base: &str) -> String {
        let key = format!("{base}_{}", self.node_counter);
        self.node_counter += 1;
        key
    }
}

fn synthesized_tasks(symbols: &ScopeTree, root: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
    symbols
        .children_of_kind(root, SymbolKind::Task)
        .filter(|id| symbols.scope(*id).name().is_some_and(|n| n.starts_with(EXPR_TASK_PREFIX)))
}

/// Whether a bare flow identifier refers to a task rather than a channel
fn names_task(symbols: &ScopeTree, name: &str) -> bool {
    symbols
        .resolve(symbols.root(), name)
        .is_ok_and(|symbol| symbol.kind == SymbolKind::Task)
}

/// Name of the task synthesized for the expression at `span`
fn synthesized_for(symbols: &ScopeTree, span: Span) -> Option<String> {
    let root = symbols.root();
    synthesized_tasks(symbols, root)
        .find(|id| symbols.symbol(*id).and_then(|s| s.span) == Some(span))
        .and_then(|id| symbols.scope(id).name().map(str::to_string))
}
