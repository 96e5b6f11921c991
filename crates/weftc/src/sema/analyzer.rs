//! Analysis entry point
//!
//! Pass 1 declares every function and task in the root scope with its full
//! signature, so bodies and flows can refer to items declared later in the
//! file. Pass 2 analyzes bodies, then flow statements, in source order. A
//! failing item never stops its siblings.

use super::context::Context;
use super::diagnostics::Diagnostics;
use super::flow;
use super::scope::{GlobalResolver, ScopeId, ScopeTree, Symbol, SymbolKind};
use super::stmt;
use crate::common::Span;
use crate::frontend::ast::{Block, FuncDecl, ItemKind, Param, Program, TaskDecl, TypeExpr};
use crate::types::{Params, Type};
use std::sync::Arc;
use tracing::{debug, trace};

/// Output of one analysis run
#[derive(Debug)]
pub struct AnalysisResult {
    pub symbols: ScopeTree,
    pub diagnostics: Diagnostics,
}

impl AnalysisResult {
    pub fn is_ok(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Semantic analyzer. Holds only the shared resolver; every call to
/// `analyze` starts from a fresh context.
#[derive(Clone, Default)]
pub struct Analyzer {
    resolver: Option<Arc<dyn GlobalResolver>>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: Arc<dyn GlobalResolver>) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    pub fn analyze(&self, program: &Program) -> AnalysisResult {
        let mut ctx = Context::new(self.resolver.clone());
        let root = ctx.scopes.root();

        debug!(items = program.items.len(), "declaring top-level items");
        let declared: Vec<Option<ScopeId>> = program
            .items
            .iter()
            .map(|item| match &item.kind {
                ItemKind::Function(func) => declare_function(&mut ctx, root, func),
                ItemKind::Task(task) => declare_task(&mut ctx, root, task),
                ItemKind::Flow(_) => None,
            })
            .collect();

        debug!("analyzing bodies");
        for (item, scope) in program.items.iter().zip(&declared) {
            let Some(scope) = *scope else {
                continue;
            };
            match &item.kind {
                ItemKind::Function(func) => {
                    analyze_body(&mut ctx, scope, &func.name, "function", &[], &func.params, func.ret.as_ref(), &func.body);
                }
                ItemKind::Task(task) => {
                    analyze_body(&mut ctx, scope, &task.name, "task", &task.config, &task.params, task.ret.as_ref(), &task.body);
                }
                ItemKind::Flow(_) => {}
            }
        }

        debug!("analyzing flows");
        for flow_stmt in program.flows() {
            flow::analyze(&mut ctx, root, flow_stmt);
        }

        debug!(diagnostics = ctx.diagnostics.len(), "analysis finished");
        AnalysisResult {
            symbols: ctx.scopes,
            diagnostics: ctx.diagnostics,
        }
    }
}

/// Build an ordered parameter list, reporting each duplicate at the
/// first declaration of the name. The flag is false if any name repeats.
fn collect_params<'a>(ctx: &mut Context, lists: impl IntoIterator<Item = &'a [Param]>) -> (Params, bool) {
    let mut params = Params::new();
    let mut first_seen: Vec<(&str, Span)> = Vec::new();
    let mut ok = true;

    for param in lists.into_iter().flatten() {
        if params.insert(param.name.clone(), param.ty.to_type()) {
            first_seen.push((&param.name, param.span));
        } else {
            let span = first_seen
                .iter()
                .find(|(name, _)| *name == param.name)
                .map_or(param.span, |(_, span)| *span);
            ctx.error(format!("duplicate parameter {}", param.name), span);
            ok = false;
        }
    }

    (params, ok)
}

fn declare_function(ctx: &mut Context, root: ScopeId, func: &FuncDecl) -> Option<ScopeId> {
    let (params, ok) = collect_params(ctx, [func.params.as_slice()]);
    let ret = func.ret.as_ref().map(TypeExpr::to_type);
    let ty = Type::function(params, ret);
    trace!(name = %func.name, ty = %ty, "declaring function");

    let id = ctx.declare(root, Symbol::new(&func.name, SymbolKind::Function, ty).with_span(func.span))?;
    ok.then_some(id)
}

fn declare_task(ctx: &mut Context, root: ScopeId, task: &TaskDecl) -> Option<ScopeId> {
    // Config and runtime parameters share one namespace
    let (_, ok) = collect_params(ctx, [task.config.as_slice(), task.params.as_slice()]);
    let config: Params = task.config.iter().map(|p| (p.name.as_str(), p.ty.to_type())).collect();
    let params: Params = task.params.iter().map(|p| (p.name.as_str(), p.ty.to_type())).collect();

    let ret = task.ret.as_ref().map(TypeExpr::to_type);
    let ty = Type::task(config, params, ret);
    trace!(name = %task.name, ty = %ty, "declaring task");

    let id = ctx.declare(root, Symbol::new(&task.name, SymbolKind::Task, ty).with_span(task.span))?;
    ok.then_some(id)
}

/// Declare config and runtime parameters under the item scope, analyze the
/// body, then require a return on every path when a value is expected
#[allow(clippy::too_many_arguments)]
fn analyze_body(
    ctx: &mut Context,
    scope: ScopeId,
    name: &str,
    what: &str,
    config: &[Param],
    params: &[Param],
    ret: Option<&TypeExpr>,
    body: &Block,
) {
    for param in config {
        let symbol = Symbol::new(&param.name, SymbolKind::ConfigParam, param.ty.to_type()).with_span(param.span);
        if ctx.declare(scope, symbol).is_none() {
            return;
        }
    }
    for param in params {
        let symbol = Symbol::new(&param.name, SymbolKind::Param, param.ty.to_type()).with_span(param.span);
        if ctx.declare(scope, symbol).is_none() {
            return;
        }
    }

    if stmt::analyze_block(ctx, scope, body).is_none() {
        return;
    }

    if let Some(ret) = ret {
        if !stmt::returns_on_all_paths(body) {
            let ret = ret.to_type();
            let span = ctx.scopes.symbol(scope).and_then(|s| s.span).unwrap_or(body.span);
            ctx.error(
                format!("{what} '{name}' must return a value of type {ret} on all paths"),
                span,
            );
        }
    }
}
