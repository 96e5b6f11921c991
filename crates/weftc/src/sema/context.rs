//! Mutable state threaded through one analysis run

use super::diagnostics::Diagnostics;
use super::scope::{GlobalResolver, ScopeId, ScopeTree, Symbol, SymbolKind};
use crate::common::Span;
use crate::types::Type;
use std::borrow::Cow;
use std::sync::Arc;

/// Prefix of tasks synthesized from inline flow expressions
pub const EXPR_TASK_PREFIX: &str = "__expr_task_";

/// Symbol tree, diagnostics and name counters for a single `analyze` call.
/// Nothing here outlives the call, so independent programs can be analyzed
/// in parallel as long as they only share the resolver.
pub struct Context {
    pub scopes: ScopeTree,
    pub diagnostics: Diagnostics,
    expr_tasks: usize,
}

impl Context {
    pub fn new(resolver: Option<Arc<dyn GlobalResolver>>) -> Self {
        Self {
            scopes: ScopeTree::new(resolver),
            diagnostics: Diagnostics::new(),
            expr_tasks: 0,
        }
    }

    pub fn error(&mut self, message: impl Into<String>, span: Span) {
        self.diagnostics.add_error(message, Some(span));
    }

    /// Add a symbol under `parent`, reporting a conflict as a diagnostic
    pub fn declare(&mut self, parent: ScopeId, symbol: Symbol) -> Option<ScopeId> {
        let span = symbol.span.unwrap_or_default();
        match self.scopes.add(parent, symbol) {
            Ok(id) => Some(id),
            Err(err) => {
                self.error(err.to_string(), span);
                None
            }
        }
    }

    /// Resolve a name, reporting an undefined symbol at `span`
    pub fn resolve(&mut self, scope: ScopeId, name: &str, span: Span) -> Option<Symbol> {
        let resolved = self.scopes.resolve(scope, name).map(Cow::into_owned);
        match resolved {
            Ok(symbol) => Some(symbol),
            Err(err) => {
                self.error(err.to_string(), span);
                None
            }
        }
    }

    pub fn next_expr_task_name(&mut self) -> String {
        let name = format!("{EXPR_TASK_PREFIX}{}", self.expr_tasks);
        self.expr_tasks += 1;
        name
    }

    /// Note on the enclosing task that it reads `channel`
    pub fn record_channel_read(&mut self, scope: ScopeId, channel: &str) {
        if let Some(Type::Task(task)) = self.enclosing_task_type(scope) {
            task.channels.read.insert(channel.to_string());
        }
    }

    /// Note on the enclosing task that it writes `channel`
    pub fn record_channel_write(&mut self, scope: ScopeId, channel: &str) {
        if let Some(Type::Task(task)) = self.enclosing_task_type(scope) {
            task.channels.write.insert(channel.to_string());
        }
    }

    fn enclosing_task_type(&mut self, scope: ScopeId) -> Option<&mut Type> {
        let task = self.scopes.closest_ancestor_of_kind(scope, SymbolKind::Task)?;
        self.scopes.symbol_mut(task)?.ty.as_mut()
    }
}
