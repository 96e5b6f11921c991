//! Weft AST definitions

mod expr;
mod item;
mod stmt;
mod types;

pub use expr::*;
pub use item::*;
pub use stmt::*;
pub use types::*;

use crate::common::Span;

/// A complete source file
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

impl Program {
    pub fn new(items: Vec<Item>, span: Span) -> Self {
        Self { items, span }
    }

    pub fn functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Function(func) => Some(func),
            _ => None,
        })
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskDecl> {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Task(task) => Some(task),
            _ => None,
        })
    }

    pub fn flows(&self) -> impl Iterator<Item = &FlowStmt> {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Flow(flow) => Some(flow),
            _ => None,
        })
    }
}
