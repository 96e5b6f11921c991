//! Top-level declarations and flow statements

use super::{Block, Expr, TypeExpr};
use crate::common::Span;

/// A top-level item
#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

impl Item {
    pub fn new(kind: ItemKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    /// func name(params) ret { }
    Function(FuncDecl),
    /// task name{config}(params) ret { }
    Task(TaskDecl),
    /// a -> b{} -> c
    Flow(FlowStmt),
}

/// A named, typed parameter (runtime or config)
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TaskDecl {
    pub name: String,
    pub config: Vec<Param>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

/// A reactive pipeline: two or more nodes joined by `->`
#[derive(Debug, Clone)]
pub struct FlowStmt {
    pub nodes: Vec<FlowNode>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FlowNode {
    pub kind: FlowNodeKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum FlowNodeKind {
    /// Bare channel identifier
    Channel(String),
    /// Task invocation with a config block
    Task(TaskInvocation),
    /// Any other value expression
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct TaskInvocation {
    pub name: String,
    pub config: ConfigValues,
}

#[derive(Debug, Clone)]
pub enum ConfigValues {
    Named(Vec<NamedValue>),
    Anonymous(Vec<Expr>),
}

impl ConfigValues {
    pub fn is_empty(&self) -> bool {
        match self {
            ConfigValues::Named(values) => values.is_empty(),
            ConfigValues::Anonymous(values) => values.is_empty(),
        }
    }
}

/// `key: value` inside a config block
#[derive(Debug, Clone)]
pub struct NamedValue {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}
