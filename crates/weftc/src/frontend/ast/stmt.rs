//! Statement AST nodes

use super::{Expr, TypeExpr};
use crate::common::Span;

/// A braced statement list
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// x i32 := 1
    Local(VarDecl),
    /// count $= 0
    Stateful(VarDecl),
    /// x = x + 1
    Assign {
        target: String,
        target_span: Span,
        value: Expr,
    },
    /// v := <-ch
    BlockingRead {
        name: String,
        channel: String,
        channel_span: Span,
    },
    /// ch <- v, or v -> ch
    ChannelWrite {
        channel: String,
        channel_span: Span,
        value: Expr,
    },
    If(IfStmt),
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
}

/// if / else if / else chain
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub branches: Vec<(Expr, Block)>,
    pub else_block: Option<Block>,
}
