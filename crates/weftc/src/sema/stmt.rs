//! Statement analysis
//!
//! Every function returns `None` once a diagnostic has been recorded. A
//! block stops at its first failing statement.

use super::context::Context;
use super::expr;
use super::scope::{ScopeId, Symbol, SymbolKind};
use crate::common::Span;
use crate::frontend::ast::{Block, Expr, IfStmt, Stmt, StmtKind, TypeExpr, VarDecl};
use crate::types::{Type, compatible, literal_compatible};
use std::borrow::Cow;

/// Analyze `block` in a new block scope under `parent`
pub fn analyze_block(ctx: &mut Context, parent: ScopeId, block: &Block) -> Option<()> {
    let scope = ctx.declare(parent, Symbol::block(block.span))?;
    for stmt in &block.stmts {
        analyze_stmt(ctx, scope, stmt)?;
    }
    Some(())
}

pub fn analyze_stmt(ctx: &mut Context, scope: ScopeId, stmt: &Stmt) -> Option<()> {
    match &stmt.kind {
        StmtKind::Local(decl) => analyze_var_decl(ctx, scope, decl, SymbolKind::Variable, stmt.span),
        StmtKind::Stateful(decl) => {
            analyze_var_decl(ctx, scope, decl, SymbolKind::StatefulVariable, stmt.span)
        }
        StmtKind::Assign {
            target,
            target_span,
            value,
        } => analyze_assign(ctx, scope, target, *target_span, value),
        StmtKind::BlockingRead {
            name,
            channel,
            channel_span,
        } => analyze_blocking_read(ctx, scope, name, channel, *channel_span, stmt.span),
        StmtKind::ChannelWrite {
            channel,
            channel_span,
            value,
        } => analyze_channel_write(ctx, scope, channel, *channel_span, value),
        StmtKind::If(if_stmt) => analyze_if(ctx, scope, if_stmt),
        StmtKind::Return(value) => analyze_return(ctx, scope, value.as_ref(), stmt.span),
        StmtKind::Expr(e) => expr::check(ctx, scope, e, None).map(|_| ()),
    }
}

fn analyze_var_decl(
    ctx: &mut Context,
    scope: ScopeId,
    decl: &VarDecl,
    kind: SymbolKind,
    span: Span,
) -> Option<()> {
    // `v := sensor` samples the channel instead of aliasing it
    if decl.ty.is_none() {
        if let Some(channel) = decl.value.as_identifier() {
            let symbol = ctx.resolve(scope, channel, decl.value.span)?;
            if let Some(Type::Chan(elem)) = symbol.ty {
                ctx.record_channel_read(scope, channel);
                let kind = if kind == SymbolKind::Variable {
                    SymbolKind::Channel
                } else {
                    kind
                };
                ctx.declare(scope, Symbol::new(&decl.name, kind, *elem).with_span(span))?;
                return Some(());
            }
        }
    }

    let Some(declared) = decl.ty.as_ref().map(TypeExpr::to_type) else {
        let value_ty = expr::check(ctx, scope, &decl.value, None)?;
        ctx.declare(scope, Symbol::new(&decl.name, kind, value_ty).with_span(span))?;
        return Some(());
    };

    // An annotated stateful variable is visible in its own initializer,
    // where it holds the value kept from the previous invocation
    if kind == SymbolKind::StatefulVariable {
        ctx.declare(scope, Symbol::new(&decl.name, kind, declared.clone()).with_span(span))?;
        return check_initializer(ctx, scope, &declared, &decl.value);
    }

    check_initializer(ctx, scope, &declared, &decl.value)?;
    ctx.declare(scope, Symbol::new(&decl.name, kind, declared).with_span(span))?;
    Some(())
}

/// Literal initializers may narrow to the annotation; anything else must
/// match it exactly
fn check_initializer(ctx: &mut Context, scope: ScopeId, declared: &Type, value: &Expr) -> Option<()> {
    let value_ty = expr::check(ctx, scope, value, Some(declared))?;
    let ok = if value.is_literal() {
        literal_compatible(declared, &value_ty)
    } else {
        compatible(declared, &value_ty)
    };
    if !ok {
        ctx.error(
            format!("type mismatch: cannot assign {value_ty} to {declared}"),
            value.span,
        );
        return None;
    }
    Some(())
}

fn analyze_assign(ctx: &mut Context, scope: ScopeId, target: &str, target_span: Span, value: &Expr) -> Option<()> {
    let symbol = ctx.resolve(scope, target, target_span)?;
    let Some(target_ty) = symbol.ty else {
        ctx.error(format!("{target} is not a variable"), target_span);
        return None;
    };

    let value_ty = expr::check(ctx, scope, value, Some(target_ty.unwrap_chan()))?;
    if !compatible(&target_ty, &value_ty) {
        ctx.error(
            format!("type mismatch: cannot assign {value_ty} to variable of type {target_ty}"),
            value.span,
        );
        return None;
    }
    Some(())
}

/// Look up `channel` and return its element type
fn resolve_channel(ctx: &mut Context, scope: ScopeId, channel: &str, span: Span) -> Option<Type> {
    let resolved = ctx.scopes.resolve(scope, channel).map(Cow::into_owned);
    let Ok(symbol) = resolved else {
        ctx.error(format!("undefined channel: {channel}"), span);
        return None;
    };
    match &symbol.ty {
        Some(Type::Chan(elem)) => Some(elem.as_ref().clone()),
        _ => {
            ctx.error(format!("{channel} is not a channel"), span);
            None
        }
    }
}

fn analyze_blocking_read(
    ctx: &mut Context,
    scope: ScopeId,
    name: &str,
    channel: &str,
    channel_span: Span,
    span: Span,
) -> Option<()> {
    let elem = resolve_channel(ctx, scope, channel, channel_span)?;
    ctx.record_channel_read(scope, channel);
    ctx.declare(scope, Symbol::new(name, SymbolKind::Variable, elem).with_span(span))?;
    Some(())
}

fn analyze_channel_write(
    ctx: &mut Context,
    scope: ScopeId,
    channel: &str,
    channel_span: Span,
    value: &Expr,
) -> Option<()> {
    let elem = resolve_channel(ctx, scope, channel, channel_span)?;
    ctx.record_channel_write(scope, channel);

    let value_ty = expr::check(ctx, scope, value, Some(&elem))?;
    if !compatible(&elem, &value_ty) {
        ctx.error(
            format!("type mismatch: cannot write {value_ty} to channel of type {elem}"),
            value.span,
        );
        return None;
    }
    Some(())
}

fn analyze_if(ctx: &mut Context, scope: ScopeId, stmt: &IfStmt) -> Option<()> {
    for (cond, block) in &stmt.branches {
        expr::check(ctx, scope, cond, None)?;
        analyze_block(ctx, scope, block)?;
    }
    if let Some(block) = &stmt.else_block {
        analyze_block(ctx, scope, block)?;
    }
    Some(())
}

fn analyze_return(ctx: &mut Context, scope: ScopeId, value: Option<&Expr>, span: Span) -> Option<()> {
    let owner = ctx
        .scopes
        .closest_ancestor_of_kind(scope, SymbolKind::Function)
        .or_else(|| ctx.scopes.closest_ancestor_of_kind(scope, SymbolKind::Task));
    let Some(owner) = owner else {
        ctx.error("return statement not in function or task", span);
        return None;
    };
    let expected = ctx
        .scopes
        .scope(owner)
        .ty()
        .and_then(Type::return_type)
        .cloned();

    match (value, expected) {
        (Some(value), Some(expected)) => {
            let value_ty = expr::check(ctx, scope, value, Some(&expected))?;
            if !compatible(&expected, &value_ty) {
                ctx.error(
                    format!("type mismatch: cannot return {value_ty}, expected {expected}"),
                    value.span,
                );
                return None;
            }
        }
        (Some(value), None) => {
            ctx.error(
                "unexpected return value in function/task with void return type",
                value.span,
            );
            return None;
        }
        (None, Some(expected)) => {
            ctx.error(format!("return statement missing value of type {expected}"), span);
            return None;
        }
        (None, None) => {}
    }
    Some(())
}

/// Whether every path through `block` ends in a `return`
pub fn returns_on_all_paths(block: &Block) -> bool {
    block.stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If(if_stmt) => match &if_stmt.else_block {
            Some(else_block) => {
                if_stmt
                    .branches
                    .iter()
                    .all(|(_, branch)| returns_on_all_paths(branch))
                    && returns_on_all_paths(else_block)
            }
            None => false,
        },
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::ItemKind;
    use crate::frontend::parse;

    fn body(source: &str) -> Block {
        let program = parse(source).unwrap();
        match program.items.into_iter().next().map(|item| item.kind) {
            Some(ItemKind::Function(f)) => f.body,
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_returns_on_all_paths() {
        assert!(returns_on_all_paths(&body("func f() i32 {\n\treturn 1\n}")));
        assert!(!returns_on_all_paths(&body("func f() i32 {\n\tx := 1\n}")));
        assert!(returns_on_all_paths(&body(
            "func f(x i32) i32 {\n\tif x > 0 {\n\t\treturn 1\n\t} else if x < 0 {\n\t\treturn 2\n\t} else {\n\t\treturn 3\n\t}\n}"
        )));
        assert!(!returns_on_all_paths(&body(
            "func f(x i32) i32 {\n\tif x > 0 {\n\t\treturn 1\n\t} else {\n\t\ty := 2\n\t}\n}"
        )));
        assert!(!returns_on_all_paths(&body(
            "func f(x i32) i32 {\n\tif x > 0 {\n\t\treturn 1\n\t}\n}"
        )));
    }
}
