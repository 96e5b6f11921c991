//! Expression checking and type inference
//!
//! `check` validates an expression and computes its type in one pass. A
//! `None` result means a diagnostic has already been recorded and the
//! enclosing statement should stop.

use super::context::Context;
use super::scope::ScopeId;
use crate::common::Span;
use crate::frontend::ast::{BinOp, Builtin, Expr, ExprKind, Literal, UnaryOp};
use crate::types::{Type, compatible};

/// Type of `expr` as seen from `scope`. `hint` is the type the context
/// expects; it only steers literal inference.
pub fn check(ctx: &mut Context, scope: ScopeId, expr: &Expr, hint: Option<&Type>) -> Option<Type> {
    match &expr.kind {
        ExprKind::Literal(lit) => Some(literal_type(lit, hint)),
        ExprKind::Identifier(name) => check_identifier(ctx, scope, name, expr.span),
        ExprKind::Binary { op, left, right } => check_binary(ctx, scope, *op, left, right, hint),
        ExprKind::Unary { op, operand } => check_unary(ctx, scope, *op, operand, hint),

        ExprKind::Index { target, index } => {
            let target_ty = check(ctx, scope, target, None)?;
            check(ctx, scope, index, None)?;
            match target_ty {
                Type::Series(elem) => Some(*elem),
                other => Some(other),
            }
        }
        ExprKind::Slice { target, start, end } => {
            let target_ty = check(ctx, scope, target, None)?;
            for bound in [start, end].into_iter().flatten() {
                check(ctx, scope, bound, None)?;
            }
            Some(target_ty)
        }

        ExprKind::Call { callee, args } => {
            let callee_ty = check(ctx, scope, callee, None)?;
            for arg in args {
                check(ctx, scope, arg, None)?;
            }
            if let Type::Function(func) = &callee_ty {
                if let Some(ret) = &func.ret {
                    return Some(ret.as_ref().clone());
                }
            }
            Some(callee_ty)
        }

        ExprKind::Cast { ty, expr: inner } => {
            check(ctx, scope, inner, None)?;
            Some(ty.to_type())
        }

        ExprKind::Builtin { func, args } => check_builtin(ctx, scope, *func, args, expr.span),
        ExprKind::Series(elems) => check_series(ctx, scope, elems, hint, expr.span),
        ExprKind::Paren(inner) => check(ctx, scope, inner, hint),
    }
}

/// Literal type given the expected type of its context
pub fn literal_type(lit: &Literal, hint: Option<&Type>) -> Type {
    let hint = hint.map(Type::unwrap_chan);
    match lit {
        Literal::Integer(_) => match hint {
            Some(h) if h.is_numeric() => h.clone(),
            _ => Type::I64,
        },
        Literal::Float(_) => match hint {
            Some(h) if h.is_float() => h.clone(),
            _ => Type::F64,
        },
        Literal::String(_) => Type::String,
        Literal::Bool(_) => Type::U8,
        Literal::Duration(_) | Literal::Frequency(_) => Type::TimeSpan,
    }
}

fn check_identifier(ctx: &mut Context, scope: ScopeId, name: &str, span: Span) -> Option<Type> {
    let symbol = ctx.resolve(scope, name, span)?;
    let Some(ty) = symbol.ty else {
        ctx.error(format!("{name} is not a value"), span);
        return None;
    };
    if ty.is_chan() {
        ctx.record_channel_read(scope, name);
    }
    Some(ty)
}

fn check_binary(
    ctx: &mut Context,
    scope: ScopeId,
    op: BinOp,
    left: &Expr,
    right: &Expr,
    hint: Option<&Type>,
) -> Option<Type> {
    // Comparisons produce booleans, so the outer hint says nothing about
    // their operands.
    let outer = if op.is_comparison() { None } else { hint };

    // A literal takes its type from the non-literal side of the pair.
    let (left_ty, right_ty) = if left.is_literal() && !right.is_literal() {
        let right_ty = check(ctx, scope, right, outer)?;
        let left_ty = check(ctx, scope, left, Some(right_ty.unwrap_chan()))?;
        (left_ty, right_ty)
    } else {
        let left_ty = check(ctx, scope, left, outer)?;
        let right_ty = check(ctx, scope, right, Some(left_ty.unwrap_chan()))?;
        (left_ty, right_ty)
    };

    let operand = left_ty.unwrap_chan();
    let category_ok = if op.is_logical() {
        operand.is_bool()
    } else if op.is_equality() || op.is_relational() {
        true
    } else {
        operand.is_numeric()
    };
    if !category_ok {
        ctx.error(format!("cannot use {left_ty} in {op} operation"), left.span);
        return None;
    }

    if !compatible(&left_ty, &right_ty) {
        ctx.error(
            format!("type mismatch: cannot use {left_ty} and {right_ty} in {op} operation"),
            left.span.to(right.span),
        );
        return None;
    }

    if op.is_comparison() {
        Some(Type::U8)
    } else {
        Some(operand.clone())
    }
}

fn check_unary(ctx: &mut Context, scope: ScopeId, op: UnaryOp, operand: &Expr, hint: Option<&Type>) -> Option<Type> {
    match op {
        UnaryOp::Neg => {
            let ty = check(ctx, scope, operand, hint)?;
            if !ty.unwrap_chan().is_numeric() {
                ctx.error(format!("operator - not supported for type {ty}"), operand.span);
                return None;
            }
            Some(ty.unwrap_chan().clone())
        }
        UnaryOp::Not => {
            let ty = check(ctx, scope, operand, None)?;
            if !ty.unwrap_chan().is_bool() {
                ctx.error(format!("operator ! requires boolean operand, received {ty}"), operand.span);
                return None;
            }
            Some(Type::U8)
        }
    }
}

fn check_builtin(ctx: &mut Context, scope: ScopeId, func: Builtin, args: &[Expr], span: Span) -> Option<Type> {
    let (name, arity, ty) = match func {
        Builtin::Len => ("len", 1, Type::I64),
        Builtin::Now => ("now", 0, Type::TimeStamp),
    };
    if args.len() != arity {
        ctx.error(
            format!("{name} expects {arity} argument(s), received {}", args.len()),
            span,
        );
        return None;
    }
    for arg in args {
        check(ctx, scope, arg, None)?;
    }
    Some(ty)
}

fn check_series(ctx: &mut Context, scope: ScopeId, elems: &[Expr], hint: Option<&Type>, span: Span) -> Option<Type> {
    let elem_hint = match hint.map(Type::unwrap_chan) {
        Some(Type::Series(elem)) => Some(elem.as_ref()),
        _ => None,
    };

    let Some((first, rest)) = elems.split_first() else {
        return match hint.map(Type::unwrap_chan) {
            Some(series @ Type::Series(_)) => Some(series.clone()),
            _ => {
                ctx.error("cannot infer the element type of an empty series", span);
                None
            }
        };
    };

    let first_ty = check(ctx, scope, first, elem_hint)?;
    let elem = first_ty.unwrap_chan().clone();
    if !elem.is_primitive() {
        ctx.error(format!("series elements must be primitive, received {first_ty}"), first.span);
        return None;
    }

    for next in rest {
        let next_ty = check(ctx, scope, next, Some(&elem))?;
        if !compatible(&elem, &next_ty) {
            ctx.error(
                format!("type mismatch: cannot use {elem} and {next_ty} in series literal"),
                next.span,
            );
            return None;
        }
    }

    Some(Type::series(elem))
}

/// Identifiers at the leaves of an expression, in source order. Call
/// targets are not leaves.
pub fn leaf_identifiers(expr: &Expr) -> Vec<(&str, Span)> {
    let mut leaves = Vec::new();
    collect_leaves(expr, &mut leaves);
    leaves
}

fn collect_leaves<'a>(expr: &'a Expr, leaves: &mut Vec<(&'a str, Span)>) {
    match &expr.kind {
        ExprKind::Identifier(name) => leaves.push((name.as_str(), expr.span)),
        ExprKind::Literal(_) => {}
        ExprKind::Binary { left, right, .. } => {
            collect_leaves(left, leaves);
            collect_leaves(right, leaves);
        }
        ExprKind::Unary { operand, .. } => collect_leaves(operand, leaves),
        ExprKind::Index { target, index } => {
            collect_leaves(target, leaves);
            collect_leaves(index, leaves);
        }
        ExprKind::Slice { target, start, end } => {
            collect_leaves(target, leaves);
            for bound in [start, end].into_iter().flatten() {
                collect_leaves(bound, leaves);
            }
        }
        ExprKind::Call { callee, args } => {
            if !matches!(callee.kind, ExprKind::Identifier(_)) {
                collect_leaves(callee, leaves);
            }
            for arg in args {
                collect_leaves(arg, leaves);
            }
        }
        ExprKind::Cast { expr: inner, .. } | ExprKind::Paren(inner) => collect_leaves(inner, leaves),
        ExprKind::Builtin { args, .. } | ExprKind::Series(args) => {
            for arg in args {
                collect_leaves(arg, leaves);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{ItemKind, StmtKind};
    use crate::frontend::parse;
    use crate::sema::scope::{MapResolver, Symbol, SymbolKind};
    use std::sync::Arc;

    /// Parse `source` as the body of a function and type its first
    /// statement, which must be an expression statement or declaration.
    fn infer(decls: &[(&str, Type)], expr: &str) -> (Option<Type>, Vec<String>) {
        let program = parse(&format!("func f() {{\n\t{expr}\n}}")).unwrap();
        let ItemKind::Function(func) = &program.items[0].kind else {
            panic!("expected function");
        };
        let expr = match &func.body.stmts[0].kind {
            StmtKind::Expr(e) => e,
            _ => panic!("expected expression statement"),
        };

        let mut resolver = MapResolver::new();
        for (name, ty) in decls {
            let kind = if ty.is_chan() { SymbolKind::Channel } else { SymbolKind::Variable };
            resolver.insert(Symbol::new(*name, kind, ty.clone()));
        }
        let mut ctx = Context::new(Some(Arc::new(resolver)));
        let root = ctx.scopes.root();
        let ty = check(&mut ctx, root, expr, None);
        let messages = ctx.diagnostics.iter().map(|d| d.message.clone()).collect();
        (ty, messages)
    }

    #[test]
    fn test_literal_defaults() {
        assert_eq!(infer(&[], "1").0, Some(Type::I64));
        assert_eq!(infer(&[], "1.5").0, Some(Type::F64));
        assert_eq!(infer(&[], "\"s\"").0, Some(Type::String));
        assert_eq!(infer(&[], "true").0, Some(Type::U8));
        assert_eq!(infer(&[], "100ms").0, Some(Type::TimeSpan));
        assert_eq!(infer(&[], "5hz").0, Some(Type::TimeSpan));
    }

    #[test]
    fn test_literal_hints() {
        assert_eq!(literal_type(&Literal::Integer(1), Some(&Type::U16)), Type::U16);
        assert_eq!(literal_type(&Literal::Integer(1), Some(&Type::chan(Type::F32))), Type::F32);
        assert_eq!(literal_type(&Literal::Integer(1), Some(&Type::String)), Type::I64);
        assert_eq!(literal_type(&Literal::Float(1.0), Some(&Type::F32)), Type::F32);
        assert_eq!(literal_type(&Literal::Float(1.0), Some(&Type::I32)), Type::F64);
    }

    #[test]
    fn test_literal_takes_operand_type() {
        let decls = [("x", Type::F32)];
        assert_eq!(infer(&decls, "x + 1").0, Some(Type::F32));
        assert_eq!(infer(&decls, "2 * x").0, Some(Type::F32));
        assert_eq!(infer(&decls, "x > 0").0, Some(Type::U8));
    }

    #[test]
    fn test_channel_operands_are_unwrapped() {
        let decls = [("a", Type::chan(Type::F64)), ("b", Type::chan(Type::F64))];
        let (ty, messages) = infer(&decls, "(a + b) / 2");
        assert_eq!(ty, Some(Type::F64));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_no_implicit_widening() {
        let decls = [("a", Type::I32), ("b", Type::I64)];
        let (ty, messages) = infer(&decls, "a + b");
        assert_eq!(ty, None);
        assert_eq!(messages, vec!["type mismatch: cannot use i32 and i64 in + operation"]);
    }

    #[test]
    fn test_category_checks() {
        let decls = [("s", Type::String), ("n", Type::I32)];
        assert_eq!(infer(&decls, "s + s").1, vec!["cannot use string in + operation"]);
        assert_eq!(infer(&decls, "n && n").1, vec!["cannot use i32 in && operation"]);
        assert_eq!(infer(&decls, "-s").1, vec!["operator - not supported for type string"]);
        assert_eq!(infer(&decls, "!n").1, vec!["operator ! requires boolean operand, received i32"]);
        assert!(infer(&decls, "s == s").1.is_empty());
    }

    #[test]
    fn test_undefined_identifier() {
        let (ty, messages) = infer(&[], "missing + 1");
        assert_eq!(ty, None);
        assert_eq!(messages, vec!["undefined symbol: missing"]);
    }

    #[test]
    fn test_postfix_and_builtins() {
        let decls = [
            ("s", Type::series(Type::F32)),
            ("g", Type::function(Default::default(), Some(Type::I16))),
        ];
        assert_eq!(infer(&decls, "s[0]").0, Some(Type::F32));
        assert_eq!(infer(&decls, "s[1:2]").0, Some(Type::series(Type::F32)));
        assert_eq!(infer(&decls, "len(s)").0, Some(Type::I64));
        assert_eq!(infer(&decls, "now()").0, Some(Type::TimeStamp));
        assert_eq!(infer(&decls, "g(1, 2)").0, Some(Type::I16));
        assert_eq!(infer(&decls, "u8(s[0])").0, Some(Type::U8));
    }

    #[test]
    fn test_series_literals() {
        assert_eq!(infer(&[], "[1.0, 2.0]").0, Some(Type::series(Type::F64)));
        assert_eq!(
            infer(&[], "[1, \"a\"]").1,
            vec!["type mismatch: cannot use i64 and string in series literal"]
        );
        assert_eq!(
            infer(&[], "[]").1,
            vec!["cannot infer the element type of an empty series"]
        );
    }

    #[test]
    fn test_leaf_identifiers_skip_callees() {
        let program = parse("func f() {\n\tavg(a, b[c]) + d\n}").unwrap();
        let ItemKind::Function(func) = &program.items[0].kind else {
            panic!("expected function");
        };
        let StmtKind::Expr(expr) = &func.body.stmts[0].kind else {
            panic!("expected expression statement");
        };
        let names: Vec<&str> = leaf_identifiers(expr).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }
}
