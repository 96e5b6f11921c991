//! Flow statement analysis
//!
//! Each node is checked against its immediate predecessor. Inline
//! expressions are promoted to synthesized tasks declared in the root scope.

use super::context::Context;
use super::expr;
use super::scope::{ScopeId, Symbol, SymbolKind};
use crate::common::Span;
use crate::frontend::ast::{ConfigValues, Expr, FlowNode, FlowNodeKind, FlowStmt};
use crate::types::{Params, TaskType, Type, compatible};
use tracing::trace;

/// What the previous node of a flow produces
#[derive(Debug, Clone)]
enum Upstream {
    Channel { name: String, elem: Type },
    Task { name: String, ret: Option<Type> },
    Expr { ty: Type },
}

/// Analyze a flow statement. Stops at the first failing node.
pub fn analyze(ctx: &mut Context, scope: ScopeId, flow: &FlowStmt) -> Option<()> {
    let mut upstream: Option<Upstream> = None;
    for node in &flow.nodes {
        upstream = Some(analyze_node(ctx, scope, node, upstream.as_ref())?);
    }
    Some(())
}

fn analyze_node(ctx: &mut Context, scope: ScopeId, node: &FlowNode, upstream: Option<&Upstream>) -> Option<Upstream> {
    match &node.kind {
        FlowNodeKind::Channel(name) => {
            let symbol = ctx.resolve(scope, name, node.span)?;
            if symbol.kind == SymbolKind::Task {
                // A task named without a config block
                return analyze_invocation(ctx, scope, name, &ConfigValues::Named(Vec::new()), node.span, upstream);
            }
            match symbol.ty {
                Some(Type::Chan(elem)) => Some(Upstream::Channel {
                    name: name.clone(),
                    elem: *elem,
                }),
                _ => {
                    ctx.error(format!("{name} is not a channel"), node.span);
                    None
                }
            }
        }
        FlowNodeKind::Task(invocation) => {
            analyze_invocation(ctx, scope, &invocation.name, &invocation.config, node.span, upstream)
        }
        FlowNodeKind::Expr(e) => synthesize_task(ctx, scope, e),
    }
}

fn analyze_invocation(
    ctx: &mut Context,
    scope: ScopeId,
    name: &str,
    config: &ConfigValues,
    span: Span,
    upstream: Option<&Upstream>,
) -> Option<Upstream> {
    let symbol = ctx.resolve(scope, name, span)?;
    let task = match symbol.ty {
        Some(Type::Task(task)) if symbol.kind == SymbolKind::Task => task,
        _ => {
            ctx.error(format!("{name} is not a task"), span);
            return None;
        }
    };

    let values = match config {
        ConfigValues::Named(values) => values,
        ConfigValues::Anonymous(_) => {
            ctx.error("anonymous configuration values are not supported", span);
            return None;
        }
    };

    for (i, value) in values.iter().enumerate() {
        if values[..i].iter().any(|prev| prev.name == value.name) {
            ctx.error(
                format!("duplicate config parameter '{}' for task '{name}'", value.name),
                value.span,
            );
            return None;
        }
        if !task.config.contains(&value.name) {
            ctx.error(
                format!("unknown config parameter '{}' for task '{name}'", value.name),
                value.span,
            );
            return None;
        }
    }

    if let Some(missing) = task
        .config
        .keys()
        .find(|key| !values.iter().any(|v| v.name == *key))
    {
        ctx.error(
            format!("missing required config parameter '{missing}' for task '{name}'"),
            span,
        );
        return None;
    }

    for value in values {
        let Some(expected) = task.config.get(&value.name) else {
            continue;
        };
        check_config_value(ctx, scope, &value.name, expected, &value.value)?;
    }

    check_upstream(ctx, name, &task, upstream, span)?;

    Some(Upstream::Task {
        name: name.to_string(),
        ret: task.ret.map(|ret| *ret),
    })
}

fn check_config_value(ctx: &mut Context, scope: ScopeId, key: &str, expected: &Type, value: &Expr) -> Option<()> {
    // A channel-typed config accepts any channel by name
    if expected.is_chan() {
        if let Some(ident) = value.as_identifier() {
            let symbol = ctx.resolve(scope, ident, value.span)?;
            if symbol.ty.as_ref().is_some_and(Type::is_chan) {
                return Some(());
            }
        }
    }

    let value_ty = expr::check(ctx, scope, value, Some(expected))?;
    if !compatible(expected, &value_ty) {
        ctx.error(
            format!("type mismatch: config parameter '{key}' expects {expected} but got {value_ty}"),
            value.span,
        );
        return None;
    }
    Some(())
}

fn check_upstream(ctx: &mut Context, name: &str, task: &TaskType, upstream: Option<&Upstream>, span: Span) -> Option<()> {
    let param = task.params.at(0).map(|(_, ty)| ty);

    match upstream {
        None => {}
        Some(Upstream::Task { name: prev, ret }) => {
            if task.params.len() > 1 {
                ctx.error(format!("{name} has more than one parameter"), span);
                return None;
            }
            if let Some(param) = param {
                if ret.as_ref() != Some(param) {
                    let ret = ret.as_ref().map_or_else(|| "void".to_string(), ToString::to_string);
                    ctx.error(
                        format!("return type {ret} of {prev} is not equal to argument type {param} of {name}"),
                        span,
                    );
                    return None;
                }
            }
        }
        Some(Upstream::Channel { name: channel, elem }) => {
            if let Some(param) = param {
                if elem != param {
                    ctx.error(
                        format!("channel {channel} value type {elem} does not match task {name} parameter type {param}"),
                        span,
                    );
                    return None;
                }
            }
        }
        Some(Upstream::Expr { ty }) => {
            if let Some(param) = param {
                if ty != param {
                    ctx.error(
                        format!("expression type {ty} does not match task {name} parameter type {param}"),
                        span,
                    );
                    return None;
                }
            }
        }
    }
    Some(())
}

/// Promote an inline expression to a task reading the channels it mentions
fn synthesize_task(ctx: &mut Context, scope: ScopeId, e: &Expr) -> Option<Upstream> {
    let mut config = Params::new();
    for (name, span) in expr::leaf_identifiers(e) {
        let symbol = ctx.resolve(scope, name, span)?;
        match symbol.ty {
            Some(Type::Chan(elem)) => {
                config.insert(name, *elem);
            }
            _ => {
                ctx.error("only channels can be used in flow expressions", span);
                return None;
            }
        }
    }

    let ty = expr::check(ctx, scope, e, None)?;
    let ret = ty.unwrap_chan().clone();

    let name = ctx.next_expr_task_name();
    let mut task_ty = Type::task(config.clone(), Params::new(), Some(ret.clone()));
    if let Type::Task(task) = &mut task_ty {
        task.channels.read.extend(config.keys().map(str::to_string));
    }

    let root = ctx.scopes.root();
    let task = ctx.declare(root, Symbol::new(&name, SymbolKind::Task, task_ty).with_span(e.span))?;
    for (channel, elem) in config.iter() {
        let param = Symbol::new(format!("__{channel}"), SymbolKind::ConfigParam, elem.clone()).with_span(e.span);
        ctx.declare(task, param)?;
    }
    trace!(task = %name, returns = %ret, "synthesized expression task");

    Some(Upstream::Expr { ty: ret })
}
