//! Semantic analysis: scoping, type inference, statement and flow checks

mod analyzer;
mod context;
mod diagnostics;
mod expr;
mod flow;
mod scope;
mod stmt;

pub use analyzer::{AnalysisResult, Analyzer};
pub use context::{Context, EXPR_TASK_PREFIX};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use expr::{check as check_expr, leaf_identifiers, literal_type};
pub use scope::{GlobalResolver, MapResolver, Scope, ScopeError, ScopeId, ScopeTree, Symbol, SymbolKind};
pub use stmt::returns_on_all_paths;
