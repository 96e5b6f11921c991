//! Weft Compiler - semantic front end for the Weft reactive telemetry language
//!
//! Weft programs declare functions and tasks and wire them together with
//! flow statements (`sensor -> scale{factor: 2} -> display{}`). This library
//! checks such programs and turns them into an execution graph.
//!
//! ## Architecture
//!
//! The compiler is organized into:
//! - **Common** (`common/`): Shared infrastructure (errors, spans, reporting)
//! - **Types** (`types/`): The closed value-type system
//! - **Frontend** (`frontend/`): Lexer, AST and parser
//! - **Sema** (`sema/`): Scope arena, diagnostics, expression/statement/flow analysis
//! - **Graph** (`graph/`): Module assembly into nodes and edges
//! - **Driver** (`driver/`): Pipeline chaining the phases

pub mod common;
pub mod types;
pub mod frontend;
pub mod sema;
pub mod graph;
pub mod driver;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use driver::{Pipeline, PipelineConfig};
pub use frontend::parse;
pub use graph::{Assembler, Module};
pub use sema::{AnalysisResult, Analyzer};
