//! Tooling errors and terminal rendering of errors and diagnostics

use crate::sema::{Diagnostic as SemaDiagnostic, Severity};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use thiserror::Error;
use super::Span;

/// Failure of the toolchain itself, as opposed to a problem in the analyzed
/// program (those are reported as diagnostics)
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexer error at {}:{}: {message}", span.line, span.column)]
    Lexer { message: String, span: Span },

    #[error("Parser error at {}:{}: {message}", span.line, span.column)]
    Parser { message: String, span: Span },

    #[error("Semantic error: {count} diagnostic(s) reported")]
    Semantic { count: usize },

    #[error("Assembly error: {message}")]
    Assembly { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn semantic(count: usize) -> Self {
        Self::Semantic { count }
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    pub fn report_error(&self, file_id: usize, error: &CompileError) {
        let diagnostic = match error {
            CompileError::Lexer { message, span } => Diagnostic::error()
                .with_message("Lexer error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            CompileError::Parser { message, span } => Diagnostic::error()
                .with_message("Syntax error")
                .with_labels(vec![
                    Label::primary(file_id, span.start..span.end).with_message(message)
                ]),

            CompileError::Semantic { count } => {
                Diagnostic::error().with_message(format!("analysis failed with {count} diagnostic(s)"))
            }

            CompileError::Assembly { message } => {
                Diagnostic::error().with_message(format!("Assembly error: {message}"))
            }

            CompileError::Io(err) => {
                Diagnostic::error().with_message(format!("IO error: {err}"))
            }

            CompileError::Serialize(err) => {
                Diagnostic::error().with_message(format!("Serialization error: {err}"))
            }
        };

        self.emit(&diagnostic);
    }

    /// Render an analysis diagnostic against its source file
    pub fn report_diagnostic(&self, file_id: usize, diagnostic: &SemaDiagnostic) {
        let rendered = match diagnostic.severity {
            Severity::Error => Diagnostic::error(),
            Severity::Warning => Diagnostic::warning(),
            Severity::Info => Diagnostic::note(),
            Severity::Hint => Diagnostic::help(),
        }
        .with_message(&diagnostic.message);

        let rendered = match diagnostic.span {
            Some(span) => rendered.with_labels(vec![Label::primary(file_id, span.start..span.end)]),
            None => rendered,
        };

        self.emit(&rendered);
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, diagnostic);
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
