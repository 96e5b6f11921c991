//! Severity-tagged analysis diagnostics

use crate::common::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Hint => write!(f, "hint"),
        }
    }
}

/// A single message produced by analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// 1-based; 0 when the message has no location
    pub line: usize,
    /// 1-based; 0 when the message has no location
    pub column: usize,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, span: Option<Span>) -> Self {
        let (line, column) = span.map_or((0, 0), |s| (s.line, s.column));
        Self {
            severity,
            line,
            column,
            message: message.into(),
            span,
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Error, message, Some(span))
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Severity::Warning, message, Some(span))
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}: {}", self.line, self.column, self.severity, self.message)
    }
}

/// Ordered list of diagnostics; insertion order is report order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn add_error(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::new(Severity::Error, message, span));
    }

    pub fn add_warning(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::new(Severity::Warning, message, span));
    }

    pub fn add_info(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::new(Severity::Info, message, span));
    }

    pub fn add_hint(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.push(Diagnostic::new(Severity::Hint, message, span));
    }

    /// True when nothing at all was reported
    pub fn is_ok(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.items.first()
    }
}

impl std::ops::Index<usize> for Diagnostics {
    type Output = Diagnostic;

    fn index(&self, index: usize) -> &Diagnostic {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_names() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Info.to_string(), "info");
        assert_eq!(Severity::Hint.to_string(), "hint");
    }

    #[test]
    fn test_any_severity_makes_diagnostics_not_ok() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_ok());
        diags.add_hint("consider using const", None);
        assert!(!diags.is_ok());
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_location_comes_from_span() {
        let mut diags = Diagnostics::new();
        diags.add_error("undefined variable", None);
        diags.add_error("type mismatch", Some(Span::new(10, 12).with_position(5, 10)));

        assert_eq!(diags.len(), 2);
        assert_eq!((diags[0].line, diags[0].column), (0, 0));
        assert_eq!((diags[1].line, diags[1].column), (5, 10));
        assert!(diags.has_errors());
    }

    #[test]
    fn test_insertion_order_is_preserved_across_severities() {
        let mut diags = Diagnostics::new();
        diags.add_warning("warn", Some(Span::default().with_position(1, 1)));
        diags.add_error("err", Some(Span::default().with_position(2, 1)));
        diags.add_info("info", None);

        let severities: Vec<_> = diags.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Error, Severity::Info]);
        assert_eq!(diags.to_string(), "1:1 warning: warn\n2:1 error: err\n0:0 info: info");
    }
}
