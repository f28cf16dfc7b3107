//! Diagnostics attached to source files

use serde::Serialize;
use spx_ast::{Range, Span};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub range: Range,
    pub message: String,
    /// Byte extent, for rendering
    #[serde(skip)]
    pub span: Span,
}

impl Diagnostic {
    pub fn error(range: Range, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            range,
            message: message.into(),
            span,
        }
    }

    pub fn warning(range: Range, span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            range,
            message: message.into(),
            span,
        }
    }

    fn same_as(&self, other: &Diagnostic) -> bool {
        self.severity == other.severity && self.range == other.range && self.message == other.message
    }
}

/// Per-file diagnostics. Append-only; a diagnostic equal to an existing one
/// in severity, range and message is dropped.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSet {
    files: BTreeMap<String, Vec<Diagnostic>>,
    has_error: bool,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `path` known with no diagnostics yet
    pub fn register(&mut self, path: &str) {
        self.files.entry(path.to_string()).or_default();
    }

    /// Returns false if the diagnostic was a duplicate
    pub fn add(&mut self, path: &str, diagnostic: Diagnostic) -> bool {
        let list = self.files.entry(path.to_string()).or_default();
        if list.iter().any(|d| d.same_as(&diagnostic)) {
            return false;
        }
        if diagnostic.severity == Severity::Error {
            self.has_error = true;
        }
        list.push(diagnostic);
        true
    }

    pub fn for_file(&self, path: &str) -> &[Diagnostic] {
        self.files.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_file(&self) -> &BTreeMap<String, Vec<Diagnostic>> {
        &self.files
    }

    pub fn has_errors(&self) -> bool {
        self.has_error
    }

    pub fn len(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.files
            .iter()
            .flat_map(|(path, list)| list.iter().map(move |d| (path.as_str(), d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spx_ast::{FileId, Position};

    fn range(line: u32, start: u32, end: u32) -> Range {
        Range::new(Position::new(line, start), Position::new(line, end))
    }

    #[test]
    fn test_dedup_by_severity_range_message() {
        let mut set = DiagnosticSet::new();
        let span = Span::new(0, 3, FileId(0));
        assert!(set.add("main.spx", Diagnostic::warning(range(0, 0, 3), span, "w")));
        assert!(!set.add("main.spx", Diagnostic::warning(range(0, 0, 3), span, "w")));
        assert!(set.add("main.spx", Diagnostic::error(range(0, 0, 3), span, "w")));
        assert!(set.add("main.spx", Diagnostic::warning(range(1, 0, 3), span, "w")));
        assert!(set.add("Bullet.spx", Diagnostic::warning(range(0, 0, 3), span, "w")));
        assert_eq!(set.for_file("main.spx").len(), 3);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_has_errors_tracks_severity() {
        let mut set = DiagnosticSet::new();
        set.register("main.spx");
        assert!(!set.has_errors());
        assert!(set.is_empty());
        set.add("main.spx", Diagnostic::warning(range(0, 0, 1), Span::default(), "w"));
        assert!(!set.has_errors());
        set.add("main.spx", Diagnostic::error(range(0, 0, 1), Span::default(), "e"));
        assert!(set.has_errors());
        assert_eq!(set.by_file().len(), 1);
    }
}
