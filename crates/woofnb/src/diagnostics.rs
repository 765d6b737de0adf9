//! Collected lint findings, rendered by [`crate::message`].
//!
//! Unlike [`crate::error::ParseError`], a [`Diagnostic`] never aborts a run
//! by itself — severity decides whether `woof lint`/`woof run` exit nonzero.

use std::fmt;

use crate::error::LintCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: LintCode,
    pub message: String,
    /// The cell this diagnostic concerns, if any (notebook-level diagnostics
    /// such as a missing `name` header key have none).
    pub cell_id: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(severity: Severity, code: LintCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            cell_id: None,
        }
    }

    #[must_use]
    pub fn with_cell(mut self, cell_id: impl Into<String>) -> Self {
        self.cell_id = Some(cell_id.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cell_id {
            Some(id) => write!(f, "{} [{}] {}: {}", self.severity, self.code, id, self.message),
            None => write!(f, "{} [{}]: {}", self.severity, self.code, self.message),
        }
    }
}

/// An ordered collection of diagnostics from a single lint pass.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Whether any diagnostic at or above [`Severity::Error`] was recorded.
    /// A lint pass with only warnings still exits 0.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_errors_ignores_warnings() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(Severity::Warning, LintCode::UnknownToken, "x"));
        assert!(!diags.has_errors());
        diags.push(Diagnostic::new(Severity::Error, LintCode::Cycle, "y"));
        assert!(diags.has_errors());
    }

    #[test]
    fn display_includes_cell_id_when_present() {
        let d = Diagnostic::new(Severity::Error, LintCode::MissingDep, "missing `z`")
            .with_cell("a");
        assert_eq!(d.to_string(), "error [MissingDep] a: missing `z`");
    }
}
