//! Stable error-kind identifiers, each surfaced verbatim in diagnostics,
//! `error` outputs, or both.

use std::fmt;

use thiserror::Error;

/// A position in the source text, 1-indexed like [`crate::model`]'s
/// cell-header tokenizer reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Parse-time failures. These abort the whole run; no sidecar entry is
/// written for them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0}: no `%WOOFNB` magic line found")]
    MissingMagic(Position),
    #[error("{0}: unsupported WOOFNB major version `{1}`")]
    UnsupportedVersion(Position, String),
    #[error("{0}: cell `{1}` was never closed with a line of three backticks")]
    UnterminatedCell(Position, String),
    #[error("{0}: duplicate cell-header token `{1}`")]
    DuplicateToken(Position, String),
    #[error("{0}: malformed cell-header token near `{1}`")]
    BadTokenSyntax(Position, String),
}

impl ParseError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::MissingMagic(_) => "MissingMagic",
            ParseError::UnsupportedVersion(..) => "UnsupportedVersion",
            ParseError::UnterminatedCell(..) => "UnterminatedCell",
            ParseError::DuplicateToken(..) => "DuplicateToken",
            ParseError::BadTokenSyntax(..) => "BadTokenSyntax",
        }
    }
}

/// Lint-time diagnostic codes. Unlike [`ParseError`] these are collected,
/// not raised — see [`crate::diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LintCode {
    DuplicateCellId,
    BadCellId,
    MissingDep,
    Cycle,
    PolicyConflict,
    UnknownToken,
    DisabledWithDependents,
}

impl LintCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LintCode::DuplicateCellId => "DuplicateCellId",
            LintCode::BadCellId => "BadCellId",
            LintCode::MissingDep => "MissingDep",
            LintCode::Cycle => "Cycle",
            LintCode::PolicyConflict => "PolicyConflict",
            LintCode::UnknownToken => "UnknownToken",
            LintCode::DisabledWithDependents => "DisabledWithDependents",
        }
    }
}

impl fmt::Display for LintCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution-time error names, surfaced as the `ename` of an `error`
/// [`crate::model::Output`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecErrorName {
    PolicyDenied,
    Timeout,
    BackendCrashed,
    Runtime,
    InvalidDataBody,
}

impl ExecErrorName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExecErrorName::PolicyDenied => "PolicyDenied",
            ExecErrorName::Timeout => "Timeout",
            ExecErrorName::BackendCrashed => "BackendCrashed",
            ExecErrorName::Runtime => "Runtime",
            ExecErrorName::InvalidDataBody => "InvalidDataBody",
        }
    }

    /// Non-deterministic failures are eligible for retry; the rest never
    /// are.
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, ExecErrorName::Timeout | ExecErrorName::BackendCrashed)
    }
}

impl fmt::Display for ExecErrorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
