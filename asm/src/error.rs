//! Assembler diagnostics: `LexError`/`ParseError`/`SemanticError`, each
//! carrying `(file, line, source snippet)`. The assembler accumulates
//! these across a whole file (and across every file) rather than failing
//! on the first one, so a host can report everything wrong with a program
//! in one pass.

use thiserror::Error;

use crate::parser::Rule;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One diagnostic, already formatted with its source location. Distinct
/// from `jupiter_core::SimulationFault` — this crate's errors are
/// compile-time diagnostics, not runtime faults.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{file}:{line}: {message}")]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub message: String,
    pub snippet: Option<String>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            file: file.into(),
            line,
            message: message.into(),
            snippet: None,
            severity: Severity::Error,
        }
    }

    pub fn warning(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            file: file.into(),
            line,
            message: message.into(),
            snippet: None,
            severity: Severity::Warning,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Extrict mode promotes every warning to an error.
    pub fn promote_if_extrict(mut self, extrict: bool) -> Self {
        if extrict && self.severity == Severity::Warning {
            self.severity = Severity::Error;
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn from_pest(file: &str, err: pest::error::Error<Rule>) -> Self {
        let line = match err.line_col {
            pest::error::LineColLocation::Pos((line, _)) => line,
            pest::error::LineColLocation::Span((line, _), _) => line,
        };
        Diagnostic::error(file, line, err.variant.message().to_string())
    }
}
