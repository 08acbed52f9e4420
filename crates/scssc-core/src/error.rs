//! The structured error model shared by every compilation stage.
//!
//! Errors carry a kind, a human-readable message, and where possible the
//! source location that produced them, so editor integrations can render
//! inline markers keyed by `(line, column)`. Stages fail fast: the first
//! error aborts the compile call, and the engine converts it into a
//! terminal [`CompilationResult`](crate::engine::CompilationResult)
//! instead of letting it escape to the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The category of a compilation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed source text (lexing or parsing)
    SyntaxError,
    /// A `$variable` was referenced but never defined (strict mode only)
    VariableNotDefined,
    /// `@include` named a mixin that was never registered
    MixinNotFound,
    /// A function call named no known builtin (strict mode only)
    FunctionNotFound,
    /// An `@import` chain revisited a file already being expanded
    CircularDependency,
    /// Arithmetic over incompatible operands or units
    InvalidArithmeticOperation,
    /// A selector could not be resolved against its nesting context
    SelectorParsingError,
    /// An at-rule the compiler deliberately refuses (e.g. `@use`)
    AtRuleNotSupported,
    /// The import resolver could not supply a requested path
    ImportResolutionFailed,
    /// Anything that does not fit the categories above
    Unknown,
}

impl ErrorKind {
    /// Stable lowercase name, used in log lines and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::VariableNotDefined => "variable not defined",
            ErrorKind::MixinNotFound => "mixin not found",
            ErrorKind::FunctionNotFound => "function not found",
            ErrorKind::CircularDependency => "circular dependency",
            ErrorKind::InvalidArithmeticOperation => "invalid arithmetic operation",
            ErrorKind::SelectorParsingError => "selector parsing error",
            ErrorKind::AtRuleNotSupported => "at-rule not supported",
            ErrorKind::ImportResolutionFailed => "import resolution failed",
            ErrorKind::Unknown => "unknown error",
        }
    }
}

/// A compilation failure with location and an optional fix suggestion.
///
/// Never unwound across stage boundaries: stages return it through
/// `Result`, and the engine is the single place that turns it into a
/// terminal result object.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{}", render(.kind, .message, .line, .column))]
pub struct CompilerError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    /// A hint for fixing the problem, when one is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

fn render(kind: &ErrorKind, message: &str, line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!("{} at {}:{}: {}", kind.name(), l, c, message),
        (Some(l), None) => format!("{} at line {}: {}", kind.name(), l, message),
        _ => format!("{}: {}", kind.name(), message),
    }
}

impl CompilerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
            suggestion: None,
        }
    }

    /// Attach a 1-based source location.
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Shorthand for located lexer/parser failures.
    pub fn syntax(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::new(ErrorKind::SyntaxError, message).at(line, column)
    }
}

/// Result type used throughout the compilation pipeline.
pub type Result<T> = std::result::Result<T, CompilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location_when_present() {
        let err = CompilerError::syntax("expected `{`, found `;`", 3, 14);
        assert_eq!(err.to_string(), "syntax error at 3:14: expected `{`, found `;`");
    }

    #[test]
    fn display_without_location() {
        let err = CompilerError::new(ErrorKind::MixinNotFound, "no mixin named `card`");
        assert_eq!(err.to_string(), "mixin not found: no mixin named `card`");
    }

    #[test]
    fn serializes_without_empty_fields() {
        let err = CompilerError::new(ErrorKind::Unknown, "boom");
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("line").is_none());
        assert!(json.get("suggestion").is_none());
        assert_eq!(json["kind"], "Unknown");
    }
}
