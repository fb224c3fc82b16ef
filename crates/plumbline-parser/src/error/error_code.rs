//! Error codes for the Plumbline diagnostic system.
//!
//! Error codes are organized by phase:
//! - `E0xx` - Lexer errors
//! - `E1xx` - Parser errors
//! - `E2xx` - Diagram interpretation warnings
//! - `E3xx` - Source extraction warnings

use std::fmt;

/// Error codes for categorizing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // Lexer Errors (E0xx)
    // =========================================================================
    /// Unterminated string literal.
    ///
    /// A string was opened with a quote but never closed. Single-quoted
    /// strings must close on the same line.
    E001,

    /// Unexpected character.
    E002,

    /// Inconsistent dedent.
    ///
    /// A line is indented less than the previous block, but its width does
    /// not match any enclosing indentation level.
    E003,

    /// Unmatched closing bracket.
    E004,

    /// Unclosed bracket at end of input.
    E005,

    // =========================================================================
    // Parser Errors (E1xx)
    // =========================================================================
    /// Unexpected token.
    ///
    /// Typically an unexpected indent, or a block header not followed by an
    /// indented block.
    E100,

    /// Incomplete input.
    E101,

    // =========================================================================
    // Interpretation Warnings (E2xx)
    // =========================================================================
    /// Undefined binding.
    ///
    /// A name is used in a relationship, collection or loop before it was
    /// bound. The reference is dropped.
    E200,

    /// Unsupported loop iterable.
    ///
    /// A loop must iterate a list literal or a name bound to a collection.
    E201,

    /// Unsupported loop target.
    ///
    /// A loop variable must be a single name.
    E202,

    /// Unresolved capability label.
    ///
    /// The label of an edge is neither a string literal nor a name bound to
    /// a string constant.
    E203,

    /// Unsupported statement in loop body.
    E204,

    /// Unsupported compound statement.
    E205,

    // =========================================================================
    // Extraction Warnings (E3xx)
    // =========================================================================
    /// Class declared more than once.
    E300,
}

impl ErrorCode {
    /// Returns the numeric code as a string (e.g., "E001").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E100 => "E100",
            ErrorCode::E101 => "E101",
            ErrorCode::E200 => "E200",
            ErrorCode::E201 => "E201",
            ErrorCode::E202 => "E202",
            ErrorCode::E203 => "E203",
            ErrorCode::E204 => "E204",
            ErrorCode::E205 => "E205",
            ErrorCode::E300 => "E300",
        }
    }

    /// Returns a short description of what this error code means.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "unterminated string literal",
            ErrorCode::E002 => "unexpected character",
            ErrorCode::E003 => "inconsistent dedent",
            ErrorCode::E004 => "unmatched closing bracket",
            ErrorCode::E005 => "unclosed bracket",
            ErrorCode::E100 => "unexpected token",
            ErrorCode::E101 => "incomplete input",
            ErrorCode::E200 => "undefined binding",
            ErrorCode::E201 => "unsupported loop iterable",
            ErrorCode::E202 => "unsupported loop target",
            ErrorCode::E203 => "unresolved capability label",
            ErrorCode::E204 => "unsupported statement in loop body",
            ErrorCode::E205 => "unsupported compound statement",
            ErrorCode::E300 => "class declared more than once",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
