//! Error types for Plumbline operations.
//!
//! Discrepancies between code and diagram are data, not errors. A
//! [`PlumblineError`] means an audit could not be carried out at all.

use std::io;

use thiserror::Error;

use plumbline_parser::error::ParseError;

/// The main error type for Plumbline operations.
///
/// The `Parse` variant keeps the source text next to the diagnostics so
/// that spans can be rendered against it.
#[derive(Debug, Error)]
pub enum PlumblineError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },
}

impl PlumblineError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}
