//! Severity levels for diagnostics.

use std::fmt;

/// The severity level of a diagnostic.
///
/// An [`Severity::Error`] means the input could not be turned into a model;
/// a [`Severity::Warning`] means part of the input was skipped and the model
/// was still built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The phase failed and produced no usable output.
    Error,

    /// A construct was dropped or ignored; processing continued.
    Warning,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns `true` if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}
