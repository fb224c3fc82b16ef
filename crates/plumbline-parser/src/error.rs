//! Diagnostics for parsing and model building.
//!
//! Every phase reports problems as [`Diagnostic`] values: the lexer and parser
//! emit errors, the extractor and the interpreter emit warnings. Error codes
//! are stable and grouped by phase (see [`ErrorCode`]). Multiple diagnostics
//! are wrapped in [`ParseError`] when a phase fails.
//!
//! # Example
//!
//! ```
//! # use plumbline_parser::error::{Diagnostic, ErrorCode};
//! # use plumbline_parser::Span;
//!
//! let diag = Diagnostic::warning("binding `db` is not declared")
//!     .with_code(ErrorCode::E200)
//!     .with_label(Span::new(40..42), "undeclared binding")
//!     .with_help("declare it first, e.g. `db = Database(\"Db\")`");
//! assert!(diag.severity().is_warning());
//! ```

mod collector;
mod diagnostic;
mod error_code;
mod label;
mod parse_error;
mod severity;

pub(crate) use collector::DiagnosticCollector;

pub use diagnostic::Diagnostic;
pub use error_code::ErrorCode;
pub use label::Label;
pub use parse_error::ParseError;
pub use severity::Severity;
