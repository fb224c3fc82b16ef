//! Plumbline Parser
//!
//! Turns Python source into the two graph models Plumbline compares:
//!
//! 1. **Lexing** ([`tokenize`]): source text to positioned tokens, with
//!    indentation expressed as `Indent` / `Dedent` tokens
//! 2. **Parsing** ([`parse`]): tokens to a [`syntax::Module`]
//! 3. **Extraction** ([`extract::extract_source_model`]): classes and
//!    methods of application code
//! 4. **Connection inference** ([`connect::infer_connections`]): which
//!    classes each method uses
//! 5. **Interpretation** ([`interpret::interpret_diagram`]): entities and
//!    relationships of a diagram specification
//!
//! [`try_analyze_source`] and [`try_analyze_diagram`] run the whole pipeline
//! and return a [`ParseError`](error::ParseError) when the file does not
//! parse. [`analyze_source`] and [`analyze_diagram`] never fail: a file that
//! does not parse yields an empty model together with the parse diagnostics.
//!
//! # Example
//!
//! ```
//! use plumbline_parser::{InterpretConfig, analyze_diagram};
//!
//! let analysis = analyze_diagram(
//!     "car = Container(\"Car\")\ncar >> Edge(label=\"drive()\") >> car\n",
//!     &InterpretConfig::default(),
//! );
//! assert!(analysis.output().capabilities().has("Car", "drive()"));
//! ```

pub mod connect;
pub mod error;
pub mod extract;
pub mod interpret;
mod lexer;
mod parser;
mod span;
pub mod syntax;
mod tokens;

use log::debug;

use plumbline_core::model::GraphModel;

pub use connect::{Connection, infer_connections};
pub use extract::{ExtractConfig, SourceModel, extract_source_model};
pub use interpret::{InterpretConfig, interpret_diagram};
pub use lexer::tokenize;
pub use span::{Span, Spanned};
pub use tokens::{PositionedToken, Token};

use error::{Diagnostic, ParseError};

/// The result of running an engine: its output and everything it reported.
#[derive(Debug, Clone)]
pub struct Analysis<T> {
    output: T,
    diagnostics: Vec<Diagnostic>,
}

impl<T> Analysis<T> {
    pub fn new(output: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            output,
            diagnostics,
        }
    }

    pub fn output(&self) -> &T {
        &self.output
    }

    pub fn into_output(self) -> T {
        self.output
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.output, self.diagnostics)
    }

    /// Returns true if any diagnostic is an error.
    ///
    /// Only lexing and parsing produce errors, so an analysis with errors
    /// always carries an empty model.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity().is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity().is_warning())
    }
}

/// Parses Python source into a syntax tree.
///
/// # Errors
///
/// Returns a [`ParseError`] when the source cannot be tokenized or does not
/// have a valid block structure.
pub fn parse(source: &str) -> Result<syntax::Module<'_>, ParseError> {
    let tokens = tokenize(source)?;
    build(&tokens)
}

fn build<'src>(tokens: &[PositionedToken<'src>]) -> Result<syntax::Module<'src>, ParseError> {
    debug!(tokens_len = tokens.len(); "Tokenized source");
    let module = parser::build_module(tokens).map_err(ParseError::from)?;
    debug!(statements_len = module.statements.len(); "Parsed module");
    Ok(module)
}

/// Parses application code, extracts its classes and infers the
/// connections between them.
///
/// # Errors
///
/// Returns a [`ParseError`] when the source does not parse.
pub fn try_analyze_source(
    source: &str,
    config: &ExtractConfig,
) -> Result<Analysis<SourceModel>, ParseError> {
    let tokens = tokenize(source)?;
    let module = build(&tokens)?;
    let (model, diagnostics) = extract_source_model(&module, config).into_parts();
    let connections = infer_connections(source, &tokens, &module, &model, config);
    Ok(Analysis::new(
        model.with_connections(connections),
        diagnostics,
    ))
}

/// Parses a diagram specification and interprets it.
///
/// # Errors
///
/// Returns a [`ParseError`] when the source does not parse.
pub fn try_analyze_diagram(
    source: &str,
    config: &InterpretConfig,
) -> Result<Analysis<GraphModel>, ParseError> {
    let module = parse(source)?;
    Ok(interpret_diagram(&module, config))
}

/// Like [`try_analyze_source`], reporting a parse failure as diagnostics on
/// an empty model.
pub fn analyze_source(source: &str, config: &ExtractConfig) -> Analysis<SourceModel> {
    try_analyze_source(source, config).unwrap_or_else(|err| {
        Analysis::new(SourceModel::default(), err.diagnostics().to_vec())
    })
}

/// Like [`try_analyze_diagram`], reporting a parse failure as diagnostics on
/// an empty model.
pub fn analyze_diagram(source: &str, config: &InterpretConfig) -> Analysis<GraphModel> {
    try_analyze_diagram(source, config).unwrap_or_else(|err| {
        Analysis::new(GraphModel::default(), err.diagnostics().to_vec())
    })
}
