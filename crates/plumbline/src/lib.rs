//! Plumbline - checks architecture diagrams written as code against the
//! classes they describe.
//!
//! A diagram specification (a Python file using the `diagrams` vocabulary)
//! and the application code are both read into a [`GraphModel`] of entities
//! and capabilities, and the two models are compared.

pub mod config;

mod error;
mod scaffold;

pub use plumbline_core::{compare, inheritance, model, registry};
pub use plumbline_parser::{Analysis, SourceModel, error::Diagnostic};

pub use error::PlumblineError;
pub use scaffold::Scaffold;

use log::{debug, info};

use plumbline_core::{compare::Discrepancies, model::GraphModel};

use config::AppConfig;

/// Runs audits with one configuration.
///
/// # Examples
///
/// ```rust
/// use plumbline::Auditor;
///
/// let auditor = Auditor::default();
/// let code = auditor.source("class Car:\n    def drive(self):\n        pass\n");
/// let diagram = auditor.diagram(
///     "car = Container(\"Car\")\ncar >> Edge(label=\"drive()\") >> car\n",
/// );
///
/// let report = auditor.audit(&code.output().resolve(), &[diagram.into_output()]);
/// assert!(report.is_consistent());
/// ```
#[derive(Debug, Default)]
pub struct Auditor {
    config: AppConfig,
}

impl Auditor {
    /// Create a new auditor with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Extract the classes of application code.
    ///
    /// Never fails. If the code does not parse, the model is empty and the
    /// parse errors are in the returned diagnostics. Every diagnostic is
    /// also logged at debug level; rendering them is left to the caller.
    pub fn source(&self, source: &str) -> Analysis<SourceModel> {
        info!("Extracting source model");
        let analysis =
            plumbline_parser::analyze_source(source, &self.config.source().extract_config());
        log_diagnostics(analysis.diagnostics());
        debug!(classes = analysis.output().len(); "Source model extracted");
        analysis
    }

    /// Interpret a diagram specification.
    ///
    /// Never fails, see [`Auditor::source`].
    pub fn diagram(&self, source: &str) -> Analysis<GraphModel> {
        info!("Interpreting diagram");
        let analysis =
            plumbline_parser::analyze_diagram(source, &self.config.diagram().interpret_config());
        log_diagnostics(analysis.diagnostics());
        debug!(
            entities = analysis.output().entities().len(),
            edges = analysis.output().edges().len();
            "Diagram model built"
        );
        analysis
    }

    /// Like [`Auditor::source`], but a parse failure is an error.
    ///
    /// # Errors
    ///
    /// Returns `PlumblineError::Parse` if the code cannot be parsed.
    pub fn source_strict(&self, source: &str) -> Result<Analysis<SourceModel>, PlumblineError> {
        let analysis = plumbline_parser::try_analyze_source(
            source,
            &self.config.source().extract_config(),
        )
        .map_err(|err| PlumblineError::new_parse_error(err, source))?;
        log_diagnostics(analysis.diagnostics());
        Ok(analysis)
    }

    /// Like [`Auditor::diagram`], but a parse failure is an error.
    ///
    /// # Errors
    ///
    /// Returns `PlumblineError::Parse` if the specification cannot be parsed.
    pub fn diagram_strict(&self, source: &str) -> Result<Analysis<GraphModel>, PlumblineError> {
        let analysis = plumbline_parser::try_analyze_diagram(
            source,
            &self.config.diagram().interpret_config(),
        )
        .map_err(|err| PlumblineError::new_parse_error(err, source))?;
        log_diagnostics(analysis.diagnostics());
        Ok(analysis)
    }

    /// Compare a code model with the union of one or more diagram models.
    ///
    /// An entity or capability that appears in any diagram counts as
    /// documented.
    pub fn audit(&self, code: &GraphModel, diagrams: &[GraphModel]) -> Discrepancies {
        let mut combined = GraphModel::new();
        for diagram in diagrams {
            combined.merge(diagram);
        }

        let discrepancies = compare::compare(code, &combined);
        info!(
            diagrams = diagrams.len(),
            discrepancies = discrepancies.count();
            "Audit complete"
        );
        discrepancies
    }

    /// Generate a diagram specification that agrees with `model`.
    pub fn scaffold(&self, model: &SourceModel, title: &str) -> String {
        info!(classes = model.len(); "Generating diagram specification");
        Scaffold::new(model, self.config.diagram(), title).to_string()
    }
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let code = diagnostic.code().map(|code| code.to_string()).unwrap_or_default();
        let severity = diagnostic.severity().to_string();
        debug!(code, severity; "{}", diagnostic.message());
    }
}
