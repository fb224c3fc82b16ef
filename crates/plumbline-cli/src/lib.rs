//! Plumbline CLI library
//!
//! This module contains the core CLI logic for the Plumbline audit tool.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Command, ReportFormat};

use std::{fs, path::Path};

use log::{error, info, warn};
use miette::GraphicalReportHandler;

use plumbline::{Analysis, Auditor, PlumblineError, compare::Discrepancies, model::GraphModel};
use plumbline_parser::error::Diagnostic;

use error_adapter::DiagnosticAdapter;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The diagrams agree with the code.
    Consistent,
    /// The audit found this many differences.
    Discrepancies(usize),
    /// A diagram specification was written.
    Scaffolded,
}

impl Outcome {
    /// Process exit code: 0 when consistent or scaffolded, 1 when
    /// discrepancies were found.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Consistent | Outcome::Scaffolded => 0,
            Outcome::Discrepancies(_) => 1,
        }
    }
}

/// Run the Plumbline CLI application
///
/// # Errors
///
/// Returns `PlumblineError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Parsing errors when `--strict` is given
pub fn run(args: &Args) -> Result<Outcome, PlumblineError> {
    let app_config = config::load_config(args.config.as_ref())?;
    let auditor = Auditor::new(app_config);

    match &args.command {
        Command::Check {
            code,
            diagrams,
            strict,
            format,
        } => {
            let report = check(&auditor, code, diagrams, *strict)?;
            print_report(&report, *format)?;
            if report.is_consistent() {
                Ok(Outcome::Consistent)
            } else {
                Ok(Outcome::Discrepancies(report.count()))
            }
        }
        Command::Scaffold {
            code,
            output,
            title,
        } => {
            scaffold(&auditor, code, output, title.as_deref())?;
            Ok(Outcome::Scaffolded)
        }
    }
}

fn check(
    auditor: &Auditor,
    code_path: &str,
    diagram_paths: &[String],
    strict: bool,
) -> Result<Discrepancies, PlumblineError> {
    info!(code_path, diagrams = diagram_paths.len(); "Checking diagrams against code");

    let code_source = fs::read_to_string(code_path)?;
    let code = if strict {
        auditor.source_strict(&code_source)?
    } else {
        auditor.source(&code_source)
    };
    report_diagnostics(code_path, &code_source, code.diagnostics());
    let code_model = code.output().resolve();

    let mut diagrams: Vec<GraphModel> = Vec::with_capacity(diagram_paths.len());
    for path in diagram_paths {
        let source = fs::read_to_string(path)?;
        let analysis: Analysis<GraphModel> = if strict {
            auditor.diagram_strict(&source)?
        } else {
            auditor.diagram(&source)
        };
        report_diagnostics(path, &source, analysis.diagnostics());
        diagrams.push(analysis.into_output());
    }

    Ok(auditor.audit(&code_model, &diagrams))
}

fn scaffold(
    auditor: &Auditor,
    code_path: &str,
    output: &str,
    title: Option<&str>,
) -> Result<(), PlumblineError> {
    info!(code_path, output_path = output; "Generating diagram specification");

    let source = fs::read_to_string(code_path)?;
    let code = auditor.source(&source);
    report_diagnostics(code_path, &source, code.diagnostics());

    let default_title = Path::new(code_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace('_', " "))
        .unwrap_or_else(|| "Architecture".to_string());
    let spec = auditor.scaffold(code.output(), title.unwrap_or(&default_title));
    fs::write(output, spec)?;

    info!(output_file = output; "Diagram specification written");
    Ok(())
}

/// Renders diagnostics of a completed analysis through miette.
fn report_diagnostics(path: &str, source: &str, diagnostics: &[Diagnostic]) {
    let reporter = GraphicalReportHandler::new();
    for diagnostic in diagnostics {
        let mut writer = String::new();
        if reporter
            .render_report(&mut writer, &DiagnosticAdapter::new(diagnostic, source))
            .is_err()
        {
            writer = diagnostic.to_string();
        }

        if diagnostic.severity().is_error() {
            error!(path; "{writer}");
        } else {
            warn!(path; "{writer}");
        }
    }
}

fn print_report(report: &Discrepancies, format: ReportFormat) -> Result<(), PlumblineError> {
    match format {
        ReportFormat::Text => print!("{report}"),
        #[cfg(feature = "json")]
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
            println!("{json}");
        }
    }
    Ok(())
}
