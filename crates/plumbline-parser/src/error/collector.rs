//! Collector for accumulating diagnostics during a processing phase.

use std::collections::HashSet;

use crate::{
    error::{Diagnostic, ErrorCode, Label, ParseError},
    span::Span,
};

/// What makes two diagnostics the same report.
type DiagnosticKey = (Option<ErrorCode>, String, Vec<Span>);

fn key(diagnostic: &Diagnostic) -> DiagnosticKey {
    (
        diagnostic.code(),
        diagnostic.message().to_string(),
        diagnostic.labels().iter().map(Label::span).collect(),
    )
}

/// Accumulates diagnostics so a phase can report every problem it finds
/// instead of stopping at the first one.
///
/// A diagnostic identical to one already collected (same code, message and
/// label spans) is dropped, so a construct visited more than once, such as
/// a loop body, is reported once.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    seen: HashSet<DiagnosticKey>,
    has_errors: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic to this collector.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if !self.seen.insert(key(&diagnostic)) {
            return;
        }
        if diagnostic.severity().is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Finish a phase that must not fail.
    ///
    /// - If there are errors, returns `Err(ParseError)` with all diagnostics.
    /// - Otherwise returns the warnings, possibly none.
    pub fn finish(self) -> Result<Vec<Diagnostic>, ParseError> {
        if self.has_errors {
            Err(ParseError::new(self.diagnostics))
        } else {
            Ok(self.diagnostics)
        }
    }

    /// Returns every collected diagnostic regardless of severity.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_empty_finish_ok() {
        let collector = DiagnosticCollector::new();
        assert!(collector.finish().is_ok_and(|warnings| warnings.is_empty()));
    }

    #[test]
    fn test_collector_warnings_are_kept() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::warning("warning 1"));
        collector.emit(Diagnostic::warning("warning 2"));

        let warnings = collector.finish().expect("warnings only");
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_collector_error_fails() {
        let mut collector = DiagnosticCollector::new();
        collector.emit(Diagnostic::error("error 1"));
        collector.emit(Diagnostic::warning("warning 1"));

        let err = collector.finish().expect_err("has an error");
        assert_eq!(err.diagnostics().len(), 2);
        assert_eq!(err.diagnostics()[0].message(), "error 1");
    }

    #[test]
    fn test_collector_drops_repeated_reports() {
        let span = Span::new(10..15);
        let mut collector = DiagnosticCollector::new();
        for _ in 0..3 {
            collector.emit(
                Diagnostic::warning("binding `ghost` is not declared")
                    .with_code(ErrorCode::E200)
                    .with_label(span, "undeclared binding"),
            );
        }
        collector.emit(
            Diagnostic::warning("binding `ghost` is not declared")
                .with_code(ErrorCode::E200)
                .with_label(Span::new(40..45), "undeclared binding"),
        );

        let warnings = collector.finish().expect("warnings only");
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].labels()[0].span(), span);
    }
}
