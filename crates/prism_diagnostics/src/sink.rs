//! Collects the diagnostics of an export session.

use std::sync::Mutex;

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Shared collector for everything a session reports.
///
/// Emitting takes `&self`, so the cache store, the allocator and the
/// pipeline can all hold the same sink. Each diagnostic is logged through
/// `tracing` at the matching level as it arrives.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag` and logs it.
    pub fn emit(&self, diag: Diagnostic) {
        log(&diag);
        self.diagnostics.lock().unwrap().push(diag);
    }

    /// Number of diagnostics of `severity` recorded so far.
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Number of recorded diagnostics carrying `code`.
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.code == code)
            .count()
    }

    /// A copy of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }

    /// Drains the sink.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap())
    }
}

fn log(diag: &Diagnostic) {
    let subject = diag.subject.as_deref().unwrap_or("-");
    match diag.severity {
        Severity::Error => tracing::error!(code = %diag.code, subject, "{}", diag.message),
        Severity::Warning => tracing::warn!(code = %diag.code, subject, "{}", diag.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_failure() -> Diagnostic {
        Diagnostic::error(DiagnosticCode::DEPENDENCY_CYCLE_ON_STRIP, "Hinge <-> Joint")
            .with_subject("Stage/Door")
    }

    fn bad_line() -> Diagnostic {
        Diagnostic::warning(DiagnosticCode::MALFORMED_CACHE_LINE, "dangling token '4'")
    }

    #[test]
    fn new_sink_is_empty() {
        let sink = DiagnosticSink::new();
        assert_eq!(sink.count(Severity::Error), 0);
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn counts_by_severity_and_code() {
        let sink = DiagnosticSink::new();
        sink.emit(strip_failure());
        sink.emit(bad_line());
        sink.emit(bad_line());
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.count(Severity::Warning), 2);
        assert_eq!(sink.count_code(DiagnosticCode::MALFORMED_CACHE_LINE), 2);
        assert_eq!(sink.count_code(DiagnosticCode::DUPLICATE_IDENTITY), 0);
    }

    #[test]
    fn snapshot_keeps_and_take_drains() {
        let sink = DiagnosticSink::new();
        sink.emit(strip_failure());
        assert_eq!(sink.diagnostics().len(), 1);
        assert_eq!(sink.diagnostics().len(), 1);

        let drained = sink.take_all();
        assert_eq!(drained[0].subject.as_deref(), Some("Stage/Door"));
        assert!(sink.take_all().is_empty());
    }
}
