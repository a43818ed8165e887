//! Collector for accumulating diagnostics during a streaming session.

use crate::error::{Diagnostic, ErrorCode};

/// Accumulates every diagnostic raised during one session.
///
/// Each emitted diagnostic is also logged immediately, so the collector is
/// the durable record and the log is the live view.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and log it.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }

    /// All diagnostics recorded so far, in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of diagnostics carrying `code`.
    pub fn count(&self, code: ErrorCode) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.code() == Some(code))
            .count()
    }

    /// Whether any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity().is_error())
    }

    /// Move every diagnostic from `other` into this collector without re-logging.
    pub fn absorb(&mut self, other: Vec<Diagnostic>) {
        self.diagnostics.extend(other);
    }

    /// Remove and return all recorded diagnostics.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Consume the collector.
    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
