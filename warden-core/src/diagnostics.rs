//! Diagnostics sink
//!
//! Out-of-band reporting channel for failures that are recovered locally
//! (invalid session records, failed authorization round trips). Reporting never
//! blocks and never fails the caller.

use std::sync::{Mutex, PoisonError};
use tracing::error;

/// Receiver of out-of-band failure reports
pub trait DiagnosticSink: Send + Sync {
    /// Report a free-form message
    fn capture_message(&self, message: &str);

    /// Report a structured error
    fn capture_error(&self, error: &(dyn std::error::Error + 'static));
}

/// Forwards every report to `tracing` under the `diagnostic` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn capture_message(&self, message: &str) {
        error!(target: "diagnostic", "{}", message);
    }

    fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        error!(target: "diagnostic", error = %error, causes = ?causes, "Captured error");
    }
}

/// A single captured report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Message(String),
    Error(String),
}

impl Diagnostic {
    pub fn text(&self) -> &str {
        match self {
            Diagnostic::Message(text) | Diagnostic::Error(text) => text,
        }
    }
}

/// Keeps reports in memory, in arrival order
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything captured so far
    pub fn reports(&self) -> Vec<Diagnostic> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, diagnostic: Diagnostic) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

impl DiagnosticSink for RecordingSink {
    fn capture_message(&self, message: &str) {
        self.push(Diagnostic::Message(message.to_string()));
    }

    fn capture_error(&self, error: &(dyn std::error::Error + 'static)) {
        self.push(Diagnostic::Error(error.to_string()));
    }
}
