//! Diagnosable program errors.
//!
//! Unlike [`IrError`](super::error::IrError), a diagnostic describes a defect
//! in the user's program. Diagnostics are recorded in a [`DiagnosticSink`]
//! and compilation continues so that one run reports as much as possible.

use std::fmt;

use tracing::{error, info, warn};

use super::source_info::SourceInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Two declarations with the same name and signature in one namespace.
    Duplicate,
    /// A convention the structure does not enforce (e.g. a second `@name`).
    Convention,
    /// An invariant failure forwarded by the pipeline before aborting.
    Internal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub src_info: SourceInfo,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, src_info: SourceInfo, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Error, kind, message: message.into(), src_info }
    }

    pub fn warning(kind: DiagnosticKind, src_info: SourceInfo, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, kind, message: message.into(), src_info }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let position = self.src_info.to_position_string();
        if position.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{}: {}: {}", position, self.severity, self.message)
        }
    }
}

/// Destination for diagnostics. The framework never formats or routes
/// messages itself.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Sink that keeps every diagnostic in arrival order.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    /// Moves everything collected so far into `sink`.
    pub fn drain_into(&mut self, sink: &mut dyn DiagnosticSink) {
        for diagnostic in self.diagnostics.drain(..) {
            sink.report(diagnostic);
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Sink that forwards to `tracing` at the matching level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => error!("{}", diagnostic),
            Severity::Warning => warn!("{}", diagnostic),
            Severity::Note => info!("{}", diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_counts() {
        let mut sink = DiagnosticCollector::new();
        sink.report(Diagnostic::error(DiagnosticKind::Duplicate, SourceInfo::invalid(), "dup"));
        sink.report(Diagnostic::warning(DiagnosticKind::Convention, SourceInfo::invalid(), "conv"));
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 1);
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_display_includes_position() {
        let d = Diagnostic::error(
            DiagnosticKind::Duplicate,
            SourceInfo::on_line("prog.p4", 4, 2, 5),
            "x: duplicate declaration",
        );
        assert_eq!(d.to_string(), "prog.p4(4:2): error: x: duplicate declaration");
    }
}
