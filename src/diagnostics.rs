//! Recoverable problems found while reconstructing a trace.
//!
//! Nothing in here stops processing. Every diagnostic is logged through
//! `tracing` as it is recorded and kept so callers can inspect or count them.

use std::fmt;

/// Collected diagnostics for one invocation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Problems that were skipped over.
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Returns true if anything was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Record a diagnostic and emit it on the log.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.warnings.push(diagnostic);
    }

    /// Number of unparseable lines seen so far.
    pub fn unparseable_lines(&self) -> usize {
        self.warnings
            .iter()
            .filter(|d| matches!(d, Diagnostic::UnparseableLine { .. }))
            .count()
    }
}

/// Diagnostic types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A trace or job log line did not have the expected shape.
    UnparseableLine { line_number: usize, line: String },
    /// An event of a known kind had a missing or malformed field.
    MalformedEvent { ts: i64, message: String },
    /// A job never began or never ended inside the trace window.
    IncompleteJob { task: i64, job: i64 },
    /// A job began before it was submitted, or ended before it began.
    InconsistentJob { task: i64, job: i64, message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnparseableLine { line_number, line } => {
                write!(f, "line {line_number} did not match: {line}")
            }
            Diagnostic::MalformedEvent { ts, message } => {
                write!(f, "event at {ts}: {message}")
            }
            Diagnostic::IncompleteJob { task, job } => {
                write!(f, "task {task} job {job}: incomplete in trace window")
            }
            Diagnostic::InconsistentJob { task, job, message } => {
                write!(f, "task {task} job {job}: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut diagnostics = Diagnostics::default();
        assert!(!diagnostics.has_warnings());
        diagnostics.warn(Diagnostic::UnparseableLine {
            line_number: 3,
            line: "garbage".to_string(),
        });
        diagnostics.warn(Diagnostic::IncompleteJob { task: 0, job: 1 });
        assert!(diagnostics.has_warnings());
        assert_eq!(diagnostics.unparseable_lines(), 1);
        assert_eq!(diagnostics.warnings.len(), 2);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::UnparseableLine {
            line_number: 7,
            line: "foo".to_string(),
        };
        assert_eq!(d.to_string(), "line 7 did not match: foo");
        let d = Diagnostic::IncompleteJob { task: 1, job: 2 };
        assert_eq!(d.to_string(), "task 1 job 2: incomplete in trace window");
    }
}
