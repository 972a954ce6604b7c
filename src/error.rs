//! Fatal reconstruction errors.
//!
//! These are the cases where carrying on would produce silently wrong numbers:
//! a job lifecycle event for a job that was never spawned, a clock alignment
//! without anything to align against, or parallel cohorts of different sizes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructError {
    /// A begin/end/prediction event names a job that was never spawned.
    UnknownJob {
        task: i64,
        job: i64,
        event: &'static str,
    },
    /// Clock alignment needs a first event from both sources.
    EmptyReferenceStream { source: &'static str },
    /// Two cohort variants produced a different number of values.
    CohortSizeMismatch {
        variant: String,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for ReconstructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructError::UnknownJob { task, job, event } => {
                write!(f, "task {task}: {event} event for job {job} which was never spawned")
            }
            ReconstructError::EmptyReferenceStream { source } => {
                write!(f, "cannot align clocks: no {source} events")
            }
            ReconstructError::CohortSizeMismatch {
                variant,
                expected,
                got,
            } => {
                write!(
                    f,
                    "variant {variant}: expected {expected} values to match the first variant, got {got}"
                )
            }
        }
    }
}

impl std::error::Error for ReconstructError {}
