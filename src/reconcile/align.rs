//! Clock alignment between the kernel trace and the application job log.
//!
//! The two sources are stamped by different clocks. We assume the first job
//! begin in the job log and the first scheduling event in the trace denote
//! the same instant, give or take `epsilon` to cover the different sampling
//! granularity, and shift the whole job log by the resulting offset.

use serde::Serialize;

use super::Timestamped;
use crate::error::ReconstructError;
use crate::joblog::JobLog;
use crate::registry::Registry;

/// Outcome of aligning the job log onto the trace clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ClockAlignment {
    /// Subtracted from every job log timestamp.
    pub offset: i64,
    pub epsilon: i64,
    /// First job begin in the job log, before alignment.
    pub first_job_begin: i64,
    /// First scheduling event in the trace.
    pub first_sched_event: i64,
}

/// Earliest scheduling event (switch in or out) across all tasks.
///
/// Meant to run after [`Registry::finish`] so the pre-workload bookkeeping
/// is already gone.
pub fn first_sched_event(registry: &Registry) -> Option<i64> {
    registry
        .tasks()
        .flat_map(|t| t.sched_begin_events.iter().chain(t.sched_end_events.iter()))
        .map(Timestamped::ts)
        .min()
}

/// `first_job_begin - first_sched_event - epsilon`, saturating at the `i64` range.
///
/// Both reference points are required; without one of them any offset would
/// be made up.
pub fn compute_offset(
    first_job_begin: Option<i64>,
    first_sched_event: Option<i64>,
    epsilon: i64,
) -> Result<i64, ReconstructError> {
    let begin = first_job_begin.ok_or(ReconstructError::EmptyReferenceStream {
        source: "job log begin",
    })?;
    let sched = first_sched_event.ok_or(ReconstructError::EmptyReferenceStream {
        source: "trace scheduling",
    })?;
    Ok(begin.saturating_sub(sched).saturating_sub(epsilon))
}

/// Shift `log` onto the trace clock of `registry`.
pub fn align_job_log(
    registry: &Registry,
    log: &mut JobLog,
    epsilon: i64,
) -> Result<ClockAlignment, ReconstructError> {
    let first_job_begin = log.first_job_begin();
    let first_sched = first_sched_event(registry);
    let offset = compute_offset(first_job_begin, first_sched, epsilon)?;
    log.shift(offset);

    let alignment = ClockAlignment {
        offset,
        epsilon,
        first_job_begin: first_job_begin.unwrap_or_default(),
        first_sched_event: first_sched.unwrap_or_default(),
    };
    tracing::info!(
        "Aligned job log: offset {} (first begin {}, first sched {}, epsilon {})",
        alignment.offset,
        alignment.first_job_begin,
        alignment.first_sched_event,
        alignment.epsilon
    );
    Ok(alignment)
}
