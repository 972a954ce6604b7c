//! Typed view over trace records.
//!
//! Routing works on a closed set of event kinds. Each variant carries only the
//! fields that matter for it, parsed and checked when the record is
//! classified instead of being looked up ad hoc later on.

use std::fmt;

use super::constants::*;
use super::event::TraceRecord;

/// A trace record classified by kind.
#[derive(Clone, Debug, PartialEq)]
pub enum SchedEvent {
    InitTask { task: i64, pid: i64 },
    MigratedTask { task: i64 },
    StartedRealTime { task: i64 },
    FinishedTask { task: i64 },
    AcquireSem { task: i64 },
    AcquiredSem { task: i64 },
    JobSpawn { task: i64, job: i64, relative_deadline: i64 },
    BeginJob { task: i64, job: i64 },
    EndJob { task: i64, job: i64, runtime: i64 },
    Prediction { task: i64, job: i64, prediction: i64 },
    /// Context switch, keyed by OS thread ids on both sides.
    SchedSwitch { prev_tid: i64, next_tid: i64 },
    /// Runtime accounting sample, keyed by OS thread id.
    SchedStatRuntime { tid: i64, runtime: i64 },
}

/// A record of a known kind whose payload is missing or has a malformed field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub kind: String,
    pub field: &'static str,
    pub value: Option<String>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: invalid value '{value}' for field {}", self.kind, self.field),
            None => write!(f, "{}: missing field {}", self.kind, self.field),
        }
    }
}

impl std::error::Error for FieldError {}

/// Split `provider:name` into its halves. Kernel events have no provider.
fn split_kind(kind: &str) -> (Option<&str>, &str) {
    match kind.split_once(':') {
        Some((provider, name)) => (Some(provider), name),
        None => (None, kind),
    }
}

fn int_field(record: &TraceRecord, field: &'static str) -> Result<i64, FieldError> {
    let raw = record.field(field).ok_or_else(|| FieldError {
        kind: record.kind.clone(),
        field,
        value: None,
    })?;
    raw.parse::<i64>().map_err(|_| FieldError {
        kind: record.kind.clone(),
        field,
        value: Some(raw.to_string()),
    })
}

fn non_negative_field(record: &TraceRecord, field: &'static str) -> Result<i64, FieldError> {
    let value = int_field(record, field)?;
    if value < 0 {
        return Err(FieldError {
            kind: record.kind.clone(),
            field,
            value: Some(value.to_string()),
        });
    }
    Ok(value)
}

impl SchedEvent {
    /// Classify a record.
    ///
    /// Returns `Ok(None)` for kinds that are not part of the task model, or
    /// for userspace tracepoints from a provider not in `providers`.
    pub fn classify(record: &TraceRecord, providers: &[String]) -> Result<Option<Self>, FieldError> {
        let (provider, name) = split_kind(&record.kind);
        let task = || int_field(record, "task");

        let event = match (provider, name) {
            (None, SCHED_SWITCH) => SchedEvent::SchedSwitch {
                prev_tid: int_field(record, "prev_tid")?,
                next_tid: int_field(record, "next_tid")?,
            },
            (None, SCHED_STAT_RUNTIME) => SchedEvent::SchedStatRuntime {
                tid: int_field(record, "tid")?,
                runtime: int_field(record, "runtime")?,
            },
            (None, _) => return Ok(None),
            (Some(p), _) if !providers.iter().any(|known| known == p) => return Ok(None),
            (Some(_), INIT_TASK) => SchedEvent::InitTask {
                task: int_field(record, "tid")?,
                pid: int_field(record, "pid")?,
            },
            (Some(_), MIGRATED_TASK) => SchedEvent::MigratedTask { task: task()? },
            (Some(_), STARTED_REAL_TIME_TASK) => SchedEvent::StartedRealTime { task: task()? },
            (Some(_), FINISHED_TASK) => SchedEvent::FinishedTask { task: task()? },
            (Some(_), ACQUIRE_SEM) => SchedEvent::AcquireSem { task: task()? },
            (Some(_), ACQUIRED_SEM) => SchedEvent::AcquiredSem { task: task()? },
            (Some(_), JOB_SPAWN) => SchedEvent::JobSpawn {
                task: task()?,
                job: int_field(record, "job")?,
                relative_deadline: non_negative_field(record, "deadline")?,
            },
            (Some(_), BEGIN_JOB) => SchedEvent::BeginJob {
                task: task()?,
                job: int_field(record, "job")?,
            },
            (Some(_), END_JOB) => SchedEvent::EndJob {
                task: task()?,
                job: int_field(record, "job")?,
                runtime: int_field(record, "runtime")?,
            },
            (Some(_), PREDICTION) => SchedEvent::Prediction {
                task: task()?,
                job: int_field(record, "job")?,
                prediction: int_field(record, "prediction")?,
            },
            (Some(_), _) => return Ok(None),
        };
        Ok(Some(event))
    }

    /// The task id this event names directly, if it is keyed by task id.
    ///
    /// Scheduler events are keyed by OS thread id and return `None`.
    pub fn task(&self) -> Option<i64> {
        match *self {
            SchedEvent::InitTask { task, .. }
            | SchedEvent::MigratedTask { task }
            | SchedEvent::StartedRealTime { task }
            | SchedEvent::FinishedTask { task }
            | SchedEvent::AcquireSem { task }
            | SchedEvent::AcquiredSem { task }
            | SchedEvent::JobSpawn { task, .. }
            | SchedEvent::BeginJob { task, .. }
            | SchedEvent::EndJob { task, .. }
            | SchedEvent::Prediction { task, .. } => Some(task),
            SchedEvent::SchedSwitch { .. } | SchedEvent::SchedStatRuntime { .. } => None,
        }
    }
}
