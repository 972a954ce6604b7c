//! Merged per-task timeline.
//!
//! Lifecycle events, job milestones and scheduling events of a task in one
//! sequence, ordered by timestamp. The sort is stable, so events with the
//! same timestamp keep the order they were collected in.

use std::fmt;

use serde::Serialize;

use crate::joblog::{JobLog, JobLogKind};
use crate::registry::{Task, TaskEvent, UNSET};
use crate::trace::{Event, SchedEvent};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineLabel {
    Init,
    Migrated,
    StartRealTime,
    Finished,
    AcquireSem,
    AcquiredSem,
    JobSpawned { job: i64, deadline: i64 },
    Deadline { job: i64 },
    JobStarted { job: i64 },
    JobFinished { job: i64, execution_time: i64 },
    Prediction { job: i64, prediction: i64 },
    SchedBegin,
    SchedEnd,
    Runtime { runtime: i64 },
    /// Job log entries, already shifted onto the trace clock.
    LoggedSpawn { job: i64 },
    LoggedBegin { job: i64 },
    LoggedEnd { job: i64 },
}

impl TimelineLabel {
    /// The label with its deadline and durations divided by `divisor`, for
    /// printing next to a timestamp divided the same way. Unset values stay
    /// at [`UNSET`].
    pub fn in_units(&self, divisor: i64) -> TimelineLabel {
        let scale = |v: i64| if v == UNSET { v } else { v / divisor };
        match *self {
            TimelineLabel::JobSpawned { job, deadline } => TimelineLabel::JobSpawned {
                job,
                deadline: scale(deadline),
            },
            TimelineLabel::JobFinished {
                job,
                execution_time,
            } => TimelineLabel::JobFinished {
                job,
                execution_time: scale(execution_time),
            },
            TimelineLabel::Prediction { job, prediction } => TimelineLabel::Prediction {
                job,
                prediction: scale(prediction),
            },
            TimelineLabel::Runtime { runtime } => TimelineLabel::Runtime {
                runtime: scale(runtime),
            },
            ref other => other.clone(),
        }
    }
}

impl fmt::Display for TimelineLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineLabel::Init => write!(f, "init"),
            TimelineLabel::Migrated => write!(f, "migrated"),
            TimelineLabel::StartRealTime => write!(f, "start real time"),
            TimelineLabel::Finished => write!(f, "finished"),
            TimelineLabel::AcquireSem => write!(f, "acquire_sem"),
            TimelineLabel::AcquiredSem => write!(f, "acquired_sem"),
            TimelineLabel::JobSpawned { job, deadline } => {
                write!(f, "job {job} spawned with deadline {deadline}")
            }
            TimelineLabel::Deadline { job } => write!(f, "deadline for job {job}"),
            TimelineLabel::JobStarted { job } => write!(f, "job {job} started execution"),
            TimelineLabel::JobFinished {
                job,
                execution_time,
            } => {
                write!(
                    f,
                    "job {job} finished execution. Execution time: {execution_time}"
                )
            }
            TimelineLabel::Prediction { job, prediction } => {
                write!(f, "job {job} predicted runtime {prediction}")
            }
            TimelineLabel::SchedBegin => write!(f, "sched_begin"),
            TimelineLabel::SchedEnd => write!(f, "sched_end"),
            TimelineLabel::Runtime { runtime } => write!(f, "runtime: {runtime}"),
            TimelineLabel::LoggedSpawn { job } => write!(f, "log: job {job} spawned"),
            TimelineLabel::LoggedBegin { job } => write!(f, "log: job {job} began"),
            TimelineLabel::LoggedEnd { job } => write!(f, "log: job {job} ended"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub ts: i64,
    pub task: i64,
    #[serde(flatten)]
    pub label: TimelineLabel,
}

fn push_single(entries: &mut Vec<TimelineEntry>, task: i64, event: &Event, label: TimelineLabel) {
    if let Event::Record(record) = event {
        entries.push(TimelineEntry {
            ts: record.ts,
            task,
            label,
        });
    }
}

fn push_all(
    entries: &mut Vec<TimelineEntry>,
    task: i64,
    events: &[TaskEvent],
    label: impl Fn(&SchedEvent) -> TimelineLabel,
) {
    entries.extend(events.iter().map(|e| TimelineEntry {
        ts: e.record.ts,
        task,
        label: label(&e.event),
    }));
}

/// Build the timeline of a finalized task.
///
/// Events that were never observed (placeholders, unset job times) are left
/// out rather than showing up at time -1.
pub fn task_timeline(task: &Task) -> Vec<TimelineEntry> {
    let id = task.id;
    let mut entries = Vec::new();

    push_single(&mut entries, id, &task.init_event, TimelineLabel::Init);
    push_single(&mut entries, id, &task.migrated_event, TimelineLabel::Migrated);
    push_single(
        &mut entries,
        id,
        &task.started_real_time_event,
        TimelineLabel::StartRealTime,
    );
    push_single(&mut entries, id, &task.finished_event, TimelineLabel::Finished);
    push_all(&mut entries, id, &task.acquire_sem_events, |_| {
        TimelineLabel::AcquireSem
    });
    push_all(&mut entries, id, &task.acquired_sem_events, |_| {
        TimelineLabel::AcquiredSem
    });

    for job in task.sorted_jobs() {
        let mut push = |ts: i64, label: TimelineLabel| {
            if ts != UNSET {
                entries.push(TimelineEntry { ts, task: id, label });
            }
        };
        push(
            job.submission_time,
            TimelineLabel::JobSpawned {
                job: job.id,
                deadline: job.deadline,
            },
        );
        push(job.deadline, TimelineLabel::Deadline { job: job.id });
        push(job.begin, TimelineLabel::JobStarted { job: job.id });
        push(
            job.end,
            TimelineLabel::JobFinished {
                job: job.id,
                execution_time: job.execution_time,
            },
        );
    }

    push_all(&mut entries, id, &task.prediction_events, |e| match *e {
        SchedEvent::Prediction {
            job, prediction, ..
        } => TimelineLabel::Prediction { job, prediction },
        _ => TimelineLabel::Prediction {
            job: UNSET,
            prediction: UNSET,
        },
    });
    push_all(&mut entries, id, &task.sched_begin_events, |_| {
        TimelineLabel::SchedBegin
    });
    push_all(&mut entries, id, &task.sched_end_events, |_| {
        TimelineLabel::SchedEnd
    });
    push_all(&mut entries, id, &task.runtime_events, |e| match *e {
        SchedEvent::SchedStatRuntime { runtime, .. } => TimelineLabel::Runtime { runtime },
        _ => TimelineLabel::Runtime { runtime: UNSET },
    });

    entries.sort_by_key(|e| e.ts);
    entries
}

/// Add the job log entries of `task` to an existing timeline and re-sort it.
pub fn merge_job_log(entries: &mut Vec<TimelineEntry>, task: i64, log: &JobLog) {
    entries.extend(
        log.events
            .iter()
            .filter(|e| e.task == task)
            .filter_map(|e| {
                let job = e.job?;
                let label = match e.kind {
                    JobLogKind::Spawn { .. } => TimelineLabel::LoggedSpawn { job },
                    JobLogKind::Begin => TimelineLabel::LoggedBegin { job },
                    JobLogKind::End { .. } => TimelineLabel::LoggedEnd { job },
                };
                Some(TimelineEntry {
                    ts: e.ts,
                    task,
                    label,
                })
            }),
    );
    entries.sort_by_key(|e| e.ts);
}
