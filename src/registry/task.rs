//! Task and job records accumulated from the trace.

use std::collections::HashMap;

use serde::Serialize;

use crate::trace::{Event, SchedEvent, TraceRecord};

/// Sentinel for job times that were never observed.
pub const UNSET: i64 = -1;

/// One activation of a task.
///
/// # Fields
/// - `submission_time`: When the job was spawned (trace units)
/// - `deadline`: Absolute deadline, `submission_time + relative_deadline`
/// - `begin`/`end`: Execution window, [`UNSET`] until observed
/// - `execution_time`: Runtime reported by the job end event, [`UNSET`] until observed
/// - `prediction`: Runtime the task predicted for this job, if it made one
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: i64,
    pub submission_time: i64,
    pub deadline: i64,
    pub begin: i64,
    pub end: i64,
    pub execution_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<i64>,
}

impl Job {
    pub fn new(id: i64, submission_time: i64, relative_deadline: i64) -> Self {
        Self {
            id,
            submission_time,
            deadline: submission_time.saturating_add(relative_deadline),
            begin: UNSET,
            end: UNSET,
            execution_time: UNSET,
            prediction: None,
        }
    }

    /// Returns true once both begin and end have been observed.
    pub fn is_complete(&self) -> bool {
        self.begin != UNSET && self.end != UNSET
    }

    /// `end - deadline` for completed jobs. Positive means the deadline was missed.
    pub fn tardiness(&self) -> Option<i64> {
        self.is_complete()
            .then(|| self.end.saturating_sub(self.deadline))
    }

    /// Returns true if the job completed after its deadline.
    pub fn missed_deadline(&self) -> bool {
        self.tardiness().is_some_and(|t| t > 0)
    }

    /// `prediction - execution_time`, when both are known.
    pub fn prediction_error(&self) -> Option<i64> {
        match self.prediction {
            Some(prediction) if self.execution_time != UNSET => {
                Some(prediction.saturating_sub(self.execution_time))
            }
            _ => None,
        }
    }
}

/// A trace record routed to a task, kept with its typed classification.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskEvent {
    pub record: TraceRecord,
    pub event: SchedEvent,
}

/// Everything the trace says about one task.
///
/// `id` is the task id used by the userspace tracepoints, `pid` is the OS
/// thread id that the kernel scheduler events refer to. The single-shot
/// lifecycle events stay [`Event::Placeholder`] until observed.
#[derive(Debug)]
pub struct Task {
    pub id: i64,
    pub pid: i64,
    pub jobs: HashMap<i64, Job>,
    pub init_event: Event,
    pub migrated_event: Event,
    pub started_real_time_event: Event,
    pub finished_event: Event,
    pub acquire_sem_events: Vec<TaskEvent>,
    pub acquired_sem_events: Vec<TaskEvent>,
    pub sched_begin_events: Vec<TaskEvent>,
    pub sched_end_events: Vec<TaskEvent>,
    pub job_spawn_events: Vec<TaskEvent>,
    pub begin_job_events: Vec<TaskEvent>,
    pub end_job_events: Vec<TaskEvent>,
    pub prediction_events: Vec<TaskEvent>,
    pub runtime_events: Vec<TaskEvent>,
}

/// Keep the first observation of a single-shot event.
fn set_once(slot: &mut Event, record: TraceRecord) {
    if slot.is_placeholder() {
        *slot = Event::Record(record);
    }
}

impl Task {
    pub fn new(id: i64, pid: i64) -> Self {
        Self {
            id,
            pid,
            jobs: HashMap::new(),
            init_event: Event::Placeholder,
            migrated_event: Event::Placeholder,
            started_real_time_event: Event::Placeholder,
            finished_event: Event::Placeholder,
            acquire_sem_events: Vec::new(),
            acquired_sem_events: Vec::new(),
            sched_begin_events: Vec::new(),
            sched_end_events: Vec::new(),
            job_spawn_events: Vec::new(),
            begin_job_events: Vec::new(),
            end_job_events: Vec::new(),
            prediction_events: Vec::new(),
            runtime_events: Vec::new(),
        }
    }

    pub fn add_init_event(&mut self, record: TraceRecord) {
        set_once(&mut self.init_event, record);
    }

    /// File a task-keyed event under its category.
    ///
    /// Scheduler events are keyed by thread id and go through
    /// [`Task::add_sched_begin_event`], [`Task::add_sched_end_event`] and
    /// [`Task::add_runtime_event`] instead.
    pub fn add_event(&mut self, record: TraceRecord, event: SchedEvent) {
        let list = match event {
            SchedEvent::InitTask { .. } => return self.add_init_event(record),
            SchedEvent::MigratedTask { .. } => return set_once(&mut self.migrated_event, record),
            SchedEvent::StartedRealTime { .. } => {
                return set_once(&mut self.started_real_time_event, record)
            }
            SchedEvent::FinishedTask { .. } => return set_once(&mut self.finished_event, record),
            SchedEvent::AcquireSem { .. } => &mut self.acquire_sem_events,
            SchedEvent::AcquiredSem { .. } => &mut self.acquired_sem_events,
            SchedEvent::JobSpawn { .. } => &mut self.job_spawn_events,
            SchedEvent::BeginJob { .. } => &mut self.begin_job_events,
            SchedEvent::EndJob { .. } => &mut self.end_job_events,
            SchedEvent::Prediction { .. } => &mut self.prediction_events,
            SchedEvent::SchedSwitch { .. } | SchedEvent::SchedStatRuntime { .. } => return,
        };
        list.push(TaskEvent { record, event });
    }

    /// The task was switched in.
    pub fn add_sched_begin_event(&mut self, record: TraceRecord, event: SchedEvent) {
        self.sched_begin_events.push(TaskEvent { record, event });
    }

    /// The task was switched out.
    pub fn add_sched_end_event(&mut self, record: TraceRecord, event: SchedEvent) {
        self.sched_end_events.push(TaskEvent { record, event });
    }

    pub fn add_runtime_event(&mut self, record: TraceRecord, event: SchedEvent) {
        self.runtime_events.push(TaskEvent { record, event });
    }

    /// Jobs sorted by submission time, ties broken by job id.
    pub fn sorted_jobs(&self) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self.jobs.values().collect();
        jobs.sort_by_key(|j| (j.submission_time, j.id));
        jobs
    }

    /// Submission time of the earliest job, if there is any.
    pub fn first_job_spawn(&self) -> Option<i64> {
        self.jobs.values().map(|j| j.submission_time).min()
    }
}
