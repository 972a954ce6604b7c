//! Timeline reconciliation.
//!
//! Runs once the registry has seen every event: derives the job timing
//! fields, drops the scheduler bookkeeping that happened before a task had
//! any work, aligns the application job log onto the trace clock and merges
//! everything into a per-task timeline.
//!
//! # Module Organization
//!
//! - [`align`]: Clock offset between the trace and the job log
//! - [`timeline`]: Merged, time-ordered per-task view

pub mod align;
pub mod timeline;

pub use align::{align_job_log, compute_offset, first_sched_event, ClockAlignment};
pub use timeline::{merge_job_log, task_timeline, TimelineEntry, TimelineLabel};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ReconstructError;
use crate::registry::{Job, Registry, Task, TaskEvent};
use crate::trace::SchedEvent;

/// Anything that sits at a point on a timeline.
pub trait Timestamped {
    fn ts(&self) -> i64;
}

impl Timestamped for TaskEvent {
    fn ts(&self) -> i64 {
        self.record.ts
    }
}

/// Keep the events at or after `start`.
pub fn retain_from<T: Timestamped>(events: &mut Vec<T>, start: i64) {
    events.retain(|e| e.ts() >= start);
}

impl Task {
    /// Build the jobs from the routed lifecycle events and filter out the
    /// scheduling events that predate the first job.
    ///
    /// A begin, end or prediction for a job id that was never spawned fails
    /// the task.
    pub fn finish_initialisation(&mut self) -> Result<(), ReconstructError> {
        for e in &self.job_spawn_events {
            if let SchedEvent::JobSpawn {
                job,
                relative_deadline,
                ..
            } = e.event
            {
                self.jobs
                    .entry(job)
                    .or_insert_with(|| Job::new(job, e.record.ts, relative_deadline));
            }
        }

        for e in &self.begin_job_events {
            if let SchedEvent::BeginJob { job, .. } = e.event {
                lookup_job(self.id, &mut self.jobs, job, "begin")?.begin = e.record.ts;
            }
        }

        for e in &self.end_job_events {
            if let SchedEvent::EndJob { job, runtime, .. } = e.event {
                let job = lookup_job(self.id, &mut self.jobs, job, "end")?;
                job.end = e.record.ts;
                job.execution_time = runtime;
            }
        }

        for e in &self.prediction_events {
            if let SchedEvent::Prediction {
                job, prediction, ..
            } = e.event
            {
                lookup_job(self.id, &mut self.jobs, job, "prediction")?.prediction =
                    Some(prediction);
            }
        }

        let Some(first_job_spawn) = self.first_job_spawn() else {
            return Ok(());
        };

        let before = self.sched_begin_events.len() + self.sched_end_events.len();
        retain_from(&mut self.sched_begin_events, first_job_spawn);
        retain_from(&mut self.sched_end_events, first_job_spawn);
        let after = self.sched_begin_events.len() + self.sched_end_events.len();
        tracing::debug!(
            "Task {}: {} jobs, dropped {} scheduling events before first spawn at {}",
            self.id,
            self.jobs.len(),
            before - after,
            first_job_spawn
        );
        Ok(())
    }

    /// Report jobs that are incomplete or whose times are out of order.
    pub fn check_jobs(&self, diagnostics: &mut Diagnostics) {
        for job in self.sorted_jobs() {
            if !job.is_complete() {
                diagnostics.warn(Diagnostic::IncompleteJob {
                    task: self.id,
                    job: job.id,
                });
                continue;
            }
            if job.begin < job.submission_time {
                diagnostics.warn(Diagnostic::InconsistentJob {
                    task: self.id,
                    job: job.id,
                    message: format!(
                        "began at {} before submission at {}",
                        job.begin, job.submission_time
                    ),
                });
            } else if job.end < job.begin {
                diagnostics.warn(Diagnostic::InconsistentJob {
                    task: self.id,
                    job: job.id,
                    message: format!("ended at {} before beginning at {}", job.end, job.begin),
                });
            }
        }
    }
}

fn lookup_job<'a>(
    task: i64,
    jobs: &'a mut std::collections::HashMap<i64, Job>,
    job: i64,
    event: &'static str,
) -> Result<&'a mut Job, ReconstructError> {
    jobs.get_mut(&job)
        .ok_or(ReconstructError::UnknownJob { task, job, event })
}

impl Registry {
    /// Finalize every task. Fails on the first task with a lifecycle event
    /// for an unknown job.
    pub fn finish(&mut self, diagnostics: &mut Diagnostics) -> Result<(), ReconstructError> {
        for task in self.tasks_mut() {
            task.finish_initialisation()?;
            task.check_jobs(diagnostics);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceRecord;
    use std::collections::HashMap;

    fn record(ts: i64, kind: &str) -> TraceRecord {
        TraceRecord {
            ts,
            precision: 9,
            cpu: 0,
            kind: kind.to_string(),
            fields: HashMap::new(),
        }
    }

    fn spawn(task: &mut Task, ts: i64, job: i64, relative_deadline: i64) {
        task.add_event(
            record(ts, "sched_sim:job_spawn"),
            SchedEvent::JobSpawn {
                task: task.id,
                job,
                relative_deadline,
            },
        );
    }

    fn begin(task: &mut Task, ts: i64, job: i64) {
        task.add_event(
            record(ts, "sched_sim:begin_job"),
            SchedEvent::BeginJob { task: task.id, job },
        );
    }

    fn end(task: &mut Task, ts: i64, job: i64, runtime: i64) {
        task.add_event(
            record(ts, "sched_sim:end_job"),
            SchedEvent::EndJob {
                task: task.id,
                job,
                runtime,
            },
        );
    }

    fn switch_in(task: &mut Task, ts: i64) {
        let event = SchedEvent::SchedSwitch {
            prev_tid: 0,
            next_tid: task.pid,
        };
        task.add_sched_begin_event(record(ts, "sched_switch"), event);
    }

    fn switch_out(task: &mut Task, ts: i64) {
        let event = SchedEvent::SchedSwitch {
            prev_tid: task.pid,
            next_tid: 0,
        };
        task.add_sched_end_event(record(ts, "sched_switch"), event);
    }

    #[test]
    fn test_finish_builds_jobs() {
        let mut task = Task::new(0, 42);
        spawn(&mut task, 100, 0, 50);
        begin(&mut task, 110, 0);
        end(&mut task, 140, 0, 30);
        task.finish_initialisation().unwrap();

        let job = &task.jobs[&0];
        assert_eq!(job.submission_time, 100);
        assert_eq!(job.deadline, 150);
        assert_eq!(job.begin, 110);
        assert_eq!(job.end, 140);
        assert_eq!(job.execution_time, 30);
    }

    #[test]
    fn test_finish_without_jobs_keeps_sched_events() {
        let mut task = Task::new(0, 42);
        switch_in(&mut task, 5);
        switch_out(&mut task, 6);
        task.finish_initialisation().unwrap();
        assert!(task.jobs.is_empty());
        assert_eq!(task.sched_begin_events.len(), 1);
        assert_eq!(task.sched_end_events.len(), 1);
    }

    #[test]
    fn test_filter_boundary() {
        let mut task = Task::new(0, 42);
        spawn(&mut task, 200, 1, 50);
        spawn(&mut task, 100, 0, 50);
        for ts in [99, 100, 101] {
            switch_in(&mut task, ts);
            switch_out(&mut task, ts);
        }
        task.finish_initialisation().unwrap();

        let begins: Vec<i64> = task.sched_begin_events.iter().map(|e| e.ts()).collect();
        let ends: Vec<i64> = task.sched_end_events.iter().map(|e| e.ts()).collect();
        assert_eq!(begins, vec![100, 101]);
        assert_eq!(ends, vec![100, 101]);
    }

    #[test]
    fn test_begin_for_unknown_job() {
        let mut task = Task::new(3, 42);
        spawn(&mut task, 100, 0, 50);
        begin(&mut task, 110, 7);
        assert_eq!(
            task.finish_initialisation().unwrap_err(),
            ReconstructError::UnknownJob {
                task: 3,
                job: 7,
                event: "begin"
            }
        );
    }

    #[test]
    fn test_end_without_spawn() {
        let mut task = Task::new(3, 42);
        end(&mut task, 140, 0, 30);
        assert!(matches!(
            task.finish_initialisation(),
            Err(ReconstructError::UnknownJob { event: "end", .. })
        ));
    }

    #[test]
    fn test_prediction_attached() {
        let mut task = Task::new(0, 42);
        spawn(&mut task, 100, 0, 50);
        task.add_event(
            record(105, "task_lib:prediction"),
            SchedEvent::Prediction {
                task: 0,
                job: 0,
                prediction: 25,
            },
        );
        begin(&mut task, 110, 0);
        end(&mut task, 140, 0, 30);
        task.finish_initialisation().unwrap();
        assert_eq!(task.jobs[&0].prediction, Some(25));
        assert_eq!(task.jobs[&0].prediction_error(), Some(-5));
    }

    #[test]
    fn test_job_ordering_invariants() {
        let mut task = Task::new(0, 42);
        for (i, base) in [100, 300, 500].iter().enumerate() {
            let id = i as i64;
            spawn(&mut task, *base, id, 150);
            begin(&mut task, base + 10, id);
            end(&mut task, base + 90, id, 80);
        }
        spawn(&mut task, 700, 3, 150);
        task.finish_initialisation().unwrap();

        for job in task.jobs.values() {
            assert!(job.submission_time <= job.deadline);
            if job.is_complete() {
                assert!(job.submission_time <= job.begin);
                assert!(job.begin <= job.end);
            }
        }
        let mut diagnostics = Diagnostics::default();
        task.check_jobs(&mut diagnostics);
        assert_eq!(
            diagnostics.warnings,
            vec![Diagnostic::IncompleteJob { task: 0, job: 3 }]
        );
    }

    #[test]
    fn test_check_jobs_inconsistent() {
        let mut task = Task::new(0, 42);
        spawn(&mut task, 100, 0, 50);
        begin(&mut task, 90, 0);
        end(&mut task, 95, 0, 5);
        task.finish_initialisation().unwrap();
        let mut diagnostics = Diagnostics::default();
        task.check_jobs(&mut diagnostics);
        assert!(matches!(
            diagnostics.warnings[0],
            Diagnostic::InconsistentJob { task: 0, job: 0, .. }
        ));
    }
}
