//! Task/job registry.
//!
//! The registry owns every [`Task`] seen in one trace, keyed by task id, and
//! keeps the OS thread id -> task id relation next to it. The kernel scheduler
//! events only know thread ids, so they are resolved through that relation;
//! everything else names its task directly.
//!
//! Events that reference a task or thread the trace never initialized are
//! dropped. For scheduler events that is the common case: most of the
//! switches in a system-wide trace belong to unrelated processes.

mod task;

pub use task::{Job, Task, TaskEvent, UNSET};

use std::collections::{BTreeMap, HashMap};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::trace::{SchedEvent, TraceRecord};

#[derive(Debug, Default)]
pub struct Registry {
    tasks: BTreeMap<i64, Task>,
    pid_to_task: HashMap<i64, i64>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a whole trace.
    ///
    /// All init events are registered before anything else is routed, so a
    /// task's events are kept even if they show up before its init line.
    /// Records of kinds outside the task model are ignored; records of a known
    /// kind with bad fields are reported to `diagnostics`.
    pub fn from_records(
        records: Vec<TraceRecord>,
        providers: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut registry = Self::new();
        let mut pending = Vec::new();

        for record in records {
            match SchedEvent::classify(&record, providers) {
                Ok(Some(SchedEvent::InitTask { task, pid })) => {
                    registry.register_task(task, pid, Some(record));
                }
                Ok(Some(event)) => pending.push((record, event)),
                Ok(None) => {}
                Err(e) => diagnostics.warn(Diagnostic::MalformedEvent {
                    ts: record.ts,
                    message: e.to_string(),
                }),
            }
        }

        let total = pending.len();
        let mut routed = 0;
        for (record, event) in pending {
            if registry.route(record, event) > 0 {
                routed += 1;
            }
        }
        tracing::info!(
            "Registered {} tasks, routed {} of {} task events",
            registry.tasks.len(),
            routed,
            total
        );
        registry
    }

    /// Register a task. The first registration of an id wins.
    ///
    /// Returns false if the id was already registered.
    pub fn register_task(&mut self, id: i64, pid: i64, init: Option<TraceRecord>) -> bool {
        if self.tasks.contains_key(&id) {
            tracing::debug!("Ignoring duplicate init for task {id} (pid {pid})");
            return false;
        }
        let mut task = Task::new(id, pid);
        if let Some(record) = init {
            task.add_init_event(record);
        }
        self.tasks.insert(id, task);
        self.pid_to_task.entry(pid).or_insert(id);
        true
    }

    /// Hand an event to the task(s) it belongs to.
    ///
    /// Returns how many tasks received it: a context switch between two
    /// traced tasks lands on both, one between untraced processes on none.
    pub fn route(&mut self, record: TraceRecord, event: SchedEvent) -> usize {
        match event {
            SchedEvent::InitTask { task, pid } => {
                usize::from(self.register_task(task, pid, Some(record)))
            }
            SchedEvent::SchedSwitch { prev_tid, next_tid } => {
                let prev = self.pid_to_task.get(&prev_tid).copied();
                let next = self.pid_to_task.get(&next_tid).copied();
                let mut routed = 0;
                if let Some(task) = prev.and_then(|id| self.tasks.get_mut(&id)) {
                    task.add_sched_end_event(record.clone(), event.clone());
                    routed += 1;
                }
                if let Some(task) = next.and_then(|id| self.tasks.get_mut(&id)) {
                    task.add_sched_begin_event(record, event);
                    routed += 1;
                }
                routed
            }
            SchedEvent::SchedStatRuntime { tid, .. } => {
                match self.task_for_pid_mut(tid) {
                    Some(task) => {
                        task.add_runtime_event(record, event);
                        1
                    }
                    None => 0,
                }
            }
            _ => {
                let Some(id) = event.task() else {
                    return 0;
                };
                match self.tasks.get_mut(&id) {
                    Some(task) => {
                        task.add_event(record, event);
                        1
                    }
                    None => {
                        tracing::debug!("Dropping {} for unknown task {id}", record.kind);
                        0
                    }
                }
            }
        }
    }

    pub fn task(&self, id: i64) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn task_mut(&mut self, id: i64) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    /// Look up a task by the OS thread id it ran as.
    pub fn task_for_pid(&self, pid: i64) -> Option<&Task> {
        self.pid_to_task.get(&pid).and_then(|id| self.tasks.get(id))
    }

    fn task_for_pid_mut(&mut self, pid: i64) -> Option<&mut Task> {
        let id = *self.pid_to_task.get(&pid)?;
        self.tasks.get_mut(&id)
    }

    /// Tasks in ascending task id order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
