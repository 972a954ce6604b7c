//! Common test utilities for schedeval integration tests.
//!
//! Builders for synthetic trace and job log lines. Timestamps are given in
//! nanoseconds and written with nine fractional digits.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const PROVIDER: &str = "sched_sim";

/// One trace line of `kind` at `ts` carrying `fields`.
pub fn trace_line(ts: i64, kind: &str, fields: &[(&str, i64)]) -> String {
    let payload = fields
        .iter()
        .map(|(k, v)| format!("{k} = {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "[12:00:{}.{:09}] (+0.000001000) testhost {kind}: {{ cpu_id = 0 }}, {{ {payload} }}",
        ts / 1_000_000_000,
        ts % 1_000_000_000,
    )
}

/// A line of a userspace task library event.
pub fn task_line(ts: i64, event: &str, fields: &[(&str, i64)]) -> String {
    trace_line(ts, &format!("{PROVIDER}:{event}"), fields)
}

pub fn init_task(ts: i64, task: i64, pid: i64) -> String {
    task_line(ts, "init_task", &[("tid", task), ("pid", pid)])
}

pub fn job_spawn(ts: i64, task: i64, job: i64, deadline: i64) -> String {
    task_line(ts, "job_spawn", &[("task", task), ("job", job), ("deadline", deadline)])
}

pub fn begin_job(ts: i64, task: i64, job: i64) -> String {
    task_line(ts, "begin_job", &[("task", task), ("job", job)])
}

pub fn end_job(ts: i64, task: i64, job: i64, runtime: i64) -> String {
    task_line(ts, "end_job", &[("task", task), ("job", job), ("runtime", runtime)])
}

pub fn sched_switch(ts: i64, prev_tid: i64, next_tid: i64) -> String {
    trace_line(ts, "sched_switch", &[("prev_tid", prev_tid), ("next_tid", next_tid)])
}

pub fn render(ts: i64, tardiness: i64) -> String {
    trace_line(ts, "play_video:render", &[("tardiness", tardiness)])
}

/// Task 0 (pid 1000) with a single job: spawned at `100 * unit` with a
/// relative deadline of `50 * unit`, running from `110 * unit` to
/// `140 * unit`. Switched in at `95 * unit` (before the job) and at
/// `105 * unit`.
pub fn single_job_trace(unit: i64) -> Vec<String> {
    vec![
        init_task(10 * unit, 0, 1000),
        sched_switch(95 * unit, 0, 1000),
        job_spawn(100 * unit, 0, 0, 50 * unit),
        sched_switch(105 * unit, 0, 1000),
        begin_job(110 * unit, 0, 0),
        end_job(140 * unit, 0, 0, 30 * unit),
    ]
}

/// Write `lines` to `dir/name`, one per line.
pub fn write_lines(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content).expect("Failed to write test input");
    path
}
