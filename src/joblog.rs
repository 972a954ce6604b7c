//! Application job log parsing.
//!
//! The job log is written by the workload itself, on its own clock, one event
//! per line:
//!
//! ```text
//! <task_id> <event_kind> <timestamp> [<job_id> [<extra>]]
//! ```
//!
//! Fields are separated by spaces or colons. Kinds are `s`/`spawn` (extra is
//! the absolute deadline), `b`/`begin` and `e`/`end` (extra is the runtime).
//! Times are in job log units and may carry a fraction of a unit: `1000`,
//! `1000.0` and `1000.000` are the same instant, `1.5` is one and a half
//! units. They are multiplied by the configured scale to land in trace units.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ReconstructError;
use crate::registry::{Job, UNSET};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobLogKind {
    Spawn { deadline: i64 },
    Begin,
    End { runtime: Option<i64> },
}

/// One job log line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobLogEvent {
    pub task: i64,
    pub ts: i64,
    pub job: Option<i64>,
    pub kind: JobLogKind,
}

/// A job log time converted to trace units. Sub-unit precision beyond what
/// `scale` can express is truncated.
fn parse_time(raw: &str, scale: i64) -> Option<i64> {
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty() || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole = whole.parse::<i64>().ok()?.checked_mul(scale)?;

    // At most 18 fractional digits, so digits * scale stays within i128.
    let frac = &frac[..frac.len().min(18)];
    if frac.is_empty() {
        return Some(whole);
    }
    let digits = frac.parse::<i128>().ok()?;
    let part = digits * i128::from(scale) / 10_i128.pow(frac.len() as u32);
    whole.checked_add(i64::try_from(part).ok()?)
}

/// Parse one job log line. `scale` converts job log time units to trace units.
///
/// Returns `None` for lines that don't match the expected shape.
pub fn parse_job_log_line(line: &str, scale: i64) -> Option<JobLogEvent> {
    let parts: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ':')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 3 || parts.len() > 5 {
        return None;
    }

    let task = parts[0].parse::<i64>().ok()?;
    let ts = parse_time(parts[2], scale)?;
    let job = match parts.get(3) {
        Some(raw) => Some(raw.parse::<i64>().ok()?),
        None => None,
    };
    let extra = match parts.get(4) {
        Some(raw) => Some(parse_time(raw, scale)?),
        None => None,
    };

    let kind = match parts[1] {
        "s" | "spawn" => JobLogKind::Spawn { deadline: extra? },
        "b" | "begin" => JobLogKind::Begin,
        "e" | "end" => JobLogKind::End { runtime: extra },
        _ => return None,
    };
    // Every lifecycle event has to say which job it belongs to.
    if job.is_none() {
        return None;
    }

    Some(JobLogEvent {
        task,
        ts,
        job,
        kind,
    })
}

/// Every event of an application job log, in file order.
#[derive(Clone, Debug, Default)]
pub struct JobLog {
    pub events: Vec<JobLogEvent>,
}

impl JobLog {
    pub fn parse<R: BufRead>(reader: R, scale: i64, diagnostics: &mut Diagnostics) -> Result<Self> {
        let mut events = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", idx + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_job_log_line(&line, scale) {
                Some(event) => events.push(event),
                None => diagnostics.warn(Diagnostic::UnparseableLine {
                    line_number: idx + 1,
                    line,
                }),
            }
        }
        Ok(Self { events })
    }

    pub fn parse_file(path: &Path, scale: i64, diagnostics: &mut Diagnostics) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Failed to open job log {}", path.display()))?;
        let log = Self::parse(BufReader::new(file), scale, diagnostics)
            .with_context(|| format!("Failed to read job log {}", path.display()))?;
        tracing::info!("Parsed {} job log events from {}", log.events.len(), path.display());
        Ok(log)
    }

    /// Timestamp of the earliest job begin.
    pub fn first_job_begin(&self) -> Option<i64> {
        self.events
            .iter()
            .filter(|e| e.kind == JobLogKind::Begin)
            .map(|e| e.ts)
            .min()
    }

    /// Shift every timestamp by `-offset`. Deadlines move with them; runtimes
    /// are durations and stay put.
    pub fn shift(&mut self, offset: i64) {
        for event in &mut self.events {
            event.ts = event.ts.saturating_sub(offset);
            if let JobLogKind::Spawn { deadline } = &mut event.kind {
                *deadline = deadline.saturating_sub(offset);
            }
        }
    }

    /// Materialize the jobs of every task described by the log.
    ///
    /// A begin or end for a job that was never spawned is an error. An end
    /// without a runtime derives it from the begin time when that is known.
    pub fn jobs(&self) -> Result<BTreeMap<i64, BTreeMap<i64, Job>>, ReconstructError> {
        let mut tasks: BTreeMap<i64, BTreeMap<i64, Job>> = BTreeMap::new();

        for event in &self.events {
            let (Some(job_id), JobLogKind::Spawn { deadline }) = (event.job, event.kind) else {
                continue;
            };
            tasks
                .entry(event.task)
                .or_default()
                .entry(job_id)
                .or_insert_with(|| Job::new(job_id, event.ts, deadline.saturating_sub(event.ts)));
        }

        for event in &self.events {
            let Some(job_id) = event.job else {
                continue;
            };
            let name = match event.kind {
                JobLogKind::Spawn { .. } => continue,
                JobLogKind::Begin => "begin",
                JobLogKind::End { .. } => "end",
            };
            let job = tasks
                .get_mut(&event.task)
                .and_then(|jobs| jobs.get_mut(&job_id))
                .ok_or(ReconstructError::UnknownJob {
                    task: event.task,
                    job: job_id,
                    event: name,
                })?;
            match event.kind {
                JobLogKind::Begin => job.begin = event.ts,
                JobLogKind::End { runtime } => {
                    job.end = event.ts;
                    job.execution_time = match runtime {
                        Some(runtime) => runtime,
                        None if job.begin != UNSET => event.ts.saturating_sub(job.begin),
                        None => UNSET,
                    };
                }
                JobLogKind::Spawn { .. } => {}
            }
        }

        Ok(tasks)
    }
}
