//! Scheduling-quality metrics.
//!
//! Per-job rows for a reconstructed registry, render tardiness cohorts across
//! parallel runs of the same workload, and phase duration summaries.

use serde::Serialize;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ReconstructError;
use crate::registry::{Job, Registry, UNSET};
use crate::trace::{records_of_kind, FieldError, TraceRecord};

/// One row of the per-job report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub task: i64,
    pub job: i64,
    /// `end - deadline`, `None` when the job is incomplete.
    pub tardiness: Option<i64>,
    pub prediction: Option<i64>,
    /// `prediction - execution_time`, when both are known.
    pub prediction_error: Option<i64>,
    pub execution_time: Option<i64>,
    /// Number of parts the job executed in. Jobs are not split, so always 1.
    pub n_parts: u32,
}

impl JobReport {
    pub fn from_job(task: i64, job: &Job) -> Self {
        Self {
            task,
            job: job.id,
            tardiness: job.tardiness(),
            prediction: job.prediction,
            prediction_error: job.prediction_error(),
            execution_time: (job.execution_time != UNSET).then_some(job.execution_time),
            n_parts: 1,
        }
    }
}

/// Report rows for every job, tasks in id order, jobs in submission order.
pub fn job_reports(registry: &Registry) -> Vec<JobReport> {
    registry
        .tasks()
        .flat_map(|task| {
            task.sorted_jobs()
                .into_iter()
                .map(move |job| JobReport::from_job(task.id, job))
        })
        .collect()
}

/// Aggregate view over a set of job reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TardinessSummary {
    pub jobs: usize,
    pub completed: usize,
    pub deadline_misses: usize,
    pub max_tardiness: Option<i64>,
    pub mean_tardiness: Option<f64>,
}

pub fn summarize(reports: &[JobReport]) -> TardinessSummary {
    let tardiness: Vec<i64> = reports.iter().filter_map(|r| r.tardiness).collect();
    TardinessSummary {
        jobs: reports.len(),
        completed: tardiness.len(),
        deadline_misses: tardiness.iter().filter(|t| **t > 0).count(),
        max_tardiness: tardiness.iter().copied().max(),
        mean_tardiness: (!tardiness.is_empty())
            .then(|| tardiness.iter().map(|t| *t as f64).sum::<f64>() / tardiness.len() as f64),
    }
}

/// A finite float field of `record`, or a diagnostic naming what was wrong.
fn float_field(record: &TraceRecord, field: &'static str, diagnostics: &mut Diagnostics) -> Option<f64> {
    let raw = record.field(field);
    match raw.and_then(|v| v.parse::<f64>().ok()).filter(|v| v.is_finite()) {
        Some(value) => Some(value),
        None => {
            let error = FieldError {
                kind: record.kind.clone(),
                field,
                value: raw.map(str::to_string),
            };
            diagnostics.warn(Diagnostic::MalformedEvent {
                ts: record.ts,
                message: error.to_string(),
            });
            None
        }
    }
}

/// Render tardiness values of one trace run, one slot per render event in
/// trace order.
///
/// A record without a usable `tardiness` field keeps its slot as `None` and
/// is reported, so later frames stay at their index.
pub fn render_tardiness(
    records: &[TraceRecord],
    render_event: &str,
    diagnostics: &mut Diagnostics,
) -> Vec<Option<f64>> {
    records_of_kind(records, render_event)
        .map(|r| float_field(r, "tardiness", diagnostics))
        .collect()
}

/// How late a frame was rendered. The tracepoint records the time left until
/// the frame was due, so lateness is its negation once it exceeds the
/// tolerance; anything within tolerance counts as on time.
pub fn frame_lateness(tardiness: f64, tolerance: f64) -> f64 {
    if tardiness < -tolerance {
        -tardiness
    } else {
        0.0
    }
}

/// Same-index values from several runs of one workload, compared column-wise.
///
/// Missing values (incomplete jobs, malformed render events) are `None`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cohort {
    /// Column names, not counting the leading index column.
    pub columns: Vec<String>,
    /// One row per index, cells in column order.
    pub rows: Vec<Vec<Option<f64>>>,
}

/// Line the variants up index by index.
///
/// Every variant must have as many values as the first one.
fn line_up<T>(variants: Vec<(String, Vec<T>)>) -> Result<(Vec<String>, Vec<Vec<T>>), ReconstructError> {
    let expected = variants.first().map_or(0, |(_, values)| values.len());
    if let Some((name, values)) = variants.iter().find(|(_, v)| v.len() != expected) {
        return Err(ReconstructError::CohortSizeMismatch {
            variant: name.clone(),
            expected,
            got: values.len(),
        });
    }

    let mut names = Vec::with_capacity(variants.len());
    let mut columns = Vec::with_capacity(variants.len());
    for (name, values) in variants {
        names.push(name);
        columns.push(values.into_iter());
    }
    let rows = (0..expected)
        .map(|_| columns.iter_mut().filter_map(|values| values.next()).collect())
        .collect();
    Ok((names, rows))
}

fn as_float(value: Option<i64>) -> Option<f64> {
    value.map(|v| v as f64)
}

impl Cohort {
    /// Frame lateness per variant, one `tard_<variant>` column each.
    pub fn render(
        variants: Vec<(String, Vec<Option<f64>>)>,
        tolerance: f64,
    ) -> Result<Self, ReconstructError> {
        let (names, rows) = line_up(variants)?;
        Ok(Self {
            columns: names.iter().map(|n| format!("tard_{n}")).collect(),
            rows: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|cell| cell.map(|t| frame_lateness(t, tolerance)))
                        .collect()
                })
                .collect(),
        })
    }

    /// Same-index jobs per variant, with `tard_`, `pred_` and `exec_`
    /// columns for each variant.
    pub fn jobs(variants: Vec<(String, Vec<JobReport>)>) -> Result<Self, ReconstructError> {
        let (names, rows) = line_up(variants)?;
        Ok(Self {
            columns: names
                .iter()
                .flat_map(|n| [format!("tard_{n}"), format!("pred_{n}"), format!("exec_{n}")])
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| {
                    row.iter()
                        .flat_map(|r| {
                            [
                                as_float(r.tardiness),
                                as_float(r.prediction),
                                as_float(r.execution_time),
                            ]
                        })
                        .collect()
                })
                .collect(),
        })
    }
}

/// Min/max/mean of a phase duration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DurationStats {
    pub kind: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarize the `duration` field of every record of `kind`.
///
/// Records without a usable duration are reported and left out.
pub fn duration_stats(
    records: &[TraceRecord],
    kind: &str,
    diagnostics: &mut Diagnostics,
) -> Option<DurationStats> {
    let durations: Vec<f64> = records_of_kind(records, kind)
        .filter_map(|r| float_field(r, "duration", diagnostics))
        .collect();
    if durations.is_empty() {
        return None;
    }
    let min = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    Some(DurationStats {
        kind: kind.to_string(),
        count: durations.len(),
        min,
        max,
        mean,
    })
}
