//! Analysis configuration.
//!
//! Defaults match the task library's tracepoints and the job log written by
//! the simulator. A JSON file can override any subset of the fields; the
//! command line overrides the file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Userspace tracepoint providers whose task events are modelled.
    pub providers: Vec<String>,
    /// Event kind carrying the per-frame render tardiness.
    pub render_event: String,
    /// Guard subtracted from the clock offset between the job log and the
    /// trace, in trace units.
    pub alignment_epsilon: i64,
    /// Trace units per job log time unit (job log in microseconds, trace in
    /// nanoseconds by default).
    pub joblog_time_scale: i64,
    /// Trace units per unit in the text reports.
    pub report_time_divisor: i64,
    /// Render tardiness within this tolerance counts as on time.
    pub render_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: vec!["sched_sim".to_string(), "task_lib".to_string()],
            render_event: "play_video:render".to_string(),
            // 5us, the slack the task library leaves when spinning out a job
            alignment_epsilon: 5_000,
            joblog_time_scale: 1_000,
            report_time_divisor: 1_000,
            render_tolerance: 1_000.0,
        }
    }
}

impl Config {
    pub fn from_json(buf: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(buf)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let buf = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&buf).with_context(|| format!("Invalid config {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.joblog_time_scale <= 0 {
            anyhow::bail!("joblog_time_scale must be positive");
        }
        if self.report_time_divisor <= 0 {
            anyhow::bail!("report_time_divisor must be positive");
        }
        if self.render_tolerance < 0.0 {
            anyhow::bail!("render_tolerance must not be negative");
        }
        Ok(())
    }
}
