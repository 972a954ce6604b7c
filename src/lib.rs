//! schedeval - rebuild real-time scheduling timelines from text traces.
//!
//! A run of the real-time task library produces two artifacts: a kernel plus
//! userspace trace in text form, and a job log written by the application.
//! This library turns the trace into a per-task model of job lifecycles and
//! scheduling activity, aligns the job log onto the trace clock and derives
//! scheduling quality metrics from the result.
//!
//! # Modules
//!
//! - [`trace`] - Trace line parsing and event classification
//! - [`registry`] - Task and job registry built from classified events
//! - [`reconcile`] - Job finalization, event filtering, clock alignment and merged timelines
//! - [`joblog`] - Application job log parsing
//! - [`metrics`] - Tardiness reports, cohorts and phase durations
//! - [`output`] - Text, CSV and JSON report writers
//!
//! # Example
//!
//! ```no_run
//! use schedeval::{reconstruct, Config, Diagnostics};
//! use std::path::Path;
//!
//! let mut diagnostics = Diagnostics::default();
//! let registry = reconstruct(Path::new("trace.txt"), &Config::default(), &mut diagnostics)
//!     .expect("Failed to reconstruct trace");
//!
//! for report in schedeval::metrics::job_reports(&registry) {
//!     println!("{} {} {:?}", report.task, report.job, report.tardiness);
//! }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod joblog;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod reconcile;
pub mod registry;
pub mod trace;

pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::ReconstructError;
pub use joblog::JobLog;
pub use registry::Registry;

use std::path::Path;

use anyhow::{Context, Result};

/// Parse a trace file and build a finished registry from it.
///
/// Recoverable problems end up in `diagnostics`; a job lifecycle event for a
/// job that was never spawned is fatal.
pub fn reconstruct(path: &Path, config: &Config, diagnostics: &mut Diagnostics) -> Result<Registry> {
    let records = trace::parse_trace_file(path, diagnostics)?;
    let mut registry = Registry::from_records(records, &config.providers, diagnostics);
    registry
        .finish(diagnostics)
        .with_context(|| format!("Failed to reconstruct {}", path.display()))?;
    Ok(registry)
}
