//! Report output formats
//!
//! The `ReportOutput` trait lets the command line tool write reconstructed
//! data without knowing which format was requested. Everything here is
//! presentation only; the numbers come from [`crate::metrics`] and
//! [`crate::reconcile`] untouched, apart from the time unit conversion in the
//! text format.

mod writers;

pub use writers::{CsvOutput, JsonOutput, TextOutput};

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::metrics::{Cohort, DurationStats, JobReport};
use crate::reconcile::{ClockAlignment, TimelineEntry};

/// Trait for abstracting report formats (text, CSV, JSON).
pub trait ReportOutput {
    /// Write per-job rows
    fn write_jobs(&mut self, reports: &[JobReport]) -> Result<()>;

    /// Write a merged timeline
    fn write_timeline(&mut self, entries: &[TimelineEntry]) -> Result<()>;

    /// Write a cohort of same-index values across runs
    fn write_cohort(&mut self, cohort: &Cohort) -> Result<()>;

    /// Write phase duration summaries
    fn write_durations(&mut self, stats: &[DurationStats]) -> Result<()>;

    /// Write the clock alignment between job log and trace
    fn write_alignment(&mut self, alignment: &ClockAlignment) -> Result<()>;

    /// Flush any buffered data to the output
    fn flush(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => bail!("Unknown output format '{s}', expected text, csv or json"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Build the writer for `format`. `time_divisor` converts trace units to
/// report units in the text format.
pub fn create_output<'a>(
    format: OutputFormat,
    writer: Box<dyn Write + 'a>,
    time_divisor: i64,
) -> Box<dyn ReportOutput + 'a> {
    match format {
        OutputFormat::Text => Box::new(TextOutput::new(writer, time_divisor)),
        OutputFormat::Csv => Box::new(CsvOutput::new(writer)),
        OutputFormat::Json => Box::new(JsonOutput::new(writer)),
    }
}
