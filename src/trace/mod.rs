//! Trace line parsing.
//!
//! # Module Organization
//!
//! - [`event`]: Raw [`Event`]/[`TraceRecord`] and the line parser
//! - [`kind`]: Typed [`SchedEvent`] classification used for routing
//! - [`constants`]: Line regex and event kind names

pub mod constants;
pub mod event;
pub mod kind;

pub use event::{normalize_timestamp, parse_line, Event, TraceRecord};
pub use kind::{FieldError, SchedEvent};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::diagnostics::{Diagnostic, Diagnostics};

/// Parse every line from `reader`, keeping the well-formed records in order.
///
/// Unparseable lines are reported to `diagnostics` and skipped.
pub fn parse_trace<R: BufRead>(reader: R, diagnostics: &mut Diagnostics) -> Result<Vec<TraceRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", idx + 1))?;
        match parse_line(&line) {
            Event::Record(record) => records.push(record),
            Event::Unparseable(line) => diagnostics.warn(Diagnostic::UnparseableLine {
                line_number: idx + 1,
                line,
            }),
            Event::Placeholder => {}
        }
    }
    Ok(records)
}

/// Parse a trace report file. The file is closed as soon as the last line is read.
pub fn parse_trace_file(path: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<TraceRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open trace {}", path.display()))?;
    let records = parse_trace(BufReader::new(file), diagnostics)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    tracing::info!(
        "Parsed {} events from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// All records of exactly `kind`, in trace order.
pub fn records_of_kind<'a>(records: &'a [TraceRecord], kind: &'a str) -> impl Iterator<Item = &'a TraceRecord> + 'a {
    records.iter().filter(move |r| r.kind == kind)
}
