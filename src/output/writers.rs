//! Text, CSV and JSON implementations of [`ReportOutput`].

use std::io::Write;

use anyhow::Result;
use serde_json::{Map, Value};

use super::ReportOutput;
use crate::metrics::{Cohort, DurationStats, JobReport};
use crate::reconcile::{ClockAlignment, TimelineEntry};

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_cohort_csv(out: &mut dyn Write, cohort: &Cohort) -> Result<()> {
    writeln!(out, "id,{}", cohort.columns.join(","))?;
    for (id, row) in cohort.rows.iter().enumerate() {
        let values: Vec<String> = row.iter().map(|v| optional(*v)).collect();
        writeln!(out, "{id},{}", values.join(","))?;
    }
    Ok(())
}

/// Plain text reports in the format the downstream plotting scripts expect.
///
/// Incomplete jobs are left out of the job lines; they have already been
/// reported as diagnostics.
pub struct TextOutput<'a> {
    out: Box<dyn Write + 'a>,
    time_divisor: i64,
}

impl<'a> TextOutput<'a> {
    pub fn new(out: Box<dyn Write + 'a>, time_divisor: i64) -> Self {
        Self { out, time_divisor }
    }
}

impl ReportOutput for TextOutput<'_> {
    fn write_jobs(&mut self, reports: &[JobReport]) -> Result<()> {
        for report in reports {
            if let Some(tardiness) = report.tardiness {
                writeln!(
                    self.out,
                    "j {} {} {}",
                    report.job,
                    tardiness / self.time_divisor,
                    report.n_parts
                )?;
            }
        }
        Ok(())
    }

    fn write_timeline(&mut self, entries: &[TimelineEntry]) -> Result<()> {
        for entry in entries {
            writeln!(
                self.out,
                "{} {} {}",
                entry.ts / self.time_divisor,
                entry.task,
                entry.label.in_units(self.time_divisor)
            )?;
        }
        Ok(())
    }

    fn write_cohort(&mut self, cohort: &Cohort) -> Result<()> {
        write_cohort_csv(&mut self.out, cohort)
    }

    fn write_durations(&mut self, stats: &[DurationStats]) -> Result<()> {
        for s in stats {
            writeln!(
                self.out,
                "{} - min: {} max: {} mean: {} count: {}",
                s.kind, s.min, s.max, s.mean, s.count
            )?;
        }
        Ok(())
    }

    fn write_alignment(&mut self, alignment: &ClockAlignment) -> Result<()> {
        writeln!(
            self.out,
            "offset {} (first job begin {}, first sched event {}, epsilon {})",
            alignment.offset,
            alignment.first_job_begin,
            alignment.first_sched_event,
            alignment.epsilon
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// CSV with a header row per section. Times stay in trace units.
pub struct CsvOutput<'a> {
    out: Box<dyn Write + 'a>,
}

impl<'a> CsvOutput<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self { out }
    }
}

impl ReportOutput for CsvOutput<'_> {
    fn write_jobs(&mut self, reports: &[JobReport]) -> Result<()> {
        writeln!(
            self.out,
            "task,job,tardiness,prediction,prediction_error,execution_time,n_parts"
        )?;
        for r in reports {
            writeln!(
                self.out,
                "{},{},{},{},{},{},{}",
                r.task,
                r.job,
                optional(r.tardiness),
                optional(r.prediction),
                optional(r.prediction_error),
                optional(r.execution_time),
                r.n_parts
            )?;
        }
        Ok(())
    }

    fn write_timeline(&mut self, entries: &[TimelineEntry]) -> Result<()> {
        writeln!(self.out, "ts,task,event")?;
        for entry in entries {
            writeln!(self.out, "{},{},{}", entry.ts, entry.task, entry.label)?;
        }
        Ok(())
    }

    fn write_cohort(&mut self, cohort: &Cohort) -> Result<()> {
        write_cohort_csv(&mut self.out, cohort)
    }

    fn write_durations(&mut self, stats: &[DurationStats]) -> Result<()> {
        writeln!(self.out, "kind,count,min,max,mean")?;
        for s in stats {
            writeln!(self.out, "{},{},{},{},{}", s.kind, s.count, s.min, s.max, s.mean)?;
        }
        Ok(())
    }

    fn write_alignment(&mut self, alignment: &ClockAlignment) -> Result<()> {
        writeln!(self.out, "offset,epsilon,first_job_begin,first_sched_event")?;
        writeln!(
            self.out,
            "{},{},{},{}",
            alignment.offset, alignment.epsilon, alignment.first_job_begin, alignment.first_sched_event
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// One JSON object, written on flush, with a key per section.
pub struct JsonOutput<'a> {
    out: Box<dyn Write + 'a>,
    sections: Map<String, Value>,
}

impl<'a> JsonOutput<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self {
            out,
            sections: Map::new(),
        }
    }

    fn insert<T: serde::Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        self.sections
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }
}

impl ReportOutput for JsonOutput<'_> {
    fn write_jobs(&mut self, reports: &[JobReport]) -> Result<()> {
        self.insert("jobs", reports)
    }

    fn write_timeline(&mut self, entries: &[TimelineEntry]) -> Result<()> {
        self.insert("timeline", entries)
    }

    fn write_cohort(&mut self, cohort: &Cohort) -> Result<()> {
        self.insert("cohort", cohort)
    }

    fn write_durations(&mut self, stats: &[DurationStats]) -> Result<()> {
        self.insert("durations", stats)
    }

    fn write_alignment(&mut self, alignment: &ClockAlignment) -> Result<()> {
        self.insert("alignment", alignment)
    }

    fn flush(&mut self) -> Result<()> {
        let sections = std::mem::take(&mut self.sections);
        serde_json::to_writer_pretty(&mut self.out, &Value::Object(sections))?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
