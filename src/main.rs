//! schedeval: reconstruct real-time scheduling timelines from text traces

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use schedeval::logging::init_logging;
use schedeval::metrics::{self, Cohort};
use schedeval::output::{create_output, OutputFormat, ReportOutput};
use schedeval::reconcile::{align_job_log, merge_job_log, task_timeline, TimelineEntry};
use schedeval::trace::constants::PLAYBACK_PHASES;
use schedeval::trace::parse_trace_file;
use schedeval::{reconstruct, Config, Diagnostics, JobLog, Registry};

#[derive(Parser)]
#[command(name = "schedeval")]
#[command(about = "Reconstruct real-time scheduling timelines from text traces")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON file overriding the default analysis settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short, long, default_value = "text")]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-job tardiness report, or a job cohort when given several traces
    Jobs {
        /// Traces in text form, one per variant
        #[arg(required = true)]
        traces: Vec<PathBuf>,

        /// Variant names, in trace order (defaults to the file stems)
        #[arg(long = "name")]
        names: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Time-ordered events of every task
    Events {
        trace: PathBuf,

        /// Only show this task
        #[arg(long)]
        task: Option<i64>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Align an application job log onto the trace clock and merge it
    Align {
        trace: PathBuf,

        /// Job log written by the application
        joblog: PathBuf,

        /// Guard subtracted from the offset, in trace units
        #[arg(long)]
        epsilon: Option<i64>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Render tardiness of several runs of the same workload, side by side
    Tardiness {
        /// One trace per variant
        #[arg(required = true)]
        traces: Vec<PathBuf>,

        /// Variant names, in trace order (defaults to the file stems)
        #[arg(long = "name")]
        names: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },
    /// Duration summaries of the video playback phases
    Durations {
        trace: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },
}

fn open_output<'a>(args: &OutputArgs, config: &Config) -> Result<Box<dyn ReportOutput + 'a>> {
    let format: OutputFormat = args.format.parse()?;
    let writer: Box<dyn Write + 'a> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    Ok(create_output(format, writer, config.report_time_divisor))
}

fn variant_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One name per trace: the `--name` values if given, file stems otherwise.
fn variant_names(traces: &[PathBuf], names: &[String]) -> Result<Vec<String>> {
    if names.is_empty() {
        return Ok(traces.iter().map(|path| variant_name(path)).collect());
    }
    if names.len() != traces.len() {
        bail!(
            "Got {} names for {} traces; give one name per trace or none",
            names.len(),
            traces.len()
        );
    }
    Ok(names.to_vec())
}

fn run_jobs(traces: &[PathBuf], names: &[String], out: &OutputArgs, config: &Config) -> Result<()> {
    let names = variant_names(traces, names)?;
    let mut variants = Vec::with_capacity(traces.len());
    for (path, name) in traces.iter().zip(names) {
        let mut diagnostics = Diagnostics::default();
        let registry = reconstruct(path, config, &mut diagnostics)?;
        let reports = metrics::job_reports(&registry);

        let summary = metrics::summarize(&reports);
        tracing::info!(
            "{}: {} jobs, {} completed, {} missed their deadline",
            name,
            summary.jobs,
            summary.completed,
            summary.deadline_misses
        );
        variants.push((name, reports));
    }

    let mut output = open_output(out, config)?;
    if variants.len() == 1 {
        output.write_jobs(&variants[0].1)?;
    } else {
        output.write_cohort(&Cohort::jobs(variants)?)?;
    }
    output.flush()
}

fn timelines(registry: &Registry, task: Option<i64>) -> Result<Vec<Vec<TimelineEntry>>> {
    match task {
        Some(id) => match registry.task(id) {
            Some(task) => Ok(vec![task_timeline(task)]),
            None => bail!("Task {id} not found in trace"),
        },
        None => Ok(registry.tasks().map(task_timeline).collect()),
    }
}

fn run_events(trace: &Path, task: Option<i64>, out: &OutputArgs, config: &Config) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let registry = reconstruct(trace, config, &mut diagnostics)?;
    let entries: Vec<TimelineEntry> = timelines(&registry, task)?.into_iter().flatten().collect();

    let mut output = open_output(out, config)?;
    output.write_timeline(&entries)?;
    output.flush()
}

fn run_align(
    trace: &Path,
    joblog: &Path,
    epsilon: Option<i64>,
    out: &OutputArgs,
    config: &Config,
) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let registry = reconstruct(trace, config, &mut diagnostics)?;
    let mut log = JobLog::parse_file(joblog, config.joblog_time_scale, &mut diagnostics)?;

    let epsilon = epsilon.unwrap_or(config.alignment_epsilon);
    let alignment = align_job_log(&registry, &mut log, epsilon)
        .with_context(|| format!("Failed to align {}", joblog.display()))?;

    let logged = log
        .jobs()
        .with_context(|| format!("Inconsistent job log {}", joblog.display()))?;
    for (task, jobs) in &logged {
        if registry.task(*task).is_none() {
            tracing::warn!("Job log task {} ({} jobs) is not in the trace", task, jobs.len());
        }
    }

    let mut entries = Vec::new();
    for task in registry.tasks() {
        let mut timeline = task_timeline(task);
        merge_job_log(&mut timeline, task.id, &log);
        entries.extend(timeline);
    }

    let mut output = open_output(out, config)?;
    output.write_alignment(&alignment)?;
    output.write_timeline(&entries)?;
    output.flush()
}

fn run_tardiness(traces: &[PathBuf], names: &[String], out: &OutputArgs, config: &Config) -> Result<()> {
    let names = variant_names(traces, names)?;
    let mut variants = Vec::with_capacity(traces.len());
    for (path, name) in traces.iter().zip(names) {
        let mut diagnostics = Diagnostics::default();
        let records = parse_trace_file(path, &mut diagnostics)?;
        let tardiness = metrics::render_tardiness(&records, &config.render_event, &mut diagnostics);
        variants.push((name, tardiness));
    }

    let cohort = Cohort::render(variants, config.render_tolerance)?;
    let mut output = open_output(out, config)?;
    output.write_cohort(&cohort)?;
    output.flush()
}

fn run_durations(trace: &Path, out: &OutputArgs, config: &Config) -> Result<()> {
    let mut diagnostics = Diagnostics::default();
    let records = parse_trace_file(trace, &mut diagnostics)?;
    let stats: Vec<_> = PLAYBACK_PHASES
        .iter()
        .filter_map(|kind| metrics::duration_stats(&records, kind, &mut diagnostics))
        .collect();
    if stats.is_empty() {
        tracing::warn!("No playback phase events in {}", trace.display());
    }

    let mut output = open_output(out, config)?;
    output.write_durations(&stats)?;
    output.flush()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match &cli.command {
        Commands::Jobs { traces, names, out } => run_jobs(traces, names, out, &config),
        Commands::Events { trace, task, out } => run_events(trace, *task, out, &config),
        Commands::Align {
            trace,
            joblog,
            epsilon,
            out,
        } => run_align(trace, joblog, *epsilon, out, &config),
        Commands::Tardiness { traces, names, out } => run_tardiness(traces, names, out, &config),
        Commands::Durations { trace, out } => run_durations(trace, out, &config),
    }
}
