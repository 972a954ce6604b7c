//! End-to-end tests of the reconstruction pipeline on synthetic traces.

mod common;

use std::io::Cursor;

use common::*;
use schedeval::metrics::{job_reports, summarize};
use schedeval::reconcile::{align_job_log, merge_job_log, task_timeline, TimelineLabel, Timestamped};
use schedeval::trace::parse_trace;
use schedeval::{reconstruct, Config, Diagnostic, Diagnostics, JobLog, ReconstructError};
use tempfile::TempDir;

#[test]
fn test_single_job_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let trace = write_lines(dir.path(), "trace.txt", &single_job_trace(1));

    let mut diagnostics = Diagnostics::default();
    let registry = reconstruct(&trace, &Config::default(), &mut diagnostics).unwrap();
    assert!(!diagnostics.has_warnings(), "{:?}", diagnostics.warnings);

    let task = registry.task(0).expect("task 0 registered");
    assert_eq!(task.pid, 1000);
    let job = &task.jobs[&0];
    assert_eq!(job.submission_time, 100);
    assert_eq!(job.deadline, 150);
    assert_eq!(job.begin, 110);
    assert_eq!(job.end, 140);
    assert_eq!(job.execution_time, 30);
    assert_eq!(job.tardiness(), Some(-10));

    // The switch at 95 predates the first spawn and is dropped.
    let switches: Vec<i64> = task.sched_begin_events.iter().map(|e| e.ts()).collect();
    assert_eq!(switches, vec![105]);

    let reports = job_reports(&registry);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].tardiness, Some(-10));
    assert_eq!(summarize(&reports).deadline_misses, 0);
}

#[test]
fn test_unparseable_line_is_skipped() {
    let mut lines = single_job_trace(1);
    let broken = job_spawn(120, 0, 1, 50);
    lines.insert(3, broken.trim_end_matches('}').to_string());

    let mut diagnostics = Diagnostics::default();
    let records = parse_trace(Cursor::new(lines.join("\n")), &mut diagnostics).unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(diagnostics.unparseable_lines(), 1);
    assert!(matches!(
        diagnostics.warnings[0],
        Diagnostic::UnparseableLine { line_number: 4, .. }
    ));
}

#[test]
fn test_unknown_task_is_dropped() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut lines = single_job_trace(1);
    lines.push(job_spawn(120, 7, 0, 50));
    lines.push(begin_job(130, 7, 0));
    let trace = write_lines(dir.path(), "trace.txt", &lines);

    let mut diagnostics = Diagnostics::default();
    let registry = reconstruct(&trace, &Config::default(), &mut diagnostics).unwrap();
    assert_eq!(registry.len(), 1);
    assert!(registry.task(7).is_none());
    assert_eq!(registry.task(0).unwrap().jobs.len(), 1);
}

#[test]
fn test_unknown_job_is_fatal() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut lines = single_job_trace(1);
    lines.push(end_job(150, 0, 9, 10));
    let trace = write_lines(dir.path(), "trace.txt", &lines);

    let mut diagnostics = Diagnostics::default();
    let err = reconstruct(&trace, &Config::default(), &mut diagnostics).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ReconstructError>(),
        Some(&ReconstructError::UnknownJob {
            task: 0,
            job: 9,
            event: "end"
        })
    );
}

#[test]
fn test_incomplete_job_is_reported() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut lines = single_job_trace(1);
    lines.push(job_spawn(200, 0, 1, 50));
    lines.push(begin_job(210, 0, 1));
    let trace = write_lines(dir.path(), "trace.txt", &lines);

    let mut diagnostics = Diagnostics::default();
    let registry = reconstruct(&trace, &Config::default(), &mut diagnostics).unwrap();
    assert_eq!(
        diagnostics.warnings,
        vec![Diagnostic::IncompleteJob { task: 0, job: 1 }]
    );

    let reports = job_reports(&registry);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[1].tardiness, None);
    assert_eq!(summarize(&reports).completed, 1);
}

#[test]
fn test_job_log_alignment_and_merge() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let trace = write_lines(dir.path(), "trace.txt", &single_job_trace(1));
    let mut diagnostics = Diagnostics::default();
    let registry = reconstruct(&trace, &Config::default(), &mut diagnostics).unwrap();

    // Job log in microseconds on its own clock, scaled to nanoseconds.
    let joblog = "0 s 990 0 1040\n0 b 1000 0\n0 e 1030 0 30\n";
    let mut log = JobLog::parse(Cursor::new(joblog), 1_000, &mut diagnostics).unwrap();

    let alignment = align_job_log(&registry, &mut log, 5).unwrap();
    assert_eq!(alignment.first_sched_event, 105);
    assert_eq!(alignment.first_job_begin, 1_000_000);
    assert_eq!(alignment.offset, 1_000_000 - 105 - 5);
    assert_eq!(log.first_job_begin(), Some(110));

    // Already aligned: nothing left to shift.
    assert_eq!(align_job_log(&registry, &mut log, 5).unwrap().offset, 0);

    let mut timeline = task_timeline(registry.task(0).unwrap());
    merge_job_log(&mut timeline, 0, &log);
    let begins: Vec<(i64, &TimelineLabel)> = timeline
        .iter()
        .filter(|e| {
            matches!(
                e.label,
                TimelineLabel::JobStarted { .. } | TimelineLabel::LoggedBegin { .. }
            )
        })
        .map(|e| (e.ts, &e.label))
        .collect();
    assert_eq!(
        begins,
        vec![
            (110, &TimelineLabel::JobStarted { job: 0 }),
            (110, &TimelineLabel::LoggedBegin { job: 0 }),
        ]
    );
    assert!(timeline.windows(2).all(|w| w[0].ts <= w[1].ts));
}

#[test]
fn test_alignment_needs_both_streams() {
    let mut diagnostics = Diagnostics::default();
    let lines = vec![init_task(10, 0, 1000), job_spawn(100, 0, 0, 50)];
    let records = parse_trace(Cursor::new(lines.join("\n")), &mut diagnostics).unwrap();
    let mut registry =
        schedeval::Registry::from_records(records, &Config::default().providers, &mut diagnostics);
    registry.finish(&mut diagnostics).unwrap();

    let mut log = JobLog::parse(Cursor::new("0 b 1000 0\n"), 1, &mut diagnostics).unwrap();
    assert_eq!(
        align_job_log(&registry, &mut log, 0).unwrap_err(),
        ReconstructError::EmptyReferenceStream {
            source: "trace scheduling"
        }
    );
}
