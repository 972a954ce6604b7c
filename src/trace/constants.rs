//! Shared constants for trace parsing.
//!
//! Event kind names as they appear in babeltrace-style text dumps of the
//! kernel and userspace tracepoints, plus the line pattern itself.

use std::sync::LazyLock;

use regex::Regex;

/// Static regex for a single trace line. Compiled once at first use.
/// Pattern: [wall:seq:secs.frac] (+delta) host kind: { cpu_id = N }, { k = v, ... }
///
/// The payload is captured greedily up to the last closing brace, so a line
/// without one does not match.
pub static TRACE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[\d+:\d+:(?P<time>\d+\.\d+)\] \(\+\d+\.\d+\) \S+ (?P<kind>\S+): \{ cpu_id = (?P<cpu>\d+) \}, \{ ?(?P<data>.*)\}",
    )
    .expect("Invalid trace line regex pattern")
});

/// Separator between key/value pairs in an event payload.
pub const FIELD_SEPARATOR: &str = ", ";

/// Separator between a key and its value.
pub const KEY_VALUE_SEPARATOR: &str = " = ";

/// Kernel scheduler tracepoints. These carry no provider prefix.
pub const SCHED_SWITCH: &str = "sched_switch";
pub const SCHED_STAT_RUNTIME: &str = "sched_stat_runtime";

/// Userspace tracepoint names emitted by the task library, without provider.
pub const INIT_TASK: &str = "init_task";
pub const MIGRATED_TASK: &str = "migrated_task";
pub const STARTED_REAL_TIME_TASK: &str = "started_real_time_task";
pub const FINISHED_TASK: &str = "finished_task";
pub const ACQUIRE_SEM: &str = "acquire_sem";
pub const ACQUIRED_SEM: &str = "acquired_sem";
pub const JOB_SPAWN: &str = "job_spawn";
pub const BEGIN_JOB: &str = "begin_job";
pub const END_JOB: &str = "end_job";
pub const PREDICTION: &str = "prediction";

/// Video playback phase tracepoints, each carrying a `duration` field.
pub const PLAYBACK_PHASES: [&str; 3] = [
    "play_video:read_packet",
    "play_video:decode_frame",
    "play_video:update_texture",
];
