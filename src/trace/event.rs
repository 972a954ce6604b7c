//! Raw trace events.
//!
//! A trace line is turned into exactly one [`Event`]. Matching lines become an
//! [`Event::Record`] holding the timestamp, cpu, kind tag and the untyped
//! payload fields; everything else becomes [`Event::Unparseable`]. The typed
//! view used for routing lives in [`crate::trace::kind`].

use std::collections::HashMap;
use std::fmt;

use super::constants::{FIELD_SEPARATOR, KEY_VALUE_SEPARATOR, TRACE_LINE_RE};

/// A single parsed trace line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Event {
    /// Stand-in for an event that was never observed. Its timestamp is -1.
    #[default]
    Placeholder,
    /// A line that did not match the expected trace line shape.
    Unparseable(String),
    /// A well-formed trace line.
    Record(TraceRecord),
}

impl Event {
    /// Timestamp in normalized trace units, -1 for anything but a record.
    pub fn ts(&self) -> i64 {
        match self {
            Event::Record(record) => record.ts,
            _ => -1,
        }
    }

    pub fn record(&self) -> Option<&TraceRecord> {
        match self {
            Event::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Event::Placeholder)
    }
}

/// A well-formed trace line.
///
/// # Fields
/// - `ts`: Timestamp with the decimal point removed (e.g. `12.000000100` -> `12000000100`)
/// - `precision`: Number of fractional digits the timestamp was written with
/// - `cpu`: CPU the event was recorded on
/// - `kind`: Event kind tag, including the provider (e.g. `sched_sim:job_spawn`)
/// - `fields`: Payload key/value pairs, values kept as raw strings
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceRecord {
    pub ts: i64,
    pub precision: u32,
    pub cpu: u32,
    pub kind: String,
    pub fields: HashMap<String, String>,
}

impl TraceRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Renders the record back into the trace line shape.
///
/// Wall clock, sequence number, delta and host are not modelled and come out
/// as zeros and `localhost`. Fields are written in sorted key order.
impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10_i64.pow(self.precision);
        write!(
            f,
            "[00:00:{}.{:0width$}] (+0.000000000) localhost {}: {{ cpu_id = {} }}, {{ ",
            self.ts / scale,
            self.ts % scale,
            self.kind,
            self.cpu,
            width = self.precision as usize,
        )?;
        let mut keys: Vec<&String> = self.fields.keys().collect();
        keys.sort();
        let payload = keys
            .iter()
            .map(|k| format!("{k}{KEY_VALUE_SEPARATOR}{}", self.fields[*k]))
            .collect::<Vec<_>>()
            .join(FIELD_SEPARATOR);
        if payload.is_empty() {
            write!(f, "}}")
        } else {
            write!(f, "{payload} }}")
        }
    }
}

/// Collapse a `secs.frac` timestamp into one integer of the finest unit present.
///
/// Returns the integer and the number of fractional digits. Both halves must
/// be plain digit strings.
pub fn normalize_timestamp(raw: &str) -> Option<(i64, u32)> {
    let (secs, frac) = raw.split_once('.')?;
    if secs.is_empty() || !secs.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = format!("{secs}{frac}").parse::<i64>().ok()?;
    Some((value, frac.len() as u32))
}

/// Split a payload into its key/value pairs.
///
/// An empty payload yields no fields. A pair without `" = "` makes the whole
/// payload invalid.
fn parse_payload(data: &str) -> Option<HashMap<String, String>> {
    let data = data.trim();
    if data.is_empty() {
        return Some(HashMap::new());
    }
    data.split(FIELD_SEPARATOR)
        .map(|pair| {
            pair.split_once(KEY_VALUE_SEPARATOR)
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

/// Parse one trace line into an [`Event`].
///
/// Never fails: lines that don't have the expected shape come back as
/// [`Event::Unparseable`] carrying the offending line.
pub fn parse_line(line: &str) -> Event {
    let line = line.trim_end_matches(['\n', '\r']);
    let unparseable = || Event::Unparseable(line.to_string());

    let Some(caps) = TRACE_LINE_RE.captures(line) else {
        return unparseable();
    };
    let Some((ts, precision)) = normalize_timestamp(&caps["time"]) else {
        return unparseable();
    };
    let Ok(cpu) = caps["cpu"].parse::<u32>() else {
        return unparseable();
    };
    let Some(fields) = parse_payload(&caps["data"]) else {
        return unparseable();
    };

    Event::Record(TraceRecord {
        ts,
        precision,
        cpu,
        kind: caps["kind"].to_string(),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB_SPAWN_LINE: &str = "[15:02:11.123456789] (+0.000012345) host sched_sim:job_spawn: \
        { cpu_id = 1 }, { task = 0, job = 3, deadline = 400000 }";

    #[test]
    fn test_parse_job_spawn() {
        let event = parse_line(JOB_SPAWN_LINE);
        let record = event.record().expect("line should parse");
        assert_eq!(record.ts, 11123456789);
        assert_eq!(record.precision, 9);
        assert_eq!(record.cpu, 1);
        assert_eq!(record.kind, "sched_sim:job_spawn");
        assert_eq!(record.field("task"), Some("0"));
        assert_eq!(record.field("job"), Some("3"));
        assert_eq!(record.field("deadline"), Some("400000"));
        assert_eq!(record.fields.len(), 3);
    }

    #[test]
    fn test_parse_empty_payload() {
        let line = "[15:02:11.000000001] (+0.000000001) host sched_sim:start_main: \
            { cpu_id = 0 }, { }";
        let record = parse_line(line).record().cloned().unwrap();
        assert_eq!(record.kind, "sched_sim:start_main");
        assert!(record.fields.is_empty());
    }

    #[test]
    fn test_parse_trailing_newline() {
        let line = format!("{JOB_SPAWN_LINE}\n");
        assert!(parse_line(&line).record().is_some());
    }

    #[test]
    fn test_missing_closing_brace() {
        let line = "[15:02:11.000000001] (+0.000000001) host sched_sim:begin_job: \
            { cpu_id = 0 }, { task = 0, job = 1";
        assert_eq!(parse_line(line), Event::Unparseable(line.to_string()));
    }

    #[test]
    fn test_pair_without_separator() {
        let line = "[15:02:11.000000001] (+0.000000001) host sched_sim:begin_job: \
            { cpu_id = 0 }, { task = 0, job }";
        assert!(matches!(parse_line(line), Event::Unparseable(_)));
    }

    #[test]
    fn test_garbage_line() {
        assert!(matches!(parse_line("not a trace line"), Event::Unparseable(_)));
        assert!(matches!(parse_line(""), Event::Unparseable(_)));
    }

    #[test]
    fn test_placeholder() {
        let event = Event::default();
        assert!(event.is_placeholder());
        assert_eq!(event.ts(), -1);
        assert_eq!(Event::Unparseable("x".into()).ts(), -1);
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(normalize_timestamp("12.000000100"), Some((12000000100, 9)));
        assert_eq!(normalize_timestamp("0.5"), Some((5, 1)));
        assert_eq!(normalize_timestamp("12"), None);
        assert_eq!(normalize_timestamp("1a.5"), None);
        assert_eq!(normalize_timestamp(".5"), None);
    }

    #[test]
    fn test_normalize_timestamp_monotonic() {
        let stamps = [
            "0.000000000",
            "0.000000001",
            "0.999999999",
            "1.000000000",
            "11.123456789",
            "99.000000000",
        ];
        let normalized: Vec<i64> = stamps
            .iter()
            .map(|s| normalize_timestamp(s).unwrap().0)
            .collect();
        assert!(normalized.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_reserialize_round_trip() {
        let original = parse_line(JOB_SPAWN_LINE).record().cloned().unwrap();
        let reparsed = parse_line(&original.to_string()).record().cloned().unwrap();
        assert_eq!(reparsed.kind, original.kind);
        assert_eq!(reparsed.cpu, original.cpu);
        assert_eq!(reparsed.fields, original.fields);
        assert_eq!(reparsed.ts, original.ts);
    }

    #[test]
    fn test_reserialize_empty_payload() {
        let record = TraceRecord {
            ts: 1_000_000_005,
            precision: 9,
            cpu: 2,
            kind: "sched_sim:input_parsed".to_string(),
            fields: HashMap::new(),
        };
        let reparsed = parse_line(&record.to_string()).record().cloned().unwrap();
        assert_eq!(reparsed, record);
    }
}
