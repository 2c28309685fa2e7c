//! Per-run transcode trace.
//!
//! A [`TranscodeLog`] is created for one import or export run and threaded
//! through every component by `&mut` reference. It is append-only: entries are
//! never edited after [`TranscodeLog::push`], and [`TranscodeLog::reset`] is the
//! only way to clear it (which also starts a new run id).
//!
//! Every entry is mirrored to the `log` facade so process logs carry the same
//! story, tagged with the run id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Default bound on the text stored for an entry's payload.
pub const DEFAULT_PAYLOAD_LIMIT: usize = 512;

/// Marker recorded when a sanitizer drops a value entirely.
pub const BLOCKED: &str = "BLOCKED";

const LOG_TARGET: &str = "pagebridge::transcode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Init,
    Source,
    Parse,
    Block,
    Style,
    Filter,
    Warn,
    Error,
    Success,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Init => "INIT",
            Phase::Source => "SOURCE",
            Phase::Parse => "PARSE",
            Phase::Block => "BLOCK",
            Phase::Style => "STYLE",
            Phase::Filter => "FILTER",
            Phase::Warn => "WARN",
            Phase::Error => "ERROR",
            Phase::Success => "SUCCESS",
        }
    }

    fn level(&self) -> log::Level {
        match self {
            Phase::Error => log::Level::Error,
            Phase::Warn | Phase::Filter => log::Level::Warn,
            Phase::Init | Phase::Success => log::Level::Info,
            Phase::Source | Phase::Parse | Phase::Block | Phase::Style => log::Level::Debug,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Immutable snapshot of a run, handed to callers for display or support
/// tickets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscodeReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub entries: Vec<LogEntry>,
}

impl TranscodeReport {
    pub fn count(&self, phase: Phase) -> usize {
        self.entries.iter().filter(|e| e.phase == phase).count()
    }
}

/// Append-only diagnostics for a single transcode run.
///
/// Not meant to be shared between concurrent runs: interleaved pushes would
/// mix two traces into one.
#[derive(Debug)]
pub struct TranscodeLog {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    entries: Vec<LogEntry>,
    payload_limit: usize,
}

impl Default for TranscodeLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscodeLog {
    pub fn new() -> Self {
        Self::with_payload_limit(DEFAULT_PAYLOAD_LIMIT)
    }

    pub fn with_payload_limit(payload_limit: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            entries: Vec::new(),
            payload_limit,
        }
    }

    /// Start a new run: forget every entry and stamp a fresh run id.
    pub fn reset(&mut self) {
        self.run_id = Uuid::new_v4();
        self.started_at = Utc::now();
        self.entries.clear();
    }

    pub fn push(&mut self, phase: Phase, message: impl Into<String>) {
        self.append(phase, message.into(), None);
    }

    /// Append an entry with a structured payload, truncating long text.
    pub fn push_with(&mut self, phase: Phase, message: impl Into<String>, data: Value) {
        let data = truncate_payload(data, self.payload_limit);
        self.append(phase, message.into(), Some(data));
    }

    fn append(&mut self, phase: Phase, message: String, data: Option<Value>) {
        log::log!(
            target: LOG_TARGET,
            phase.level(),
            "[{}] {phase} {message}",
            self.short_run_id()
        );
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            phase,
            message,
            data,
        });
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.entries.iter().filter(|e| e.phase == phase).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(Phase::Error) > 0
    }

    pub fn export(&self) -> TranscodeReport {
        TranscodeReport {
            run_id: self.run_id,
            started_at: self.started_at,
            entries: self.entries.clone(),
        }
    }

    /// Bound `text` the way payload strings are bounded, for values that
    /// end up in an entry's message.
    pub(crate) fn clip(&self, text: &str) -> String {
        truncate_text(text, self.payload_limit)
    }

    fn short_run_id(&self) -> String {
        self.run_id.simple().to_string()[..8].to_string()
    }
}

/// Bound every string inside `value` to `limit` bytes, and collapse the whole
/// payload to a truncated string if its serialized form is still oversized.
fn truncate_payload(value: Value, limit: usize) -> Value {
    let value = truncate_strings(value, limit);
    let serialized = value.to_string();
    if serialized.len() > limit.saturating_mul(4) {
        Value::String(truncate_text(&serialized, limit))
    } else {
        value
    }
}

fn truncate_strings(value: Value, limit: usize) -> Value {
    match value {
        Value::String(s) if s.len() > limit => Value::String(truncate_text(&s, limit)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| truncate_strings(item, limit))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, truncate_strings(v, limit)))
                .collect(),
        ),
        other => other,
    }
}

fn truncate_text(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…[truncated {} bytes]", &text[..cut], text.len() - cut)
}
