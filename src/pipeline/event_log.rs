// src/pipeline/event_log.rs
//
// Rising-edge event log plus its JSON document store.
//
// The store is a JSON object that may hold unrelated keys. The event list
// lives under a single key as an array of "M.SS.CC" strings; anything else
// found under that key is replaced with an empty list.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_EVENT_KEY: &str = "smash";

/// Format a stream offset as `minutes.seconds.centiseconds`.
///
/// Missing, negative or non-finite offsets are treated as zero.
pub fn format_timestamp_ms(ms: Option<f64>) -> String {
    let ms = match ms {
        Some(v) if v.is_finite() && v > 0.0 => v as u64,
        _ => 0,
    };
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let centis = (ms % 1000) / 10;
    format!("{}.{:02}.{:02}", minutes, seconds, centis)
}

/// Append-only list of event timestamps, fed once per frame with the
/// frame-level "any track active" flag.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<String>,
    prev_active: bool,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue an existing log. Edge detection starts from "inactive".
    pub fn from_entries(entries: Vec<String>) -> Self {
        Self {
            entries,
            prev_active: false,
        }
    }

    /// Returns the appended timestamp when this frame is a rising edge that
    /// was not swallowed by adjacent-duplicate suppression.
    pub fn observe_frame(&mut self, any_active: bool, timestamp_ms: Option<f64>) -> Option<String> {
        let rising = any_active && !self.prev_active;
        self.prev_active = any_active;

        if !rising {
            return None;
        }

        let stamp = format_timestamp_ms(timestamp_ms);
        if self.entries.last() == Some(&stamp) {
            debug!("Rising edge at {} already logged, skipping", stamp);
            return None;
        }

        self.entries.push(stamp.clone());
        Some(stamp)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JSON document holding the event log alongside unrelated keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventStore {
    doc: Map<String, Value>,
}

impl EventStore {
    /// Load from disk. A missing file, invalid JSON or a non-object document
    /// all yield an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No event log at {}, starting fresh", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read event log {}", path.display()))
            }
        };
        Ok(Self::from_json_str(&contents))
    }

    pub fn from_json_str(contents: &str) -> Self {
        match serde_json::from_str::<Value>(contents) {
            Ok(Value::Object(doc)) => Self { doc },
            Ok(other) => {
                warn!(
                    "Event log is not a JSON object ({}), starting fresh",
                    json_type_name(&other)
                );
                Self::default()
            }
            Err(e) => {
                warn!("Event log is not valid JSON ({}), starting fresh", e);
                Self::default()
            }
        }
    }

    /// Entries stored under `key`, repairing the key in place when it is
    /// missing or not a list of strings.
    pub fn events(&mut self, key: &str) -> Vec<String> {
        let parsed = match self.doc.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect::<Option<Vec<String>>>(),
            Some(other) => {
                warn!(
                    "Event log key '{}' holds a {}, resetting to an empty list",
                    key,
                    json_type_name(other)
                );
                None
            }
            None => None,
        };

        match parsed {
            Some(entries) => entries,
            None => {
                if matches!(self.doc.get(key), Some(Value::Array(_))) {
                    warn!(
                        "Event log key '{}' contains non-string entries, resetting to an empty list",
                        key
                    );
                }
                self.doc.insert(key.to_string(), Value::Array(Vec::new()));
                Vec::new()
            }
        }
    }

    pub fn set_events(&mut self, key: &str, entries: &[String]) {
        let values = entries.iter().cloned().map(Value::String).collect();
        self.doc.insert(key.to_string(), Value::Array(values));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.doc).context("Failed to serialize event log")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json_string()?)
            .with_context(|| format!("Failed to write event log {}", path.display()))?;
        Ok(())
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
