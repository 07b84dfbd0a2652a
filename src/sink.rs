use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EndpointError;

/// Single numeric field of a measurement.
///
/// Serialized untagged, so JSON output shows plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

pub type FieldMap = BTreeMap<String, FieldValue>;
pub type TagMap = BTreeMap<String, String>;

/// A named, timestamped bundle of fields and tags.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub fields: FieldMap,
    pub tags: TagMap,
}

impl Measurement {
    pub fn new(name: &str, fields: FieldMap, tags: TagMap) -> Self {
        Self {
            name: name.to_string(),
            timestamp: Utc::now(),
            fields,
            tags,
        }
    }

    /// Renders the measurement in InfluxDB line protocol.
    ///
    /// Integers get the `i` suffix, the timestamp is in nanoseconds.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_key(&self.name);

        for (k, v) in &self.tags {
            let _ = write!(line, ",{}={}", escape_key(k), escape_key(v));
        }

        let mut sep = ' ';
        for (k, v) in &self.fields {
            let _ = match v {
                FieldValue::Int(i) => write!(line, "{sep}{}={i}i", escape_key(k)),
                FieldValue::Float(f) => write!(line, "{sep}{}={f}", escape_key(k)),
            };
            sep = ',';
        }

        if let Some(ns) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {ns}");
        }
        line
    }
}

fn escape_key(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

/// Receiver of everything an input produces.
///
/// CONTRACT:
/// - Called concurrently from one task per endpoint
/// - Implementations own their synchronisation
/// - Must not block for long; the poll cycle waits on every task
///
pub trait Accumulator: Send + Sync {
    fn add_gauge(&self, measurement: &str, fields: FieldMap, tags: TagMap);

    fn add_error(&self, err: &EndpointError);
}

// ------------------------------------------------------------
// Output format of the stdout sink
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Json,

    /// InfluxDB line protocol
    Line,
}

/// Writes measurements to stdout, errors to the log.
pub struct StdoutSink {
    format: OutputFormat,
    debug: bool,
}

impl StdoutSink {
    pub fn new(format: OutputFormat, debug: bool) -> Self {
        Self { format, debug }
    }

    fn render(&self, m: &Measurement) -> Option<String> {
        match self.format {
            OutputFormat::Json => match serde_json::to_string(m) {
                Ok(json) => Some(json),
                Err(e) => {
                    log::error!("failed to serialize measurement {}: {}", m.name, e);
                    None
                }
            },
            OutputFormat::Line => Some(m.to_line_protocol()),
        }
    }
}

impl Accumulator for StdoutSink {
    fn add_gauge(&self, measurement: &str, fields: FieldMap, tags: TagMap) {
        let m = Measurement::new(measurement, fields, tags);
        if self.debug {
            log::debug!("emit {} tags={:?} fields={}", m.name, m.tags, m.fields.len());
        }
        if let Some(out) = self.render(&m) {
            println!("{out}");
        }
    }

    fn add_error(&self, err: &EndpointError) {
        log::warn!("{err}");
    }
}

/// Keeps everything in memory.
///
/// Used by tests and by embedders that forward measurements
/// themselves after a cycle.
#[derive(Default)]
pub struct MemorySink {
    measurements: Mutex<Vec<Measurement>>,
    errors: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Accumulator for MemorySink {
    fn add_gauge(&self, measurement: &str, fields: FieldMap, tags: TagMap) {
        self.measurements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Measurement::new(measurement, fields, tags));
    }

    fn add_error(&self, err: &EndpointError) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(err.to_string());
    }
}
