use chrono::NaiveTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Month abbreviations accepted as the first token of a log record.
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Output column set, in sink order.
pub const COLUMNS: [&str; 22] = [
    "receipt_dt",
    "receipt_dt_utc",
    "event_ts",
    "event_dt",
    "event_dt_utc",
    "evt_to_rcpt_sec",
    "time_ok",
    "ne_id",
    "ne_code",
    "ne_name",
    "mt",
    "st",
    "si",
    "va",
    "sc",
    "sv",
    "ke",
    "cn",
    "na",
    "rn",
    "ss",
    "it",
];

/// Payload keys consumed by normalization instead of being passed through.
pub const RESERVED_KEYS: [&str; 3] = ["ts", "id", "mt"];

/// Sentinel used when a node cannot be described.
pub const UNKNOWN: &str = "?";

/// One physical line of the input log, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub number: usize,
    pub text: String,
}

/// Receipt time as printed by the logger: month, day and time of day, no year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptTime {
    /// 1-based month number.
    pub month: u32,
    pub day: u32,
    pub time: NaiveTime,
}

impl fmt::Display for ReceiptTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = MONTHS
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("???");
        write!(f, "{}-{:02} {}", month, self.day, self.time.format("%H:%M:%S"))
    }
}

/// Key/value pairs decoded from a `{ key: 'value', ... }` region.
pub type RawEventPayload = BTreeMap<String, String>;

/// One output row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub receipt_dt: String,
    pub receipt_dt_utc: String,
    pub event_ts: String,
    pub event_dt: String,
    pub event_dt_utc: String,
    pub evt_to_rcpt_sec: f64,
    pub time_ok: bool,
    pub ne_id: String,
    pub ne_code: String,
    pub ne_name: String,
    pub mt: String,
    /// Every payload key except `ts`, `id` and `mt`, verbatim.
    pub fields: BTreeMap<String, String>,
}

impl NormalizedEvent {
    /// Rendered value of a named column, `None` when a pass-through key is absent.
    pub fn column_value(&self, column: &str) -> Option<String> {
        let value = match column {
            "receipt_dt" => self.receipt_dt.clone(),
            "receipt_dt_utc" => self.receipt_dt_utc.clone(),
            "event_ts" => self.event_ts.clone(),
            "event_dt" => self.event_dt.clone(),
            "event_dt_utc" => self.event_dt_utc.clone(),
            "evt_to_rcpt_sec" => format_seconds(self.evt_to_rcpt_sec),
            "time_ok" => self.time_ok.to_string(),
            "ne_id" => self.ne_id.clone(),
            "ne_code" => self.ne_code.clone(),
            "ne_name" => self.ne_name.clone(),
            "mt" => self.mt.clone(),
            other => return self.fields.get(other).cloned(),
        };
        Some(value)
    }

    /// All columns in [`COLUMNS`] order, absent pass-through keys rendered empty.
    pub fn to_row(&self) -> Vec<String> {
        COLUMNS
            .iter()
            .map(|column| self.column_value(column).unwrap_or_default())
            .collect()
    }

    /// Pass-through keys that have no column of their own.
    pub fn extra_fields(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields
            .iter()
            .filter(|(key, _)| !COLUMNS.contains(&key.as_str()))
    }
}

impl Serialize for NormalizedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("receipt_dt", &self.receipt_dt)?;
        map.serialize_entry("receipt_dt_utc", &self.receipt_dt_utc)?;
        map.serialize_entry("event_ts", &self.event_ts)?;
        map.serialize_entry("event_dt", &self.event_dt)?;
        map.serialize_entry("event_dt_utc", &self.event_dt_utc)?;
        map.serialize_entry("evt_to_rcpt_sec", &self.evt_to_rcpt_sec)?;
        map.serialize_entry("time_ok", &self.time_ok)?;
        map.serialize_entry("ne_id", &self.ne_id)?;
        map.serialize_entry("ne_code", &self.ne_code)?;
        map.serialize_entry("ne_name", &self.ne_name)?;
        map.serialize_entry("mt", &self.mt)?;
        for column in &COLUMNS[11..] {
            if let Some(value) = self.fields.get(*column) {
                map.serialize_entry(column, value)?;
            }
        }
        map.end()
    }
}

/// Seconds rendered with one decimal place, e.g. `1260.0`.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.1}", seconds)
}

/// Rejection of a line before classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("empty line")]
    Empty,
    #[error("first token '{0}' is not a month abbreviation")]
    UnknownMonth(String),
    #[error("receipt time is incomplete")]
    MissingReceiptTime,
    #[error("invalid receipt day: {0}")]
    InvalidDay(String),
    #[error("invalid receipt time of day: {0}")]
    InvalidTime(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("payload has no opening brace")]
    MissingOpenBrace,
    #[error("payload has no closing brace")]
    MissingCloseBrace,
    #[error("closing brace precedes opening brace")]
    MisorderedBraces,
    #[error("malformed payload field: '{0}'")]
    MalformedField(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("invalid epoch timestamp: '{0}'")]
    InvalidEpoch(String),
    #[error("epoch timestamp out of range: {0}")]
    OutOfRange(i64),
    #[error("invalid receipt date {year}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("receipt time {0} does not exist in the configured zone")]
    NonexistentLocalTime(chrono::NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("payload is missing required key '{0}'")]
    MissingField(&'static str),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

/// Failure to load the node reference table.
#[derive(Debug, thiserror::Error)]
pub enum NodeDirectoryError {
    #[error("node reference file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("malformed node reference data in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

/// Fatal failure of an ingestion run.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read log line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> NormalizedEvent {
        let mut fields = BTreeMap::new();
        fields.insert("st".to_string(), "1".to_string());
        fields.insert("it".to_string(), "7".to_string());
        fields.insert("zz".to_string(), "x".to_string());
        NormalizedEvent {
            receipt_dt: "2024-06-01 10:00:00".to_string(),
            receipt_dt_utc: "2024-06-01 09:00:00".to_string(),
            event_ts: "1717231140".to_string(),
            event_dt: "2024-06-01 09:39:00".to_string(),
            event_dt_utc: "2024-06-01 08:39:00".to_string(),
            evt_to_rcpt_sec: 1260.0,
            time_ok: true,
            ne_id: "N1".to_string(),
            ne_code: "ABC_MGT_01".to_string(),
            ne_name: "Main Gate".to_string(),
            mt: "ALM".to_string(),
            fields,
        }
    }

    #[test]
    fn test_row_follows_column_order() {
        let row = sample_event().to_row();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[0], "2024-06-01 10:00:00");
        assert_eq!(row[5], "1260.0");
        assert_eq!(row[6], "true");
        assert_eq!(row[10], "ALM");
        assert_eq!(row[11], "1");
        assert_eq!(row[12], "");
        assert_eq!(row[21], "7");
    }

    #[test]
    fn test_extra_fields_excludes_columns() {
        let event = sample_event();
        let extras: Vec<_> = event.extra_fields().collect();
        assert_eq!(extras.len(), 1);
        assert_eq!(extras[0].0, "zz");
    }

    #[test]
    fn test_serialize_keeps_column_order_and_skips_absent() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        assert!(json.starts_with(r#"{"receipt_dt":"2024-06-01 10:00:00","receipt_dt_utc""#));
        assert!(json.contains(r#""evt_to_rcpt_sec":1260.0,"time_ok":true"#));
        assert!(json.ends_with(r#""mt":"ALM","st":"1","it":"7"}"#));
        assert!(!json.contains("zz"));
    }

    #[test]
    fn test_receipt_time_display() {
        let receipt = ReceiptTime {
            month: 6,
            day: 1,
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        };
        assert_eq!(receipt.to_string(), "Jun-01 10:00:00");
    }
}
