// Sink selection by output file extension.

use crate::base_sink::EventSink;
use crate::{CsvSink, DuckDbSink, NdjsonSink, SinkError};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    Csv,
    Ndjson,
    DuckDb,
}

impl SinkFormat {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SinkFormat::Csv => &["csv"],
            SinkFormat::Ndjson => &["ndjson", "jsonl"],
            SinkFormat::DuckDb => &["db", "duckdb"],
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        let extension = extension.to_ascii_lowercase();
        [SinkFormat::Csv, SinkFormat::Ndjson, SinkFormat::DuckDb]
            .into_iter()
            .find(|format| format.extensions().contains(&extension.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Create the sink for `path`, falling back to CSV for unknown extensions.
pub fn open_sink(path: &Path) -> Result<Box<dyn EventSink>, SinkError> {
    let format = SinkFormat::from_path(path).unwrap_or_else(|| {
        warn!(
            "No sink registered for '{}', falling back to CSV",
            path.display()
        );
        SinkFormat::Csv
    });

    let sink: Box<dyn EventSink> = match format {
        SinkFormat::Csv => Box::new(CsvSink::create(path)?),
        SinkFormat::Ndjson => Box::new(NdjsonSink::create(path)?),
        SinkFormat::DuckDb => Box::new(DuckDbSink::create(path)?),
    };
    info!("Writing events to {} ({})", path.display(), sink.name());
    Ok(sink)
}
