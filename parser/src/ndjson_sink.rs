use crate::{base_sink::EventSink, NormalizedEvent, SinkError};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// NDJSON sink - one JSON object per line, keys in column order
pub struct NdjsonSink<W: Write> {
    writer: BufWriter<W>,
}

impl NdjsonSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write> EventSink for NdjsonSink<W> {
    fn name(&self) -> &'static str {
        "ndjson"
    }

    fn write_event(&mut self, event: &NormalizedEvent) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
