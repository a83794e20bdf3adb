use crate::{base_sink::EventSink, NormalizedEvent, SinkError, COLUMNS};
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// CSV sink - header row of the fixed columns, then one row per event
pub struct CsvSink<W: Write> {
    writer: Writer<W>,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Result<Self, SinkError> {
        let mut writer = Writer::from_writer(inner);
        writer.write_record(COLUMNS)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write> EventSink for CsvSink<W> {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write_event(&mut self, event: &NormalizedEvent) -> Result<(), SinkError> {
        self.writer.write_record(event.to_row())?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
