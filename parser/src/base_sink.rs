use crate::{NormalizedEvent, SinkError};

/// Destination for normalized events.
///
/// Events arrive one at a time in input order. An implementation must have
/// made the event durable before `write_event` returns.
pub trait EventSink {
    /// Returns the name of this sink (e.g., "csv", "ndjson")
    fn name(&self) -> &'static str;

    fn write_event(&mut self, event: &NormalizedEvent) -> Result<(), SinkError>;

    /// Called once after the last event.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink, mostly for tests and embedding.
impl EventSink for Vec<NormalizedEvent> {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write_event(&mut self, event: &NormalizedEvent) -> Result<(), SinkError> {
        self.push(event.clone());
        Ok(())
    }
}

