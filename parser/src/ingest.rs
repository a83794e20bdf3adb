use crate::assembler::{EventAssembler, RunSummary};
use crate::base_sink::EventSink;
use crate::line_reader::LineSource;
use crate::normalizer::EventNormalizer;
use crate::IngestError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Run one pass over a log, writing every completed event to `sink` in input order.
///
/// Data-quality problems are counted in the returned summary. Only read
/// and sink failures abort the run; events already written stay written.
pub fn ingest<R: BufRead>(
    reader: R,
    normalizer: &EventNormalizer,
    sink: &mut dyn EventSink,
) -> Result<RunSummary, IngestError> {
    info!("Starting ingestion into {} sink", sink.name());

    let mut lines = LineSource::new(reader);
    let mut assembler = EventAssembler::new(normalizer);

    while let Some(line) = lines.next() {
        let line = line.map_err(|source| IngestError::Read {
            line: lines.lines_read() + 1,
            source,
        })?;

        if let Some(event) = assembler.process_line(&line) {
            debug!("Line {}: emitting {} event for {}", line.number, event.mt, event.ne_id);
            sink.write_event(&event)?;
        }
    }

    sink.finish()?;
    let summary = assembler.finish();
    info!(
        "Ingestion complete: {} lines, {} events written",
        summary.total_lines,
        summary.emitted_events()
    );
    Ok(summary)
}

pub fn ingest_file(
    path: impl AsRef<Path>,
    normalizer: &EventNormalizer,
    sink: &mut dyn EventSink,
) -> Result<RunSummary, IngestError> {
    let path = path.as_ref();
    info!("Reading log file {}", path.display());
    let file = File::open(path)?;
    ingest(BufReader::new(file), normalizer, sink)
}
