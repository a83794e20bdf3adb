// Parser crate for SiteBoss equipment logs
// Streaming tokenizer, event assembler and normalizer, plus output sinks

pub mod types;
pub mod line_reader;
pub mod classifier;
pub mod payload_parser;
pub mod timestamp;
pub mod node_directory;
pub mod normalizer;
pub mod assembler;
pub mod ingest;

// Sink implementations
pub mod base_sink;
pub mod csv_sink;
pub mod ndjson_sink;
pub mod duckdb_sink;
pub mod sinks;

// Re-export main types
pub use types::*;
pub use line_reader::{tokenize, LineSource, TokenRun};
pub use classifier::{classify, RecordType};
pub use payload_parser::decode_payload;
pub use timestamp::{eu_dst_dates, ResolvedTimestamps, TimestampResolver, DEFAULT_TIME_ZONE};
pub use node_directory::{NodeDirectory, NodeInfo};
pub use normalizer::EventNormalizer;
pub use assembler::{AssemblerState, EventAssembler, RunSummary};
pub use ingest::{ingest, ingest_file};

// Re-export sinks
pub use base_sink::EventSink;
pub use csv_sink::CsvSink;
pub use ndjson_sink::NdjsonSink;
pub use duckdb_sink::DuckDbSink;
pub use sinks::{open_sink, SinkFormat};
