use crate::{base_sink::EventSink, NormalizedEvent, SinkError, COLUMNS};
use duckdb::{params_from_iter, Connection};
use std::path::Path;
use tracing::debug;

pub const EVENT_TABLE: &str = "siteboss_events";

/// DuckDB sink - one VARCHAR column per output column, one insert per event.
///
/// The table is replaced when the sink is created. Columns with no value in
/// the event are stored as NULL.
pub struct DuckDbSink {
    conn: Connection,
    insert_sql: String,
}

impl DuckDbSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        Self::new(Connection::open(path)?)
    }

    pub fn new(conn: Connection) -> Result<Self, SinkError> {
        let definitions: Vec<String> = COLUMNS.iter().map(|c| format!("{} VARCHAR", c)).collect();
        conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} ({})",
            EVENT_TABLE,
            definitions.join(", ")
        ))?;
        debug!("Created table {}", EVENT_TABLE);

        let placeholders = vec!["?"; COLUMNS.len()].join(", ");
        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            EVENT_TABLE,
            COLUMNS.join(", "),
            placeholders
        );
        Ok(Self { conn, insert_sql })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl EventSink for DuckDbSink {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn write_event(&mut self, event: &NormalizedEvent) -> Result<(), SinkError> {
        let values = COLUMNS.iter().map(|column| event.column_value(column));
        self.conn.execute(&self.insert_sql, params_from_iter(values))?;
        Ok(())
    }
}
