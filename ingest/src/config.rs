use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use clap::Parser;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIME_ZONE: &str = "Europe/Dublin";

/// Ingest a SiteBoss equipment log into a CSV or NDJSON event table.
#[derive(Debug, Parser)]
#[command(name = "siteboss-ingest", version)]
pub struct Cli {
    /// Log file to ingest.
    pub log_file: PathBuf,

    /// Node reference JSON (array of objects with `id` and `name`).
    #[arg(long, value_name = "PATH")]
    pub nodes: Option<PathBuf>,

    /// Output file; `.db`/`.duckdb`, `.csv`, `.ndjson` or `.jsonl`. Defaults to `<log stem>_out.db`.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Year of the log's receipt times, which carry none. Defaults to the current year.
    #[arg(long)]
    pub year: Option<i32>,

    /// IANA zone the logger's clock runs in.
    #[arg(long, default_value = DEFAULT_TIME_ZONE)]
    pub timezone: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown time zone '{zone}': {reason}")]
    UnknownTimeZone { zone: String, reason: String },
    #[error("year {0} is out of range")]
    InvalidYear(i32),
}

/// Validated run configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub log_file: PathBuf,
    pub nodes: Option<PathBuf>,
    pub output: PathBuf,
    pub year: i32,
    pub time_zone: Tz,
}

impl IngestConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let time_zone = cli
            .timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::UnknownTimeZone {
                zone: cli.timezone.clone(),
                reason: e.to_string(),
            })?;

        let year = cli.year.unwrap_or_else(|| Utc::now().year());
        if !(1970..=9999).contains(&year) {
            return Err(ConfigError::InvalidYear(year));
        }

        let output = cli
            .output
            .unwrap_or_else(|| default_output_path(&cli.log_file));

        Ok(Self {
            log_file: cli.log_file,
            nodes: cli.nodes,
            output,
            year,
            time_zone,
        })
    }
}

/// `<dir>/<stem>_out.db` beside the log file.
pub fn default_output_path(log_file: &Path) -> PathBuf {
    let stem = log_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "siteboss".to_string());
    log_file.with_file_name(format!("{}_out.db", stem))
}
