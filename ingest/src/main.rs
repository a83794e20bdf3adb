mod config;

use anyhow::Context;
use clap::Parser;
use config::{Cli, IngestConfig};
use siteboss_parser::{
    eu_dst_dates, ingest_file, open_sink, EventNormalizer, NodeDirectory, TimestampResolver,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siteboss_ingest=info,siteboss_parser=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = IngestConfig::from_cli(cli)?;

    if let Some((dst_begin, dst_end)) = eu_dst_dates(config.year) {
        info!("DST Begin: {}", dst_begin.format("%A, %B %d, %Y"));
        info!("DST End  : {}", dst_end.format("%A, %B %d, %Y"));
    }

    let directory = load_nodes(&config);
    let normalizer = EventNormalizer::new(
        TimestampResolver::new(config.year, config.time_zone),
        Arc::new(directory),
    );

    let mut sink = open_sink(&config.output)
        .with_context(|| format!("failed to open output {}", config.output.display()))?;
    let summary = ingest_file(&config.log_file, &normalizer, sink.as_mut())
        .with_context(|| format!("failed to ingest {}", config.log_file.display()))?;

    println!("\n- END -");
    println!("{}", summary);
    println!("Output written to: {}", config.output.display());

    let elapsed = started.elapsed().as_secs();
    info!(
        "Execution time: {} hours, {} minutes, {} seconds",
        elapsed / 3600,
        (elapsed % 3600) / 60,
        elapsed % 60
    );
    Ok(())
}

/// A node file that cannot be loaded is reported once; ingestion continues
/// with every lookup missing.
fn load_nodes(config: &IngestConfig) -> NodeDirectory {
    let Some(path) = &config.nodes else {
        warn!("No node reference file given, node codes and names will be '?'");
        return NodeDirectory::empty();
    };

    match NodeDirectory::load(path) {
        Ok(directory) => directory,
        Err(e) => {
            error!("Node reference unavailable, continuing without it: {}", e);
            NodeDirectory::empty()
        }
    }
}
