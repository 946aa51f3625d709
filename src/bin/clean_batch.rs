//! Cleans one batch of records read from stdin and writes the result to stdout.
//!
//! Input is either a JSON array of records or `{"records": [...]}`. Settings
//! come from the same environment variables as the server.

use std::io::{Read, Write};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contact_cleaner::config::Config;
use contact_cleaner::lookups::StaticLookups;
use contact_cleaner::core::models::{CleanResponse, ContactRecord};
use contact_cleaner::core::pipeline::CleaningPipeline;

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum BatchInput {
    Bare(Vec<ContactRecord>),
    Wrapped { records: Vec<ContactRecord> },
}

/// Main entry point for the batch cleaner.
///
/// Logs go to stderr so stdout carries only the JSON result.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contact_cleaner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let lookups = StaticLookups::load(config.lookup_tables_path.as_deref())?;

    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let records = match serde_json::from_str::<BatchInput>(&raw)? {
        BatchInput::Bare(records) | BatchInput::Wrapped { records } => records,
    };

    if records.len() > config.max_records {
        anyhow::bail!(
            "Batch of {} records exceeds MAX_RECORDS ({})",
            records.len(),
            config.max_records
        );
    }

    let run = CleaningPipeline::new(&lookups, config.dedup.clone())
        .and_then(|pipeline| pipeline.run(&records))
        .map_err(|e| anyhow::anyhow!("Cleaning run failed: {}", e))?;

    let response = CleanResponse {
        run_id: uuid::Uuid::new_v4(),
        processed_at: chrono::Utc::now(),
        records: run.records,
        candidates: run.candidates,
        audit: run.audit,
        stats: run.stats,
    };

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &response)?;
    writeln!(stdout)?;

    Ok(())
}
