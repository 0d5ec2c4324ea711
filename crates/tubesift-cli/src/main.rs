//! Command-line entry point: one scrape-and-store run per invocation.

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tubesift_collector::{Pipeline, RunOutcome};
use tubesift_core::{AppConfig, NormalizedRecord};
use tubesift_store::{CsvFileSink, JsonFileSink, RecordSink, SheetsSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load_with_env().context("loading configuration")?;

    // First run: write the defaults out so they can be edited
    let config_path = AppConfig::config_path().context("resolving config path")?;
    if !config_path.exists() {
        AppConfig::default()
            .save()
            .context("writing default configuration")?;
        tracing::info!(path = %config_path.display(), "Wrote default configuration");
    }

    tracing::info!(
        query = %config.search.query,
        max_results = config.search.max_results,
        "Starting run"
    );

    let (sinks, sheet_url) = build_sinks(&config)?;
    let sink_refs: Vec<&dyn RecordSink> = sinks.iter().map(AsRef::as_ref).collect();

    let pipeline = Pipeline::new(config)?;
    let outcome = pipeline.run(&sink_refs).await?;
    report(&outcome, sheet_url.as_deref());

    Ok(())
}

/// Build every sink the storage settings enable.
fn build_sinks(config: &AppConfig) -> anyhow::Result<(Vec<Box<dyn RecordSink>>, Option<String>)> {
    let storage = &config.storage;
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::new();
    let mut sheet_url = None;

    if let Some(path) = &storage.json_path {
        sinks.push(Box::new(
            JsonFileSink::new(path).context("opening JSON store")?,
        ));
    }
    if let Some(path) = &storage.csv_path {
        sinks.push(Box::new(
            CsvFileSink::new(path).context("opening CSV mirror")?,
        ));
    }
    if let Some(sheet_id) = &storage.sheet_id {
        let token = storage.sheets_token.as_deref().unwrap_or_default();
        let sheets = SheetsSink::new(sheet_id, storage.sheet_name.clone(), token)
            .context("configuring spreadsheet sink")?;
        sheet_url = Some(sheets.sheet_url());
        sinks.push(Box::new(sheets));
    }

    Ok((sinks, sheet_url))
}

/// Log the run summary and the most-viewed records of the batch.
fn report(outcome: &RunOutcome, sheet_url: Option<&str>) {
    tracing::info!(summary = %outcome.summary, "Run finished");
    if let Some(url) = sheet_url {
        tracing::info!(url, "Spreadsheet updated");
    }

    let mut ranked: Vec<&NormalizedRecord> = outcome
        .records
        .iter()
        .filter(|r| r.views_count.is_some())
        .collect();
    ranked.sort_by(|a, b| b.views_count.cmp(&a.views_count));

    for (rank, record) in ranked.iter().take(5).enumerate() {
        tracing::info!(
            rank = rank + 1,
            views = record.views_count.unwrap_or_default(),
            title = %record.title,
            url = %record.url,
            "Top result"
        );
    }
}
