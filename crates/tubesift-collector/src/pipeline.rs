//! End-to-end run: browse, collect, normalize, persist.
//!
//! The pipeline owns the browser session lifecycle. Persistence is
//! per-sink: each sink reconciles the batch against its own key set, so a
//! sink that missed an earlier run catches up on the next one.

use crate::collector::{Collector, CollectorConfig};
use crate::error::{PipelineError, PipelineResult};
use std::time::Duration;
use tubesift_browser::{BrowserSession, FingerprintConfig, RetryPolicy, SessionMode};
use tubesift_core::{AppConfig, NormalizedRecord, RunSummary};
use tubesift_store::{reconcile, RecordSink};

/// Everything a finished run reports.
#[derive(Debug)]
pub struct RunOutcome {
    /// Counters for the run
    pub summary: RunSummary,
    /// The full normalized batch, before reconciliation
    pub records: Vec<NormalizedRecord>,
}

/// One scrape-and-store run driven by an [`AppConfig`].
pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    /// Validate the configuration and build a pipeline.
    pub fn new(config: AppConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the full pipeline against the given sinks.
    ///
    /// The summary's new/duplicate counts come from the first sink; the
    /// remaining sinks mirror the same batch against their own key sets.
    pub async fn run(&self, sinks: &[&dyn RecordSink]) -> PipelineResult<RunOutcome> {
        if sinks.is_empty() {
            return Err(PipelineError::NoSinkConfigured);
        }

        let session = self.connect_session().await.map_err(crate::CollectError::from)?;

        // The session must be torn down on every exit path
        let collected = match self.collect_with(&session).await {
            Ok(collected) => collected,
            Err(e) => {
                session.close().await;
                return Err(e.into());
            }
        };
        session.close().await;

        let records: Vec<NormalizedRecord> = collected
            .cards
            .into_iter()
            .map(NormalizedRecord::from_raw)
            .collect();
        let unparsed = records.iter().filter(|r| r.views_count.is_none()).count();
        if unparsed > 0 {
            tracing::warn!(unparsed, total = records.len(), "View counts left unparsed");
        }

        let summary = persist_batch(&records, sinks).await?;
        Ok(RunOutcome { summary, records })
    }

    async fn connect_session(&self) -> tubesift_browser::Result<BrowserSession> {
        let browser = &self.config.browser;
        let mode = match &browser.remote_endpoint {
            Some(endpoint) => SessionMode::Remote {
                endpoint: endpoint.clone(),
            },
            None => SessionMode::Local {
                headless: browser.headless,
            },
        };
        let retry = RetryPolicy {
            max_attempts: self.config.retry.max_attempts,
            base_delay: Duration::from_millis(self.config.retry.base_delay_ms),
        };
        let fingerprint =
            FingerprintConfig::with_viewport(browser.viewport_width, browser.viewport_height);

        BrowserSession::connect(
            &mode,
            &retry,
            fingerprint,
            Duration::from_secs(browser.navigation_timeout_secs),
        )
        .await
    }

    async fn collect_with(
        &self,
        session: &BrowserSession,
    ) -> crate::error::Result<crate::collector::Collected> {
        let browser = &self.config.browser;
        let collector = Collector::new(CollectorConfig {
            max_results: self.config.search.max_results,
            max_stalled_rounds: browser.max_stalled_rounds,
            scroll_settle: Duration::from_millis(browser.scroll_settle_ms),
            budget: Duration::from_secs(browser.collect_budget_secs),
        })?;

        let page = session.open_page().await?;
        let result = collector.collect(&self.config.search.query, &page).await;
        page.close().await;
        result
    }
}

/// Reconcile and append a batch into each sink independently.
///
/// A sink failure stops the run after the sinks before it have committed;
/// those commits stay, and the failed sink reconciles the overlap away on
/// the next run.
pub async fn persist_batch(
    records: &[NormalizedRecord],
    sinks: &[&dyn RecordSink],
) -> PipelineResult<RunSummary> {
    let mut summary = RunSummary {
        collected: records.len(),
        new: 0,
        duplicates: 0,
    };

    for (idx, sink) in sinks.iter().enumerate() {
        let existing = sink.existing_keys().await?;
        let outcome = reconcile(records.to_vec(), &existing);
        tracing::info!(
            sink = sink.name(),
            new = outcome.to_append.len(),
            duplicates = outcome.duplicates,
            "Reconciled batch"
        );

        if !outcome.to_append.is_empty() {
            sink.append(&outcome.to_append).await?;
        }

        if idx == 0 {
            summary.new = outcome.to_append.len();
            summary.duplicates = outcome.duplicates;
        }
    }

    Ok(summary)
}
