//! Bounded collection loop over an infinite-scroll results page.
//!
//! The scroll-and-yield behavior is an explicit state machine rather than a
//! generator chain, so the termination conditions are independently
//! testable. Termination, in priority order: the result cap, a stalled
//! scroll (no new cards for N consecutive rounds), the hard time budget.

use crate::card_parser::{CardParser, CardSelectors, MissingFieldLog};
use crate::error::Result;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tubesift_browser::SearchPage;
use tubesift_core::RawResultCard;

/// Phases of one collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollectPhase {
    /// Loading the search-results page
    Navigating,
    /// Reading currently-rendered cards out of the DOM
    Extracting,
    /// Triggering one scroll-load step and waiting for content to settle
    Scrolling,
    /// Terminated normally (cap, stall or budget)
    Done,
}

/// Why a collection stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_results` cards collected
    CapReached,
    /// `max_stalled_rounds` consecutive rounds produced nothing new
    Stalled,
    /// The wall-clock budget ran out
    BudgetExceeded,
}

/// Tuning knobs for one collection run.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Cap on cards collected per run
    pub max_results: usize,
    /// Consecutive zero-new-card rounds before giving up
    pub max_stalled_rounds: u32,
    /// Wait after a scroll step for new content to settle
    pub scroll_settle: Duration,
    /// Hard wall-clock budget for the whole collection
    pub budget: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_results: 50,
            max_stalled_rounds: 3,
            scroll_settle: Duration::from_millis(2000),
            budget: Duration::from_secs(120),
        }
    }
}

/// Everything a finished collection reports.
#[derive(Debug)]
pub struct Collected {
    /// Cards in first-observed order, deduplicated within the run by url
    pub cards: Vec<RawResultCard>,
    /// Why collection stopped
    pub stop_reason: StopReason,
    /// Scroll rounds performed
    pub rounds: u32,
}

/// Drives a search-results page and extracts result cards.
pub struct Collector {
    parser: CardParser,
    config: CollectorConfig,
}

impl Collector {
    /// Create a collector with the default card layout.
    pub fn new(config: CollectorConfig) -> Result<Self> {
        Self::with_selectors(config, &CardSelectors::default())
    }

    /// Create a collector with a custom selector set.
    pub fn with_selectors(config: CollectorConfig, selectors: &CardSelectors) -> Result<Self> {
        Ok(Self {
            parser: CardParser::new(selectors)?,
            config,
        })
    }

    /// Collect result cards for `query` from an already-open page.
    ///
    /// Produces a finite sequence in first-observed order, capped at
    /// `max_results`. Extraction failures on individual fields degrade the
    /// affected card only; browser failures abort the run.
    pub async fn collect<P: SearchPage + Sync>(&self, query: &str, page: &P) -> Result<Collected> {
        let search_url = search_url(query);
        tracing::info!(query, url = %search_url, "Starting collection");

        let deadline = Instant::now() + self.config.budget;
        let mut missing = MissingFieldLog::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cards: Vec<RawResultCard> = Vec::new();
        let mut stalled_rounds = 0u32;
        let mut rounds = 0u32;
        let mut stop_reason = StopReason::CapReached;

        let mut phase = CollectPhase::Navigating;
        while phase != CollectPhase::Done {
            match phase {
                CollectPhase::Navigating => {
                    page.navigate(&search_url).await?;
                    phase = CollectPhase::Extracting;
                }
                CollectPhase::Extracting => {
                    rounds += 1;
                    let html = page.content().await?;

                    let mut new_this_round = 0usize;
                    for card in self.parser.parse(&html, &mut missing) {
                        if cards.len() >= self.config.max_results {
                            break;
                        }
                        // A scroll round may re-render overlapping cards
                        if seen.insert(card.url.as_str().to_string()) {
                            cards.push(card);
                            new_this_round += 1;
                        }
                    }

                    tracing::info!(
                        round = rounds,
                        new = new_this_round,
                        total = cards.len(),
                        cap = self.config.max_results,
                        "Scroll round extracted"
                    );

                    if cards.len() >= self.config.max_results {
                        stop_reason = StopReason::CapReached;
                        phase = CollectPhase::Done;
                    } else if new_this_round == 0 {
                        stalled_rounds += 1;
                        if stalled_rounds >= self.config.max_stalled_rounds {
                            stop_reason = StopReason::Stalled;
                            phase = CollectPhase::Done;
                        } else {
                            phase = CollectPhase::Scrolling;
                        }
                    } else {
                        stalled_rounds = 0;
                        phase = CollectPhase::Scrolling;
                    }
                }
                CollectPhase::Scrolling => {
                    if Instant::now() >= deadline {
                        stop_reason = StopReason::BudgetExceeded;
                        phase = CollectPhase::Done;
                    } else {
                        page.scroll_to_bottom().await?;
                        page.settle(self.config.scroll_settle).await;
                        phase = CollectPhase::Extracting;
                    }
                }
                CollectPhase::Done => unreachable!("loop exits before Done is matched"),
            }
        }

        tracing::info!(
            collected = cards.len(),
            rounds,
            ?stop_reason,
            "Collection finished"
        );
        Ok(Collected {
            cards,
            stop_reason,
            rounds,
        })
    }
}

/// Search-results URL for a query.
fn search_url(query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!("https://www.youtube.com/results?search_query={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tubesift_browser::{BrowserError, SearchPage};

    /// Scripted page: round N of content() serves `rounds[N]`, advanced by
    /// scroll_to_bottom.
    struct ScriptedPage {
        rounds: Vec<String>,
        current: Mutex<usize>,
        scrolls: Mutex<u32>,
    }

    impl ScriptedPage {
        fn new(rounds: Vec<String>) -> Self {
            Self {
                rounds,
                current: Mutex::new(0),
                scrolls: Mutex::new(0),
            }
        }

        fn scroll_count(&self) -> u32 {
            *self.scrolls.lock().expect("lock scrolls")
        }
    }

    #[async_trait::async_trait]
    impl SearchPage for ScriptedPage {
        async fn navigate(&self, _url: &str) -> tubesift_browser::Result<()> {
            Ok(())
        }

        async fn content(&self) -> tubesift_browser::Result<String> {
            let idx = *self.current.lock().expect("lock current");
            Ok(self.rounds[idx.min(self.rounds.len() - 1)].clone())
        }

        async fn scroll_to_bottom(&self) -> tubesift_browser::Result<()> {
            *self.scrolls.lock().expect("lock scrolls") += 1;
            let mut idx = self.current.lock().expect("lock current");
            *idx = (*idx + 1).min(self.rounds.len() - 1);
            Ok(())
        }

        async fn settle(&self, _wait: Duration) {}
    }

    /// Page whose navigation always fails.
    struct BrokenPage;

    #[async_trait::async_trait]
    impl SearchPage for BrokenPage {
        async fn navigate(&self, url: &str) -> tubesift_browser::Result<()> {
            Err(BrowserError::Navigation(format!("cannot reach {url}")))
        }

        async fn content(&self) -> tubesift_browser::Result<String> {
            unreachable!("navigate fails first")
        }

        async fn scroll_to_bottom(&self) -> tubesift_browser::Result<()> {
            unreachable!("navigate fails first")
        }

        async fn settle(&self, _wait: Duration) {}
    }

    fn card(id_suffix: u32) -> String {
        format!(
            r##"<ytd-video-renderer>
                <a id="video-title" title="video {id_suffix}" href="/watch?v=vid{id_suffix:08}"
                   aria-label="video {id_suffix} 1,234 回視聴"></a>
                <ytd-channel-name><a>Channel</a></ytd-channel-name>
                <div id="metadata-line"><span>1,234回視聴</span><span>1日前</span></div>
            </ytd-video-renderer>"##
        )
    }

    fn page_with_cards(ids: std::ops::Range<u32>) -> String {
        ids.map(card).collect()
    }

    fn config(max_results: usize) -> CollectorConfig {
        CollectorConfig {
            max_results,
            max_stalled_rounds: 3,
            scroll_settle: Duration::from_millis(0),
            budget: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_cap_reached_on_first_round_without_scrolling() {
        // 5 distinct cards on round 1, cap 5: terminate immediately
        let page = ScriptedPage::new(vec![page_with_cards(0..5)]);
        let collector = Collector::new(config(5)).expect("build collector");

        let collected = collector.collect("test", &page).await.expect("collect");
        assert_eq!(collected.cards.len(), 5);
        assert_eq!(collected.stop_reason, StopReason::CapReached);
        assert_eq!(collected.rounds, 1);
        assert_eq!(page.scroll_count(), 0);
    }

    #[tokio::test]
    async fn test_never_yields_more_than_max_results() {
        let page = ScriptedPage::new(vec![page_with_cards(0..30)]);
        let collector = Collector::new(config(10)).expect("build collector");

        let collected = collector.collect("test", &page).await.expect("collect");
        assert_eq!(collected.cards.len(), 10);
    }

    #[tokio::test]
    async fn test_scrolling_accumulates_across_rounds() {
        // Rounds grow as content loads; overlap must not duplicate
        let page = ScriptedPage::new(vec![
            page_with_cards(0..4),
            page_with_cards(0..8),
            page_with_cards(0..12),
        ]);
        let collector = Collector::new(config(12)).expect("build collector");

        let collected = collector.collect("test", &page).await.expect("collect");
        assert_eq!(collected.cards.len(), 12);
        assert_eq!(collected.stop_reason, StopReason::CapReached);

        // First-observed order is preserved
        let titles: Vec<_> = collected.cards.iter().map(|c| c.title.clone()).collect();
        assert_eq!(titles[0], "video 0");
        assert_eq!(titles[11], "video 11");
    }

    #[tokio::test]
    async fn test_stall_terminates_after_n_rounds() {
        // The page never loads more than 4 cards; cap is far away
        let page = ScriptedPage::new(vec![page_with_cards(0..4)]);
        let collector = Collector::new(config(50)).expect("build collector");

        let collected = collector.collect("test", &page).await.expect("collect");
        assert_eq!(collected.cards.len(), 4);
        assert_eq!(collected.stop_reason, StopReason::Stalled);
        // Round 1 extracts, then 3 stalled rounds follow
        assert_eq!(collected.rounds, 4);
        assert_eq!(page.scroll_count(), 3);
    }

    #[tokio::test]
    async fn test_budget_exceeded_stops_before_next_scroll() {
        let page = ScriptedPage::new(vec![page_with_cards(0..2), page_with_cards(0..4)]);
        let mut cfg = config(50);
        cfg.budget = Duration::from_secs(0);
        let collector = Collector::new(cfg).expect("build collector");

        let collected = collector.collect("test", &page).await.expect("collect");
        assert_eq!(collected.stop_reason, StopReason::BudgetExceeded);
        assert_eq!(collected.cards.len(), 2);
        assert_eq!(page.scroll_count(), 0);
    }

    #[tokio::test]
    async fn test_browser_failure_aborts_run() {
        let collector = Collector::new(config(5)).expect("build collector");
        let err = collector
            .collect("test", &BrokenPage)
            .await
            .expect_err("navigation failure must abort");
        assert!(err.to_string().contains("navigation failed"));
    }

    #[test]
    fn test_search_url_encodes_query() {
        assert_eq!(
            search_url("rust tutorial"),
            "https://www.youtube.com/results?search_query=rust+tutorial"
        );
    }
}
