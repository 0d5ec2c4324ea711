use crate::error::{BrowserError, Result};
use chromiumoxide::Page;
use std::time::Duration;

/// Capability a collector needs from a rendered search-results page.
///
/// Concrete sessions implement this over a live browser page; tests drive
/// the collector with scripted implementations instead.
#[async_trait::async_trait]
pub trait SearchPage {
    /// Navigate to a URL and wait for the page to load
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Full rendered HTML of the current document
    async fn content(&self) -> Result<String>;

    /// Trigger one incremental scroll-load step
    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Wait for newly loaded content to settle
    async fn settle(&self, wait: Duration);
}

/// [`SearchPage`] over a live chromiumoxide page.
pub struct LivePage {
    page: Page,
    navigation_timeout: Duration,
}

impl LivePage {
    pub(crate) fn new(page: Page, navigation_timeout: Duration) -> Self {
        Self {
            page,
            navigation_timeout,
        }
    }

    /// Close the underlying page. Tab leaks are logged, not surfaced.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "Page close failed (tab leak)");
        }
    }
}

#[async_trait::async_trait]
impl SearchPage for LivePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| BrowserError::Timeout(format!("navigate to {url}")))?
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;

        // Dynamic pages keep loading after the load event; bounded wait only
        let _ = tokio::time::timeout(self.navigation_timeout, self.page.wait_for_navigation())
            .await;

        Ok(())
    }

    async fn content(&self) -> Result<String> {
        tokio::time::timeout(self.navigation_timeout, self.page.content())
            .await
            .map_err(|_| BrowserError::Timeout("page content".to_string()))?
            .map_err(|e| BrowserError::Chromium(e.to_string()))
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate("window.scrollTo(0, document.documentElement.scrollHeight)")
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;
        Ok(())
    }

    async fn settle(&self, wait: Duration) {
        tokio::time::sleep(wait).await;
    }
}
