use crate::actions::LivePage;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::stream::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How the session reaches a browser.
#[derive(Debug, Clone)]
pub enum SessionMode {
    /// Launch a local headless browser
    Local {
        /// Run without a visible window
        headless: bool,
    },
    /// Connect to a remote browser-automation endpoint over CDP
    Remote {
        /// Websocket URL of the endpoint, e.g. `ws://localhost:3000`
        endpoint: String,
    },
}

/// Retry behavior for session establishment.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum connection attempts before giving up
    pub max_attempts: u32,
    /// Base delay between attempts, doubled after each failure
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Deadline for a single connect or launch attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Aborts the wrapped task when dropped.
///
/// The CDP event loop must stop even when the session is dropped at an
/// await point (external timeout, interrupt) instead of being closed
/// explicitly; otherwise the handler keeps a remote session alive.
#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A connected browser session with guaranteed teardown.
///
/// The caller owns the session for the duration of one run and calls
/// [`BrowserSession::close`] on every exit path, including failures
/// mid-navigation. If the session is instead dropped mid-run, the event
/// loop task is aborted there and then; `close` additionally shuts the
/// browser down cleanly.
#[derive(Debug)]
pub struct BrowserSession {
    browser: Browser,
    handler_task: AbortOnDrop,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
}

impl BrowserSession {
    /// Establish a session, retrying transient failures with exponential
    /// backoff.
    ///
    /// Permanent failures (a malformed endpoint URL) fail fast without any
    /// retry. Transient failures are retried up to `retry.max_attempts`
    /// times, each attempt logged with its number and failure reason. When
    /// attempts are exhausted the error is
    /// [`BrowserError::ConnectionExhausted`]; it is never swallowed.
    pub async fn connect(
        mode: &SessionMode,
        retry: &RetryPolicy,
        fingerprint: FingerprintConfig,
        navigation_timeout: Duration,
    ) -> Result<Self> {
        if let SessionMode::Remote { endpoint } = mode {
            validate_endpoint(endpoint)?;
        }

        let mut last_error = None;

        for attempt in 1..=retry.max_attempts {
            tracing::info!(attempt, max = retry.max_attempts, "Connecting browser session");

            match Self::attempt_connect(mode, &fingerprint).await {
                Ok((browser, handler_task)) => {
                    tracing::info!(attempt, "Browser session established");
                    return Ok(Self {
                        browser,
                        handler_task: AbortOnDrop(handler_task),
                        fingerprint,
                        navigation_timeout,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max = retry.max_attempts,
                        error = %e,
                        "Browser connection attempt failed"
                    );
                    last_error = Some(e);

                    if attempt < retry.max_attempts {
                        let delay = retry.base_delay * 2u32.pow(attempt - 1);
                        tracing::info!(?delay, "Retrying after backoff");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(BrowserError::ConnectionExhausted {
            attempts: retry.max_attempts,
            last_error: last_error
                .map_or_else(|| "unknown".to_string(), |e| e.to_string()),
        })
    }

    /// One connect or launch attempt, bounded by [`CONNECT_TIMEOUT`].
    async fn attempt_connect(
        mode: &SessionMode,
        fingerprint: &FingerprintConfig,
    ) -> Result<(Browser, JoinHandle<()>)> {
        let connect = async {
            match mode {
                SessionMode::Remote { endpoint } => Browser::connect(endpoint.clone())
                    .await
                    .map_err(|e| BrowserError::ConnectFailed(e.to_string())),
                SessionMode::Local { headless } => {
                    let mut builder = BrowserConfig::builder()
                        .no_sandbox()
                        .window_size(fingerprint.viewport_width, fingerprint.viewport_height);
                    if !headless {
                        builder = builder.with_head();
                    }
                    let config = builder
                        .build()
                        .map_err(|e| BrowserError::Chromium(e.to_string()))?;

                    Browser::launch(config)
                        .await
                        .map_err(|e| BrowserError::ConnectFailed(e.to_string()))
                }
            }
        };

        let (browser, mut handler) = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| BrowserError::Timeout("browser connect".to_string()))??;

        // Drive the CDP event stream for the lifetime of the session
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok((browser, handler_task))
    }

    /// Open a fresh page with the session fingerprint applied.
    pub async fn open_page(&self) -> Result<LivePage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        page.set_user_agent(self.fingerprint.user_agent.as_str())
            .await
            .map_err(|e| BrowserError::Chromium(e.to_string()))?;

        Ok(LivePage::new(page, self.navigation_timeout))
    }

    /// Tear the session down: close the browser and stop the event loop.
    ///
    /// Errors during close are logged, not surfaced; teardown must complete
    /// on every path.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "Browser close failed");
        }
        // Dropping self aborts the event loop task
        tracing::info!("Browser session closed");
    }
}

/// Reject remote endpoints that can never connect, before any attempt.
fn validate_endpoint(endpoint: &str) -> Result<()> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| BrowserError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

    match parsed.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(BrowserError::InvalidEndpoint(format!(
            "unsupported scheme '{other}', expected ws or wss"
        ))),
    }
}
