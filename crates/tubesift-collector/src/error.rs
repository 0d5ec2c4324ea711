use thiserror::Error;
use tubesift_browser::BrowserError;
use tubesift_core::ConfigError;
use tubesift_store::StoreError;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("invalid selector '{selector}': {reason}")]
    SelectorInvalid { selector: String, reason: String },
}

/// Top-level error class of a run.
///
/// A run either fully succeeds with a summary or surfaces exactly one of
/// these; there is no partial-success state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("collection failed: {0}")]
    Collect(#[from] CollectError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("no record sink configured")]
    NoSinkConfigured,
}

pub type Result<T> = std::result::Result<T, CollectError>;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_error_converts() {
        let err: CollectError = BrowserError::Timeout("navigate".to_string()).into();
        assert!(matches!(err, CollectError::Browser(_)));

        let err: PipelineError = CollectError::Browser(BrowserError::ConnectionExhausted {
            attempts: 3,
            last_error: "refused".to_string(),
        })
        .into();
        assert!(err.to_string().contains("3 tries"));
    }
}
