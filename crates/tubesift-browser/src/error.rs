use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    /// Malformed endpoint URL or bad auth. Permanent, never retried.
    #[error("invalid browser endpoint: {0}")]
    InvalidEndpoint(String),

    /// Endpoint unreachable or connection reset. Transient, retryable.
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// An operation exceeded its deadline. Transient, retryable.
    #[error("timeout: {0}")]
    Timeout(String),

    /// All connection attempts failed; aborts the run for this query.
    #[error("connection attempts exhausted after {attempts} tries: {last_error}")]
    ConnectionExhausted {
        attempts: u32,
        last_error: String,
    },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("chromium error: {0}")]
    Chromium(String),
}

impl BrowserError {
    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectFailed(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::Navigation("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_exhausted_carries_attempts() {
        let err = BrowserError::ConnectionExhausted {
            attempts: 3,
            last_error: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("3 tries"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(BrowserError::ConnectFailed("reset".to_string()).is_transient());
        assert!(BrowserError::Timeout("navigate".to_string()).is_transient());
        assert!(!BrowserError::InvalidEndpoint("bad url".to_string()).is_transient());
        assert!(!BrowserError::ConnectionExhausted {
            attempts: 3,
            last_error: "x".to_string()
        }
        .is_transient());
    }
}
