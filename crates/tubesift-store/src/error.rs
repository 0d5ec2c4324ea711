use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Append rejected or partially applied. The whole batch is treated as
    /// unpersisted; callers must not assume any record was committed.
    #[error("sink write rejected for {sink}: {reason}")]
    WriteRejected { sink: String, reason: String },

    #[error("sink not configured: {0}")]
    NotConfigured(String),

    /// A stored record no longer parses (external edit or corruption)
    #[error("store corrupt at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::WriteRejected {
            sink: "sheets".to_string(),
            reason: "HTTP 403".to_string(),
        };
        assert_eq!(err.to_string(), "sink write rejected for sheets: HTTP 403");
    }
}
