use thiserror::Error;

/// Application-wide error types for Krill.
#[derive(Error, Debug)]
pub enum AppError {
    /// Browser session could not be launched or driven.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// A site scraper failed (missing element, navigation failure, bad markup).
    #[error("Scrape error: {0}")]
    ScrapeError(String),

    /// Operation timed out.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Insert violated the job-hash unique constraint. Two runs discovered
    /// the same posting concurrently; callers treat this as a duplicate,
    /// never as a failure.
    #[error("Duplicate job hash: {0}")]
    UniqueViolation(String),

    /// Invalid or missing configuration.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::BrowserError(_)
                | AppError::ScrapeError(_)
                | AppError::Timeout(_)
                | AppError::NetworkError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(AppError::BrowserError("launch failed".into()).is_retryable());
        assert!(AppError::Timeout(30).is_retryable());
        assert!(AppError::ScrapeError("element not found".into()).is_retryable());
        assert!(!AppError::UniqueViolation("abc".into()).is_retryable());
        assert!(!AppError::ConfigError("missing var".into()).is_retryable());
    }
}
