//! Bounded retry around a single company scrape.
//!
//! One browser session per attempt, closed unconditionally after the
//! attempt finishes, so a wedged renderer never leaks into the next try.

use std::env;
use std::time::Duration;

use crate::error::AppError;
use crate::traits::{BrowserProvider, BrowserSession, SiteScraper};

/// Retry policy for company scrapes.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, not re-attempts.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Read `SCRAPER_RETRY_COUNT` from the environment, defaulting on
    /// absence or garbage.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_attempts = env::var("SCRAPER_RETRY_COUNT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_attempts);
        Self {
            max_attempts,
            ..defaults
        }
    }
}

/// Scrape one company with bounded retries. Never returns an error:
/// exhausted retries yield an empty vec and the company is reported as
/// failed by the caller based on that.
///
/// A session-acquisition failure consumes an attempt like any other
/// failure. Success short-circuits immediately.
pub async fn scrape_with_retry<P: BrowserProvider>(
    scraper: &dyn SiteScraper,
    provider: &P,
    config: RetryConfig,
) -> Vec<crate::models::RawPosting> {
    let company = scraper.company();

    for attempt in 1..=config.max_attempts {
        let outcome = attempt_scrape(scraper, provider).await;

        match outcome {
            Ok(postings) => {
                tracing::info!(%company, attempt, count = postings.len(), "Scrape succeeded");
                return postings;
            }
            Err(e) => {
                tracing::warn!(%company, attempt, max = config.max_attempts, error = %e, "Scrape attempt failed");
                if attempt < config.max_attempts {
                    tokio::time::sleep(config.delay).await;
                }
            }
        }
    }

    tracing::error!(%company, attempts = config.max_attempts, "All scrape attempts exhausted");
    Vec::new()
}

/// One attempt: acquire a session, scrape, close the session no matter
/// what happened.
async fn attempt_scrape<P: BrowserProvider>(
    scraper: &dyn SiteScraper,
    provider: &P,
) -> Result<Vec<crate::models::RawPosting>, AppError> {
    let session = provider.acquire().await?;
    let result = scraper.scrape(&session).await;
    session.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockBrowserProvider, MockSiteScraper};

    #[tokio::test]
    async fn test_success_short_circuits() {
        let provider = MockBrowserProvider::new();
        let scraper = MockSiteScraper::succeeding("Acme", 2);
        let config = RetryConfig {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        };

        let postings = scrape_with_retry(&scraper, &provider, config).await;
        assert_eq!(postings.len(), 2);
        assert_eq!(scraper.calls(), 1);
        // The one session that was opened got closed.
        assert_eq!(provider.sessions_opened(), 1);
        assert_eq!(provider.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_empty() {
        let provider = MockBrowserProvider::new();
        let scraper = MockSiteScraper::failing("Acme");
        let config = RetryConfig {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        };

        let postings = scrape_with_retry(&scraper, &provider, config).await;
        assert!(postings.is_empty());
        assert_eq!(scraper.calls(), 3);
        // Every attempt's session was closed despite the failures.
        assert_eq!(provider.sessions_opened(), 3);
        assert_eq!(provider.sessions_closed(), 3);
    }

    #[tokio::test]
    async fn test_acquisition_failure_consumes_attempts() {
        let provider = MockBrowserProvider::failing_acquire();
        let scraper = MockSiteScraper::succeeding("Acme", 1);
        let config = RetryConfig {
            max_attempts: 2,
            delay: Duration::from_millis(1),
        };

        let postings = scrape_with_retry(&scraper, &provider, config).await;
        assert!(postings.is_empty());
        // The scraper never ran; acquisition itself burned both attempts.
        assert_eq!(scraper.calls(), 0);
    }

    #[tokio::test]
    async fn test_recovers_on_later_attempt() {
        let provider = MockBrowserProvider::new();
        let scraper = MockSiteScraper::failing_then_succeeding("Acme", 2, 3);
        let config = RetryConfig {
            max_attempts: 3,
            delay: Duration::from_millis(1),
        };

        let postings = scrape_with_retry(&scraper, &provider, config).await;
        assert_eq!(postings.len(), 3);
        assert_eq!(scraper.calls(), 3);
        assert_eq!(provider.sessions_closed(), 3);
    }
}
