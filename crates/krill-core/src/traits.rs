use std::future::Future;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewJobPosting, RawPosting};
use crate::run::{RunCounters, RunStatus, ScrapeRun, Trigger};

/// Fetches rendered HTML for a URL.
///
/// Object-safe so site scrapers can be driven through `&dyn PageSource`
/// without knowing which browser backend is behind it.
pub trait PageSource: Send + Sync {
    fn html<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, AppError>>;
}

/// A live browser session.
///
/// `close` must be idempotent and must never surface an error: session
/// teardown happens on every retry attempt, success or failure, and a
/// failed close must not mask the scrape result.
pub trait BrowserSession: PageSource {
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Launches browser sessions. One session per scrape attempt.
pub trait BrowserProvider: Send + Sync {
    type Session: BrowserSession;

    fn acquire(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}

/// One entry in the scraper registry: knows how to pull raw postings for
/// a single company off its career site.
///
/// Object-safe: the registry is an ordered `Vec<Box<dyn SiteScraper>>` and
/// the orchestrator walks it strictly in order.
pub trait SiteScraper: Send + Sync {
    /// Company name as recorded on postings and in run results.
    fn company(&self) -> &str;

    /// Source website label stored on postings.
    fn source_website(&self) -> &str;

    fn scrape<'a>(
        &'a self,
        page: &'a dyn PageSource,
    ) -> BoxFuture<'a, Result<Vec<RawPosting>, AppError>>;
}

/// Persists and queries job postings.
pub trait JobStore: Send + Sync {
    /// Look up a posting id by its dedup hash.
    fn find_id_by_hash(
        &self,
        job_hash: &str,
    ) -> impl Future<Output = Result<Option<Uuid>, AppError>> + Send;

    /// Refresh `last_seen` on an existing posting.
    fn touch_last_seen(
        &self,
        id: Uuid,
        seen_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Insert a new posting. Returns `AppError::UniqueViolation` if another
    /// writer inserted the same hash first.
    fn insert(
        &self,
        posting: &NewJobPosting,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;
}

/// Persists and queries scrape runs.
pub trait RunStore: Send + Sync {
    /// Create a run row with its start time stamped, status `running`.
    fn create(
        &self,
        trigger: Trigger,
        total_companies: i32,
    ) -> impl Future<Output = Result<ScrapeRun, AppError>> + Send;

    /// Move the progress pointer. Written before each company is attempted.
    fn set_current_company(
        &self,
        run_id: Uuid,
        company: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Flush accumulated counters to the run row.
    fn record_progress(
        &self,
        run_id: Uuid,
        counters: &RunCounters,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Terminal write: status, completion time, duration, cleared pointer,
    /// final counters and error log.
    fn finalize(
        &self,
        run_id: Uuid,
        status: RunStatus,
        counters: &RunCounters,
        error_log: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Fail every in-flight run started more than `threshold_hours` ago.
    /// Returns how many were swept.
    fn fail_stale_runs(
        &self,
        threshold_hours: i64,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;
}
