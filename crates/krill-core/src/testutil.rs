//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewJobPosting, RawPosting};
use crate::run::{RunCounters, RunStatus, ScrapeRun, Trigger};
use crate::traits::{
    BrowserProvider, BrowserSession, JobStore, PageSource, RunStore, SiteScraper,
};

/// A minimal raw posting for tests.
pub fn sample_posting(company: &str, title: &str, location: &str) -> RawPosting {
    RawPosting {
        company: company.to_string(),
        title: title.to_string(),
        location: location.to_string(),
        description: format!("{title} at {company}"),
        source_website: format!("{}.example.com", company.to_lowercase()),
        job_url: format!("https://{}.example.com/jobs/1", company.to_lowercase()),
        post_date: None,
        deadline: None,
    }
}

// ---------------------------------------------------------------------------
// MockBrowserProvider / MockSession
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ProviderState {
    opened: u32,
    closed: u32,
}

/// Mock browser provider that counts session opens and closes.
#[derive(Clone)]
pub struct MockBrowserProvider {
    state: Arc<Mutex<ProviderState>>,
    fail_acquire: bool,
}

impl MockBrowserProvider {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
            fail_acquire: false,
        }
    }

    /// Provider whose every `acquire` fails with a browser error.
    pub fn failing_acquire() -> Self {
        Self {
            state: Arc::new(Mutex::new(ProviderState::default())),
            fail_acquire: true,
        }
    }

    pub fn sessions_opened(&self) -> u32 {
        self.state.lock().unwrap().opened
    }

    pub fn sessions_closed(&self) -> u32 {
        self.state.lock().unwrap().closed
    }
}

impl Default for MockBrowserProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Session vended by [`MockBrowserProvider`]; returns a canned page.
pub struct MockSession {
    state: Arc<Mutex<ProviderState>>,
}

impl PageSource for MockSession {
    fn html<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<String, AppError>> {
        Box::pin(async { Ok("<html><body>mock</body></html>".to_string()) })
    }
}

impl BrowserSession for MockSession {
    async fn close(&self) {
        self.state.lock().unwrap().closed += 1;
    }
}

impl BrowserProvider for MockBrowserProvider {
    type Session = MockSession;

    async fn acquire(&self) -> Result<MockSession, AppError> {
        if self.fail_acquire {
            return Err(AppError::BrowserError("mock launch failure".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        state.opened += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

// ---------------------------------------------------------------------------
// MockSiteScraper
// ---------------------------------------------------------------------------

enum ScrapeBehavior {
    Postings(Vec<RawPosting>),
    AlwaysFail,
    /// Fail the first `n` calls, then return the postings.
    FailThen(u32, Vec<RawPosting>),
}

/// Mock scraper with scripted behavior and a call counter.
pub struct MockSiteScraper {
    company: String,
    behavior: ScrapeBehavior,
    calls: Arc<Mutex<u32>>,
}

impl MockSiteScraper {
    /// Always succeeds with `count` distinct postings.
    pub fn succeeding(company: &str, count: usize) -> Self {
        let postings = (0..count)
            .map(|i| sample_posting(company, &format!("Equity Trader {i}"), "London"))
            .collect();
        Self::with_postings(company, postings)
    }

    pub fn with_postings(company: &str, postings: Vec<RawPosting>) -> Self {
        Self {
            company: company.to_string(),
            behavior: ScrapeBehavior::Postings(postings),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Every call fails with a scrape error.
    pub fn failing(company: &str) -> Self {
        Self {
            company: company.to_string(),
            behavior: ScrapeBehavior::AlwaysFail,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Fails `failures` times, then succeeds with `count` postings.
    pub fn failing_then_succeeding(company: &str, failures: u32, count: usize) -> Self {
        let postings = (0..count)
            .map(|i| sample_posting(company, &format!("Equity Trader {i}"), "London"))
            .collect();
        Self {
            company: company.to_string(),
            behavior: ScrapeBehavior::FailThen(failures, postings),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl SiteScraper for MockSiteScraper {
    fn company(&self) -> &str {
        &self.company
    }

    fn source_website(&self) -> &str {
        "mock.example.com"
    }

    fn scrape<'a>(
        &'a self,
        _page: &'a dyn PageSource,
    ) -> BoxFuture<'a, Result<Vec<RawPosting>, AppError>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        let result = match &self.behavior {
            ScrapeBehavior::Postings(postings) => Ok(postings.clone()),
            ScrapeBehavior::AlwaysFail => {
                Err(AppError::ScrapeError("mock scrape failure".to_string()))
            }
            ScrapeBehavior::FailThen(failures, postings) => {
                if call <= *failures {
                    Err(AppError::ScrapeError("mock scrape failure".to_string()))
                } else {
                    Ok(postings.clone())
                }
            }
        };
        Box::pin(async move { result })
    }
}

// ---------------------------------------------------------------------------
// MockJobStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct JobStoreState {
    by_hash: HashMap<String, Uuid>,
    inserted: Vec<NewJobPosting>,
    touched: u32,
    fail_next_insert_unique: bool,
}

/// In-memory job store recording inserts and `last_seen` touches.
#[derive(Clone, Default)]
pub struct MockJobStore {
    state: Arc<Mutex<JobStoreState>>,
}

impl MockJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend a posting with this hash already exists.
    pub fn seed_hash(&self, job_hash: &str) {
        self.state
            .lock()
            .unwrap()
            .by_hash
            .insert(job_hash.to_string(), Uuid::new_v4());
    }

    /// Make the next insert lose a unique-constraint race: the row appears
    /// (another writer inserted it) and the insert itself errors.
    pub fn fail_next_insert_with_unique_violation(&self) {
        self.state.lock().unwrap().fail_next_insert_unique = true;
    }

    pub fn inserted_count(&self) -> usize {
        self.state.lock().unwrap().inserted.len()
    }

    pub fn touched_count(&self) -> u32 {
        self.state.lock().unwrap().touched
    }
}

impl JobStore for MockJobStore {
    async fn find_id_by_hash(&self, job_hash: &str) -> Result<Option<Uuid>, AppError> {
        Ok(self.state.lock().unwrap().by_hash.get(job_hash).copied())
    }

    async fn touch_last_seen(&self, _id: Uuid, _seen_at: DateTime<Utc>) -> Result<(), AppError> {
        self.state.lock().unwrap().touched += 1;
        Ok(())
    }

    async fn insert(&self, posting: &NewJobPosting) -> Result<Uuid, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next_insert_unique {
            state.fail_next_insert_unique = false;
            // The racing writer's row is now visible.
            state
                .by_hash
                .insert(posting.job_hash.clone(), Uuid::new_v4());
            return Err(AppError::UniqueViolation(posting.job_hash.clone()));
        }
        if state.by_hash.contains_key(&posting.job_hash) {
            return Err(AppError::UniqueViolation(posting.job_hash.clone()));
        }
        let id = Uuid::new_v4();
        state.by_hash.insert(posting.job_hash.clone(), id);
        state.inserted.push(posting.clone());
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// MockRunStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RunStoreState {
    created: Vec<Uuid>,
    pointers: Vec<String>,
    progress_writes: u32,
    finalized: Option<(RunStatus, Option<String>)>,
    stale_sweep_called: bool,
}

/// In-memory run store recording the orchestrator's bookkeeping calls.
#[derive(Clone, Default)]
pub struct MockRunStore {
    state: Arc<Mutex<RunStoreState>>,
}

impl MockRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_history(&self) -> Vec<String> {
        self.state.lock().unwrap().pointers.clone()
    }

    pub fn progress_writes(&self) -> u32 {
        self.state.lock().unwrap().progress_writes
    }

    pub fn finalized_status(&self) -> Option<RunStatus> {
        self.state.lock().unwrap().finalized.as_ref().map(|(s, _)| *s)
    }

    pub fn finalized_error_log(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .finalized
            .as_ref()
            .and_then(|(_, log)| log.clone())
    }

    pub fn stale_sweep_called(&self) -> bool {
        self.state.lock().unwrap().stale_sweep_called
    }
}

impl RunStore for MockRunStore {
    async fn create(&self, trigger: Trigger, total_companies: i32) -> Result<ScrapeRun, AppError> {
        let run = ScrapeRun {
            id: Uuid::new_v4(),
            trigger,
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            total_scraped: 0,
            new_jobs: 0,
            updated_jobs: 0,
            companies_scraped: 0,
            companies_failed: 0,
            total_companies,
            current_company: None,
            error_log: None,
            results: None,
        };
        self.state.lock().unwrap().created.push(run.id);
        Ok(run)
    }

    async fn set_current_company(&self, _run_id: Uuid, company: &str) -> Result<(), AppError> {
        self.state.lock().unwrap().pointers.push(company.to_string());
        Ok(())
    }

    async fn record_progress(&self, _run_id: Uuid, _counters: &RunCounters) -> Result<(), AppError> {
        self.state.lock().unwrap().progress_writes += 1;
        Ok(())
    }

    async fn finalize(
        &self,
        _run_id: Uuid,
        status: RunStatus,
        _counters: &RunCounters,
        error_log: Option<&str>,
    ) -> Result<(), AppError> {
        self.state.lock().unwrap().finalized = Some((status, error_log.map(str::to_string)));
        Ok(())
    }

    async fn fail_stale_runs(&self, _threshold_hours: i64) -> Result<u64, AppError> {
        self.state.lock().unwrap().stale_sweep_called = true;
        Ok(0)
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that records a debug rendering of every event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl crate::orchestrator::RunReporter for RecordingReporter {
    fn report(&self, event: crate::orchestrator::RunEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}
