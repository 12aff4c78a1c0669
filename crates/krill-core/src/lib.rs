pub mod classify;
pub mod error;
pub mod jobtype;
pub mod location;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod rules;
pub mod run;
pub mod testutil;
pub mod traits;

pub use classify::{Classification, classify};
pub use error::AppError;
pub use jobtype::{JobType, classify_job_type};
pub use location::normalize as normalize_location;
pub use models::{JobPosting, NewJobPosting, RawPosting, description_hash, job_hash};
pub use orchestrator::{Orchestrator, RunReporter, RunSummary, TracingRunReporter};
pub use retry::{RetryConfig, scrape_with_retry};
pub use run::{RunStatus, ScrapeRun, Trigger};
pub use traits::{BrowserProvider, BrowserSession, JobStore, PageSource, RunStore, SiteScraper};
