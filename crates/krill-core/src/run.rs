//! Scrape run lifecycle model.
//!
//! A run is the durable record of one full sweep across the company
//! registry. Its row doubles as progress checkpoint (current company
//! pointer, incremental counters) so an observer can follow a live run
//! and a crash leaves enough behind to diagnose where it died.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a scrape run.
///
/// `Pending` exists only between row creation and the first progress
/// write inside the same startup sequence; external observers only ever
/// see the other four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    /// Every company succeeded.
    Completed,
    /// Some companies succeeded, some failed.
    Partial,
    /// No company produced results, or the run was stopped/declared stale.
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Partial | RunStatus::Failed
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "partial" => Ok(RunStatus::Partial),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(format!("Unknown run status: {s}")),
        }
    }
}

/// What started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Operator-initiated (CLI).
    Manual,
    /// The weekly Sunday sweep.
    Scheduled,
    /// Started by surrounding automation.
    Automatic,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Scheduled => "scheduled",
            Trigger::Automatic => "automatic",
        }
    }
}

impl std::str::FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Trigger::Manual),
            "scheduled" => Ok(Trigger::Scheduled),
            "automatic" => Ok(Trigger::Automatic),
            _ => Err(format!("Unknown trigger: {s}")),
        }
    }
}

/// Per-company result stored in the run's results payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyOutcome {
    pub scraped: u32,
    pub new_jobs: u32,
    pub duplicates: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counters accumulated while a run executes, flushed to the run row
/// after every company.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCounters {
    pub total_scraped: u32,
    pub new_jobs: u32,
    pub duplicates: u32,
    pub companies_scraped: u32,
    pub companies_failed: u32,
    pub ai_proof_jobs: u32,
    pub excluded_jobs: u32,
    /// New postings per classification category.
    pub category_counts: BTreeMap<String, u32>,
    pub company_results: BTreeMap<String, CompanyOutcome>,
}

impl RunCounters {
    pub fn record_company(&mut self, company: &str, outcome: CompanyOutcome) {
        self.total_scraped += outcome.scraped;
        self.new_jobs += outcome.new_jobs;
        self.duplicates += outcome.duplicates;
        if outcome.error.is_some() {
            self.companies_failed += 1;
        } else {
            self.companies_scraped += 1;
        }
        self.company_results.insert(company.to_string(), outcome);
    }

    pub fn record_category(&mut self, category: &str, is_ai_proof: bool) {
        if is_ai_proof {
            self.ai_proof_jobs += 1;
        } else {
            self.excluded_jobs += 1;
        }
        *self.category_counts.entry(category.to_string()).or_insert(0) += 1;
    }

    /// Terminal status for a finished sweep: all companies succeeded →
    /// completed; all failed → failed; mixed → partial.
    pub fn final_status(&self) -> RunStatus {
        if self.companies_failed == 0 {
            RunStatus::Completed
        } else if self.companies_scraped == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }
}

/// A scrape run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRun {
    pub id: Uuid,
    pub trigger: Trigger,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub total_scraped: i32,
    pub new_jobs: i32,
    pub updated_jobs: i32,
    pub companies_scraped: i32,
    pub companies_failed: i32,
    pub total_companies: i32,
    /// Progress pointer: the company being scraped right now. Written
    /// before each company is attempted, cleared at finalization.
    pub current_company: Option<String>,
    pub error_log: Option<String>,
    /// Per-company outcomes plus the category tally, as JSON.
    pub results: Option<serde_json::Value>,
}

impl ScrapeRun {
    /// Companies finished (succeeded or failed) over total, in percent.
    pub fn progress_percent(&self) -> u32 {
        if self.total_companies <= 0 {
            return 0;
        }
        let done = (self.companies_scraped + self.companies_failed).max(0) as u64;
        ((done * 100) / self.total_companies as u64).min(100) as u32
    }

    /// True if the run claims to be in flight but started longer ago than
    /// `threshold` — the process that owned it is presumed dead.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        matches!(self.status, RunStatus::Pending | RunStatus::Running)
            && now - self.started_at > threshold
    }
}

/// Startup sweep threshold: in-flight runs older than this are declared
/// dead before a new run may start.
pub const STALE_RUN_THRESHOLD_HOURS: i64 = 4;

/// Live-status threshold: a run observed via status polling is declared
/// dead sooner, since a healthy run updates its row after every company.
pub const LIVE_STALE_THRESHOLD_HOURS: i64 = 2;

/// Next scheduled weekly sweep: Sunday 02:00 UTC, strictly after `now`.
pub fn next_scheduled_sweep(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_ahead = (Weekday::Sun.num_days_from_monday() as i64
        - now.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let mut candidate = (now + Duration::days(days_ahead)).date_naive();
    let mut at = Utc
        .from_utc_datetime(&candidate.and_hms_opt(2, 0, 0).unwrap_or_default());
    if at <= now {
        candidate += Duration::days(7);
        at = Utc.from_utc_datetime(&candidate.and_hms_opt(2, 0, 0).unwrap_or_default());
    }
    at
}
