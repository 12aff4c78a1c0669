//! Run orchestration: the single sequential sweep over the scraper
//! registry.
//!
//! Companies are scraped strictly in registry order, one at a time. Every
//! fallible step inside the company loop is caught and recorded so that
//! control always reaches finalization; only failures to create or
//! finalize the run row itself abort the sweep.

use chrono::Utc;
use uuid::Uuid;

use crate::classify::classify;
use crate::error::AppError;
use crate::jobtype::classify_job_type;
use crate::location;
use crate::models::{NewJobPosting, RawPosting, description_hash, job_hash};
use crate::retry::{RetryConfig, scrape_with_retry};
use crate::run::{
    CompanyOutcome, RunCounters, RunStatus, STALE_RUN_THRESHOLD_HOURS, Trigger,
};
use crate::traits::{BrowserProvider, JobStore, RunStore, SiteScraper};

/// Events emitted while a run executes, for monitoring/logging.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    StaleRunsSwept {
        count: u64,
    },
    Started {
        run_id: Uuid,
        trigger: Trigger,
        total_companies: usize,
    },
    CompanyStarted {
        company: &'a str,
        index: usize,
        total: usize,
    },
    CompanyFinished {
        company: &'a str,
        outcome: &'a CompanyOutcome,
    },
    PostingFailed {
        company: &'a str,
        title: &'a str,
        error: &'a str,
    },
    Finished {
        run_id: Uuid,
        status: RunStatus,
        new_jobs: u32,
        duplicates: u32,
    },
}

/// Receives run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::StaleRunsSwept { count } => {
                tracing::warn!(count, "Swept stale in-flight runs");
            }
            RunEvent::Started {
                run_id,
                trigger,
                total_companies,
            } => {
                tracing::info!(%run_id, trigger = trigger.as_str(), total_companies, "Run started");
            }
            RunEvent::CompanyStarted {
                company,
                index,
                total,
            } => {
                tracing::info!(%company, index, total, "Scraping company");
            }
            RunEvent::CompanyFinished { company, outcome } => {
                if let Some(error) = &outcome.error {
                    tracing::warn!(%company, %error, "Company failed");
                } else {
                    tracing::info!(
                        %company,
                        scraped = outcome.scraped,
                        new_jobs = outcome.new_jobs,
                        duplicates = outcome.duplicates,
                        "Company finished"
                    );
                }
            }
            RunEvent::PostingFailed {
                company,
                title,
                error,
            } => {
                tracing::warn!(%company, %title, %error, "Posting could not be stored");
            }
            RunEvent::Finished {
                run_id,
                status,
                new_jobs,
                duplicates,
            } => {
                tracing::info!(%run_id, status = status.as_str(), new_jobs, duplicates, "Run finished");
            }
        }
    }
}

/// Summary returned to the caller after a sweep finishes.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub counters: RunCounters,
}

/// Outcome of pushing one raw posting through intake.
enum IntakeOutcome {
    Inserted {
        category: &'static str,
        is_ai_proof: bool,
    },
    Duplicate,
}

/// Drives a full sweep: stale-run recovery, run bookkeeping, the
/// sequential company loop, and dedup intake of every scraped posting.
pub struct Orchestrator<B, J, R, RP> {
    provider: B,
    jobs: J,
    runs: R,
    reporter: RP,
    retry: RetryConfig,
}

impl<B, J, R, RP> Orchestrator<B, J, R, RP>
where
    B: BrowserProvider,
    J: JobStore,
    R: RunStore,
    RP: RunReporter,
{
    pub fn new(provider: B, jobs: J, runs: R, reporter: RP, retry: RetryConfig) -> Self {
        Self {
            provider,
            jobs,
            runs,
            reporter,
            retry,
        }
    }

    /// Execute one sweep over `scrapers`, in order.
    ///
    /// Errors only when the run row itself cannot be created or finalized;
    /// everything inside the company loop is fault-isolated.
    pub async fn execute(
        &self,
        scrapers: &[Box<dyn SiteScraper>],
        trigger: Trigger,
    ) -> Result<RunSummary, AppError> {
        // Recover from a previous crash before claiming to be the live run.
        let swept = self.runs.fail_stale_runs(STALE_RUN_THRESHOLD_HOURS).await?;
        if swept > 0 {
            self.reporter.report(RunEvent::StaleRunsSwept { count: swept });
        }

        let run = self.runs.create(trigger, scrapers.len() as i32).await?;
        self.reporter.report(RunEvent::Started {
            run_id: run.id,
            trigger,
            total_companies: scrapers.len(),
        });

        let mut counters = RunCounters::default();
        let mut error_log: Vec<String> = Vec::new();

        for (index, scraper) in scrapers.iter().enumerate() {
            let company = scraper.company();
            self.reporter.report(RunEvent::CompanyStarted {
                company,
                index: index + 1,
                total: scrapers.len(),
            });

            // Pointer first: if we die mid-scrape the row names the culprit.
            if let Err(e) = self.runs.set_current_company(run.id, company).await {
                tracing::warn!(%company, error = %e, "Could not update progress pointer");
            }

            let postings = scrape_with_retry(scraper.as_ref(), &self.provider, self.retry).await;
            let outcome = self
                .intake_company(company, &postings, &mut counters, &mut error_log)
                .await;

            if let Some(error) = &outcome.error {
                error_log.push(format!("{company}: {error}"));
            }
            self.reporter.report(RunEvent::CompanyFinished {
                company,
                outcome: &outcome,
            });
            counters.record_company(company, outcome);

            // Incremental persistence: a crash after company N keeps the
            // first N companies' results.
            if let Err(e) = self.runs.record_progress(run.id, &counters).await {
                tracing::warn!(%company, error = %e, "Could not persist run progress");
            }
        }

        let status = counters.final_status();
        let joined_log = if error_log.is_empty() {
            None
        } else {
            Some(error_log.join("\n"))
        };
        self.runs
            .finalize(run.id, status, &counters, joined_log.as_deref())
            .await?;

        self.reporter.report(RunEvent::Finished {
            run_id: run.id,
            status,
            new_jobs: counters.new_jobs,
            duplicates: counters.duplicates,
        });

        Ok(RunSummary {
            run_id: run.id,
            status,
            counters,
        })
    }

    /// Push one company's postings through intake. An empty scrape means
    /// the retries were exhausted (or the board really is empty); either
    /// way the company yielded nothing and is recorded as failed.
    async fn intake_company(
        &self,
        company: &str,
        postings: &[RawPosting],
        counters: &mut RunCounters,
        error_log: &mut Vec<String>,
    ) -> CompanyOutcome {
        if postings.is_empty() {
            return CompanyOutcome {
                error: Some("no postings scraped".to_string()),
                ..Default::default()
            };
        }

        let mut outcome = CompanyOutcome {
            scraped: postings.len() as u32,
            ..Default::default()
        };
        for raw in postings {
            match self.process_posting(raw).await {
                Ok(IntakeOutcome::Inserted {
                    category,
                    is_ai_proof,
                }) => {
                    outcome.new_jobs += 1;
                    counters.record_category(category, is_ai_proof);
                }
                Ok(IntakeOutcome::Duplicate) => {
                    outcome.duplicates += 1;
                }
                Err(e) => {
                    let error = e.to_string();
                    self.reporter.report(RunEvent::PostingFailed {
                        company,
                        title: &raw.title,
                        error: &error,
                    });
                    error_log.push(format!("{company} / {}: {error}", raw.title));
                }
            }
        }
        outcome
    }

    /// Dedup intake for a single posting: normalize, hash, look up; known
    /// hash refreshes `last_seen`, unknown hash is classified and inserted.
    /// A unique violation on insert means another writer won a race for the
    /// same posting and is treated as a duplicate.
    async fn process_posting(&self, raw: &RawPosting) -> Result<IntakeOutcome, AppError> {
        let location = location::normalize(&raw.location);
        let hash = job_hash(&raw.company, &raw.title, &location);

        if let Some(id) = self.jobs.find_id_by_hash(&hash).await? {
            self.jobs.touch_last_seen(id, Utc::now()).await?;
            return Ok(IntakeOutcome::Duplicate);
        }

        let classification = classify(&raw.title, &raw.description);
        let job_type = classify_job_type(&raw.title, &raw.description);
        let posting = NewJobPosting {
            job_hash: hash.clone(),
            company: raw.company.clone(),
            title: raw.title.clone(),
            location,
            description: raw.description.clone(),
            description_hash: description_hash(&raw.description),
            source_website: raw.source_website.clone(),
            job_url: raw.job_url.clone(),
            is_ai_proof: classification.is_ai_proof,
            ai_proof_category: classification.category.to_string(),
            job_type: job_type.as_str().to_string(),
            post_date: raw.post_date,
            deadline: raw.deadline,
        };

        match self.jobs.insert(&posting).await {
            Ok(_) => Ok(IntakeOutcome::Inserted {
                category: classification.category,
                is_ai_proof: classification.is_ai_proof,
            }),
            Err(AppError::UniqueViolation(_)) => {
                // Lost the race; the winner's row is the canonical one.
                if let Some(id) = self.jobs.find_id_by_hash(&hash).await? {
                    self.jobs.touch_last_seen(id, Utc::now()).await?;
                }
                Ok(IntakeOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }
}
