use chrono::{DateTime, Utc};
use krill_core::error::AppError;
use krill_core::run::{RunCounters, RunStatus, ScrapeRun, Trigger};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Repository for scrape-run persistence in PostgreSQL.
#[derive(Clone)]
pub struct RunRepository {
    pool: Pool<Postgres>,
}

impl RunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a run row, already `running` with its start time stamped.
    pub async fn create(
        &self,
        trigger: Trigger,
        total_companies: i32,
    ) -> Result<ScrapeRun, AppError> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            r#"
            INSERT INTO scrape_runs (triggered_by, status, total_companies)
            VALUES ($1, 'running', $2)
            RETURNING {RUN_COLUMNS}
            "#
        ))
        .bind(trigger.as_str())
        .bind(total_companies)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.try_into()
    }

    /// Move the progress pointer to the company about to be scraped.
    pub async fn set_current_company(&self, run_id: Uuid, company: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE scrape_runs SET current_company = $2 WHERE id = $1")
            .bind(run_id)
            .bind(company)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Flush accumulated counters to the run row mid-flight.
    pub async fn record_progress(
        &self,
        run_id: Uuid,
        counters: &RunCounters,
    ) -> Result<(), AppError> {
        let results = serde_json::to_value(counters)?;
        sqlx::query(
            r#"
            UPDATE scrape_runs
            SET total_scraped = $2, new_jobs = $3, updated_jobs = $4,
                companies_scraped = $5, companies_failed = $6, results = $7
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(counters.total_scraped as i32)
        .bind(counters.new_jobs as i32)
        .bind(counters.duplicates as i32)
        .bind(counters.companies_scraped as i32)
        .bind(counters.companies_failed as i32)
        .bind(results)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Terminal write: stamp completion time and duration, clear the
    /// progress pointer, store final counters and the error log.
    pub async fn finalize(
        &self,
        run_id: Uuid,
        status: RunStatus,
        counters: &RunCounters,
        error_log: Option<&str>,
    ) -> Result<(), AppError> {
        let results = serde_json::to_value(counters)?;
        sqlx::query(
            r#"
            UPDATE scrape_runs
            SET status = $2,
                completed_at = NOW(),
                duration_seconds = EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT,
                current_company = NULL,
                total_scraped = $3, new_jobs = $4, updated_jobs = $5,
                companies_scraped = $6, companies_failed = $7,
                error_log = $8, results = $9
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(counters.total_scraped as i32)
        .bind(counters.new_jobs as i32)
        .bind(counters.duplicates as i32)
        .bind(counters.companies_scraped as i32)
        .bind(counters.companies_failed as i32)
        .bind(error_log)
        .bind(results)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Fail every in-flight run older than `threshold_hours`. The owning
    /// process is presumed dead; a healthy run touches its row after every
    /// company. Returns how many rows were swept.
    pub async fn fail_stale_runs(&self, threshold_hours: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE scrape_runs
            SET status = 'failed',
                completed_at = NOW(),
                duration_seconds = EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT,
                current_company = NULL,
                error_log = COALESCE(error_log || E'\n', '') || 'declared stale and failed'
            WHERE status IN ('pending', 'running')
              AND started_at < NOW() - make_interval(hours => $1)
            "#,
        )
        .bind(threshold_hours as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        let swept = result.rows_affected();
        if swept > 0 {
            tracing::warn!(swept, threshold_hours, "Failed stale runs");
        }
        Ok(swept)
    }

    /// Force-stop every run that claims to be in flight, regardless of age.
    /// External kill switch only: the scraping process is not signalled and
    /// keeps going until it next touches the run row.
    pub async fn force_stop_running(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE scrape_runs
            SET status = 'failed',
                completed_at = NOW(),
                duration_seconds = EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT,
                current_company = NULL,
                error_log = COALESCE(error_log || E'\n', '') || 'force stopped by operator'
            WHERE status IN ('pending', 'running')
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        let stopped = result.rows_affected();
        if stopped > 0 {
            tracing::info!(stopped, "Force-stopped in-flight runs");
        }
        Ok(stopped)
    }

    /// Most recently started run, if any.
    pub async fn latest(&self) -> Result<Option<ScrapeRun>, AppError> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM scrape_runs ORDER BY started_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(ScrapeRun::try_from).transpose()
    }

    /// Fetch one run by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<ScrapeRun>, AppError> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM scrape_runs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(ScrapeRun::try_from).transpose()
    }

    /// Recent runs, newest first.
    pub async fn list(&self, limit: i64) -> Result<Vec<ScrapeRun>, AppError> {
        let rows = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM scrape_runs ORDER BY started_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ScrapeRun::try_from).collect()
    }
}

const RUN_COLUMNS: &str = "id, triggered_by, status, started_at, completed_at, duration_seconds, \
     total_scraped, new_jobs, updated_jobs, companies_scraped, companies_failed, \
     total_companies, current_company, error_log, results";

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    triggered_by: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    total_scraped: i32,
    new_jobs: i32,
    updated_jobs: i32,
    companies_scraped: i32,
    companies_failed: i32,
    total_companies: i32,
    current_company: Option<String>,
    error_log: Option<String>,
    results: Option<serde_json::Value>,
}

impl TryFrom<RunRow> for ScrapeRun {
    type Error = AppError;

    fn try_from(row: RunRow) -> Result<Self, AppError> {
        let trigger: Trigger = row.triggered_by.parse().map_err(AppError::DatabaseError)?;
        let status: RunStatus = row.status.parse().map_err(AppError::DatabaseError)?;
        Ok(ScrapeRun {
            id: row.id,
            trigger,
            status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_seconds: row.duration_seconds,
            total_scraped: row.total_scraped,
            new_jobs: row.new_jobs,
            updated_jobs: row.updated_jobs,
            companies_scraped: row.companies_scraped,
            companies_failed: row.companies_failed,
            total_companies: row.total_companies,
            current_company: row.current_company,
            error_log: row.error_log,
            results: row.results,
        })
    }
}

// -- Trait implementation --

impl krill_core::traits::RunStore for RunRepository {
    async fn create(&self, trigger: Trigger, total_companies: i32) -> Result<ScrapeRun, AppError> {
        RunRepository::create(self, trigger, total_companies).await
    }

    async fn set_current_company(&self, run_id: Uuid, company: &str) -> Result<(), AppError> {
        RunRepository::set_current_company(self, run_id, company).await
    }

    async fn record_progress(&self, run_id: Uuid, counters: &RunCounters) -> Result<(), AppError> {
        RunRepository::record_progress(self, run_id, counters).await
    }

    async fn finalize(
        &self,
        run_id: Uuid,
        status: RunStatus,
        counters: &RunCounters,
        error_log: Option<&str>,
    ) -> Result<(), AppError> {
        RunRepository::finalize(self, run_id, status, counters, error_log).await
    }

    async fn fail_stale_runs(&self, threshold_hours: i64) -> Result<u64, AppError> {
        RunRepository::fail_stale_runs(self, threshold_hours).await
    }
}
