use chrono::{DateTime, Utc};
use krill_core::classify::classify;
use krill_core::error::AppError;
use krill_core::jobtype::classify_job_type;
use krill_core::location::normalize;
use krill_core::models::{JobPosting, NewJobPosting, PostingStatus};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Repository for job-posting persistence in PostgreSQL.
#[derive(Clone)]
pub struct JobRepository {
    pool: Pool<Postgres>,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up a posting id by its dedup hash.
    pub async fn find_id_by_hash(&self, job_hash: &str) -> Result<Option<Uuid>, AppError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM jobs WHERE job_hash = $1")
            .bind(job_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row.map(|r| r.0))
    }

    /// Refresh `last_seen` on an existing posting.
    pub async fn touch_last_seen(&self, id: Uuid, seen_at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET last_seen = $2 WHERE id = $1")
            .bind(id)
            .bind(seen_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Insert a new posting. A unique-constraint hit on `job_hash` maps to
    /// [`AppError::UniqueViolation`] so callers can treat the race as a
    /// duplicate sighting.
    pub async fn insert(&self, posting: &NewJobPosting) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO jobs (
                job_hash, company, title, location, description, description_hash,
                source_website, job_url, is_ai_proof, ai_proof_category, job_type,
                post_date, deadline
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(&posting.job_hash)
        .bind(&posting.company)
        .bind(&posting.title)
        .bind(&posting.location)
        .bind(&posting.description)
        .bind(&posting.description_hash)
        .bind(&posting.source_website)
        .bind(&posting.job_url)
        .bind(posting.is_ai_proof)
        .bind(&posting.ai_proof_category)
        .bind(&posting.job_type)
        .bind(posting.post_date)
        .bind(posting.deadline)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                AppError::UniqueViolation(posting.job_hash.clone())
            }
            _ => AppError::DatabaseError(e.to_string()),
        })?;

        Ok(row.0)
    }

    /// Fetch one posting by id.
    pub async fn get(&self, id: Uuid) -> Result<Option<JobPosting>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(JobPosting::try_from).transpose()
    }

    /// Count stored postings, total and AI-proof.
    pub async fn counts(&self) -> Result<(i64, i64), AppError> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_ai_proof) FROM jobs",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(row)
    }

    /// Re-run the classification engine and job-type classifier over every
    /// stored posting and rewrite rows whose verdict changed. Returns how
    /// many rows changed. This is the sanctioned way classification output
    /// changes after first insert — rule-table edits never rewrite history
    /// on their own.
    pub async fn reclassify_all(&self) -> Result<u64, AppError> {
        let rows: Vec<(Uuid, String, String, bool, String, String)> = sqlx::query_as(
            "SELECT id, title, description, is_ai_proof, ai_proof_category, job_type FROM jobs",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mut changed = 0u64;
        for (id, title, description, was_ai_proof, old_category, old_type) in rows {
            let verdict = classify(&title, &description);
            let job_type = classify_job_type(&title, &description);
            if verdict.is_ai_proof == was_ai_proof
                && verdict.category == old_category
                && job_type.as_str() == old_type
            {
                continue;
            }
            sqlx::query(
                "UPDATE jobs SET is_ai_proof = $2, ai_proof_category = $3, job_type = $4 WHERE id = $1",
            )
            .bind(id)
            .bind(verdict.is_ai_proof)
            .bind(verdict.category)
            .bind(job_type.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            changed += 1;
        }
        tracing::info!(changed, "Reclassification pass finished");
        Ok(changed)
    }

    /// Re-run the location normalizer over every stored posting and rewrite
    /// rows whose canonical form changed. Job hashes are left untouched:
    /// they froze the identity the posting had when first seen.
    pub async fn renormalize_locations(&self) -> Result<u64, AppError> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, location FROM jobs")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let mut changed = 0u64;
        for (id, location) in rows {
            let canonical = normalize(&location);
            if canonical == location {
                continue;
            }
            sqlx::query("UPDATE jobs SET location = $2 WHERE id = $1")
                .bind(id)
                .bind(&canonical)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            changed += 1;
        }
        tracing::info!(changed, "Location renormalization pass finished");
        Ok(changed)
    }
}

const JOB_COLUMNS: &str = "id, job_hash, company, title, location, description, description_hash, \
     source_website, job_url, is_ai_proof, ai_proof_category, job_type, post_date, deadline, \
     status, first_seen, last_seen";

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    job_hash: String,
    company: String,
    title: String,
    location: String,
    description: String,
    description_hash: Option<String>,
    source_website: String,
    job_url: String,
    is_ai_proof: bool,
    ai_proof_category: String,
    job_type: String,
    post_date: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    status: String,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl TryFrom<JobRow> for JobPosting {
    type Error = AppError;

    fn try_from(row: JobRow) -> Result<Self, AppError> {
        let status: PostingStatus = row
            .status
            .parse()
            .map_err(AppError::DatabaseError)?;
        Ok(JobPosting {
            id: row.id,
            job_hash: row.job_hash,
            company: row.company,
            title: row.title,
            location: row.location,
            description: row.description,
            description_hash: row.description_hash,
            source_website: row.source_website,
            job_url: row.job_url,
            is_ai_proof: row.is_ai_proof,
            ai_proof_category: row.ai_proof_category,
            job_type: row.job_type,
            post_date: row.post_date,
            deadline: row.deadline,
            status,
            first_seen: row.first_seen,
            last_seen: row.last_seen,
        })
    }
}

// -- Trait implementation --

impl krill_core::traits::JobStore for JobRepository {
    async fn find_id_by_hash(&self, job_hash: &str) -> Result<Option<Uuid>, AppError> {
        JobRepository::find_id_by_hash(self, job_hash).await
    }

    async fn touch_last_seen(&self, id: Uuid, seen_at: DateTime<Utc>) -> Result<(), AppError> {
        JobRepository::touch_last_seen(self, id, seen_at).await
    }

    async fn insert(&self, posting: &NewJobPosting) -> Result<Uuid, AppError> {
        JobRepository::insert(self, posting).await
    }
}
