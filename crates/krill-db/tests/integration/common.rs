use krill_core::models::{NewJobPosting, description_hash, job_hash};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// SQL migration statements, executed one at a time.
const MIGRATIONS: &[&str] = &[
    // 0001_create_jobs.sql
    r#"CREATE TABLE IF NOT EXISTS jobs (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        job_hash VARCHAR(64) NOT NULL UNIQUE,
        company VARCHAR NOT NULL,
        title VARCHAR NOT NULL,
        location VARCHAR NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        description_hash VARCHAR(64),
        source_website VARCHAR NOT NULL,
        job_url VARCHAR NOT NULL,
        is_ai_proof BOOLEAN NOT NULL DEFAULT FALSE,
        ai_proof_category VARCHAR(50) NOT NULL DEFAULT 'EXCLUDED',
        job_type VARCHAR(20) NOT NULL DEFAULT 'Full Time',
        post_date TIMESTAMPTZ,
        deadline TIMESTAMPTZ,
        status VARCHAR(20) NOT NULL DEFAULT 'active',
        first_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_seen TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        CONSTRAINT chk_jobs_status CHECK (status IN ('active', 'inactive'))
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_category ON jobs(ai_proof_category) WHERE is_ai_proof"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_last_seen ON jobs(last_seen DESC)"#,
    // 0002_create_scrape_runs.sql
    r#"CREATE TABLE IF NOT EXISTS scrape_runs (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        triggered_by VARCHAR(20) NOT NULL DEFAULT 'manual',
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        completed_at TIMESTAMPTZ,
        duration_seconds BIGINT,
        total_scraped INTEGER NOT NULL DEFAULT 0,
        new_jobs INTEGER NOT NULL DEFAULT 0,
        updated_jobs INTEGER NOT NULL DEFAULT 0,
        companies_scraped INTEGER NOT NULL DEFAULT 0,
        companies_failed INTEGER NOT NULL DEFAULT 0,
        total_companies INTEGER NOT NULL DEFAULT 0,
        current_company VARCHAR,
        error_log TEXT,
        results JSONB,
        CONSTRAINT chk_scrape_runs_status CHECK (
            status IN ('pending', 'running', 'completed', 'partial', 'failed')
        ),
        CONSTRAINT chk_scrape_runs_trigger CHECK (
            triggered_by IN ('manual', 'scheduled', 'automatic')
        )
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_scrape_runs_started ON scrape_runs(started_at DESC)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_scrape_runs_in_flight ON scrape_runs(started_at)
        WHERE status IN ('pending', 'running')"#,
];

/// Spins up a PostgreSQL container and returns a connected pool.
///
/// The `ContainerAsync` must be kept in scope for the test duration —
/// dropping it will stop the container.
pub async fn setup_test_db() -> (PgPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "krill_test")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{host}:{port}/krill_test");

    // Retry connection until container is fully ready
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!("Failed to connect to database after {MAX_RETRIES} retries: {e}");
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    // Run migrations one statement at a time
    for migration in MIGRATIONS {
        sqlx::query(migration)
            .execute(&pool)
            .await
            .expect("Migration failed");
    }

    (pool, container)
}

/// Builds an insert-ready posting with a consistent hash.
pub fn posting(company: &str, title: &str, location: &str) -> NewJobPosting {
    let description = format!("{title} role at {company}");
    NewJobPosting {
        job_hash: job_hash(company, title, location),
        company: company.to_string(),
        title: title.to_string(),
        location: location.to_string(),
        description: description.clone(),
        description_hash: description_hash(&description),
        source_website: "test.example.com".to_string(),
        job_url: format!("https://test.example.com/{company}/{title}"),
        is_ai_proof: true,
        ai_proof_category: "Sales & Trading".to_string(),
        job_type: "Full Time".to_string(),
        post_date: None,
        deadline: None,
    }
}
