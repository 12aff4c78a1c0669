use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use krill_client::{BrowserSettings, ChromeBrowser, registry};
use krill_core::orchestrator::{Orchestrator, TracingRunReporter};
use krill_core::retry::RetryConfig;
use krill_core::run::{
    LIVE_STALE_THRESHOLD_HOURS, RunStatus, ScrapeRun, Trigger, next_scheduled_sweep,
};
use krill_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "krill", version, about = "Deduplicated, classified job-posting catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every company in the registry, in order
    Run {
        /// What started this run: manual, scheduled, or automatic
        #[arg(long, default_value = "manual")]
        trigger: String,
    },

    /// Show the latest run and catalog totals
    Status,

    /// List recent runs
    History {
        /// Number of runs to show
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },

    /// Mark every in-flight run as failed (does not signal the process)
    Stop,

    /// Re-run the classification engine over every stored posting
    Reclassify,

    /// Re-run the location normalizer over every stored posting
    Renormalize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("krill_core=info".parse()?)
                .add_directive("krill_client=info".parse()?)
                .add_directive("krill_db=info".parse()?)
                .add_directive("krill_cli=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { trigger } => {
            let trigger: Trigger = trigger.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let db = connect_db().await?;
            cmd_run(trigger, &db).await?;
        }
        Commands::Status => {
            let db = connect_db().await?;
            cmd_status(&db).await?;
        }
        Commands::History { limit } => {
            let db = connect_db().await?;
            cmd_history(limit, &db).await?;
        }
        Commands::Stop => {
            let db = connect_db().await?;
            let stopped = db
                .run_repo()
                .force_stop_running()
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Stopped {stopped} run(s)");
        }
        Commands::Reclassify => {
            let db = connect_db().await?;
            let changed = db
                .job_repo()
                .reclassify_all()
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Reclassified {changed} posting(s)");
        }
        Commands::Renormalize => {
            let db = connect_db().await?;
            let changed = db
                .job_repo()
                .renormalize_locations()
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            println!("Renormalized {changed} location(s)");
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and run pending migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.map_err(|e| anyhow::anyhow!(e))?;
    Ok(db)
}

async fn cmd_run(trigger: Trigger, db: &Database) -> Result<()> {
    let browser = ChromeBrowser::new(BrowserSettings::from_env());
    let scrapers = registry();
    tracing::info!(companies = scrapers.len(), "Starting sweep");

    let orchestrator = Orchestrator::new(
        browser,
        db.job_repo(),
        db.run_repo(),
        TracingRunReporter,
        RetryConfig::from_env(),
    );

    let summary = orchestrator
        .execute(&scrapers, trigger)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    println!("Run {} finished: {}", summary.run_id, summary.status);
    println!(
        "  companies: {} ok, {} failed",
        summary.counters.companies_scraped, summary.counters.companies_failed
    );
    println!(
        "  postings:  {} scraped, {} new, {} already known",
        summary.counters.total_scraped, summary.counters.new_jobs, summary.counters.duplicates
    );
    if !summary.counters.category_counts.is_empty() {
        println!("  new postings by category:");
        for (category, count) in &summary.counters.category_counts {
            println!("    {category}: {count}");
        }
    }
    Ok(())
}

async fn cmd_status(db: &Database) -> Result<()> {
    db.health_check().await.map_err(|e| anyhow::anyhow!(e))?;

    let runs = db.run_repo();

    let mut latest = runs.latest().await.map_err(|e| anyhow::anyhow!(e))?;

    // A run that hasn't touched its row in hours is dead, whatever it says.
    if let Some(run) = &latest {
        if run.is_stale(Utc::now(), chrono::Duration::hours(LIVE_STALE_THRESHOLD_HOURS)) {
            runs.fail_stale_runs(LIVE_STALE_THRESHOLD_HOURS)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            latest = runs.get(run.id).await.map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    match latest {
        None => println!("No runs recorded"),
        Some(run) => {
            println!("Latest run {} ({})", run.id, run.trigger.as_str());
            println!("  status:   {}", run.status);
            println!("  started:  {}", run.started_at.to_rfc3339());
            if run.status == RunStatus::Running {
                println!("  progress: {}%", run.progress_percent());
                if let Some(company) = &run.current_company {
                    println!("  scraping: {company}");
                }
            } else {
                println!("  duration: {}", format_duration(&run));
            }
            println!(
                "  postings: {} scraped, {} new, {} already known",
                run.total_scraped, run.new_jobs, run.updated_jobs
            );
        }
    }

    let (total, ai_proof) = db
        .job_repo()
        .counts()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("Catalog: {total} posting(s), {ai_proof} AI-proof");
    println!(
        "Next scheduled sweep: {}",
        next_scheduled_sweep(Utc::now()).to_rfc3339()
    );
    Ok(())
}

async fn cmd_history(limit: i64, db: &Database) -> Result<()> {
    let runs = db
        .run_repo()
        .list(limit)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if runs.is_empty() {
        println!("No runs recorded");
        return Ok(());
    }

    for run in runs {
        println!(
            "{}  {:9}  {:9}  {:>3} new, {:>3} known, {}/{} companies  {}",
            run.started_at.format("%Y-%m-%d %H:%M"),
            run.trigger.as_str(),
            run.status.as_str(),
            run.new_jobs,
            run.updated_jobs,
            run.companies_scraped,
            run.total_companies,
            format_duration(&run),
        );
    }
    Ok(())
}

fn format_duration(run: &ScrapeRun) -> String {
    match run.duration_seconds {
        Some(secs) if secs >= 60 => format!("{}m {}s", secs / 60, secs % 60),
        Some(secs) => format!("{secs}s"),
        None => "-".to_string(),
    }
}
