use krill_core::run::{CompanyOutcome, RunCounters, RunStatus, Trigger};
use krill_db::RunRepository;

use crate::common::setup_test_db;

fn counters_for(companies: &[(&str, bool)]) -> RunCounters {
    let mut counters = RunCounters::default();
    for (company, ok) in companies {
        let outcome = if *ok {
            CompanyOutcome {
                scraped: 5,
                new_jobs: 3,
                duplicates: 2,
                error: None,
            }
        } else {
            CompanyOutcome {
                error: Some("no postings scraped".to_string()),
                ..Default::default()
            }
        };
        counters.record_company(company, outcome);
    }
    counters
}

#[tokio::test]
async fn test_create_starts_running() {
    let (pool, _container) = setup_test_db().await;
    let repo = RunRepository::new(pool);

    let run = repo.create(Trigger::Manual, 4).await.unwrap();
    assert_eq!(run.status, RunStatus::Running);
    assert_eq!(run.trigger, Trigger::Manual);
    assert_eq!(run.total_companies, 4);
    assert!(run.completed_at.is_none());
    assert!(run.current_company.is_none());
}

#[tokio::test]
async fn test_progress_writes_are_visible() {
    let (pool, _container) = setup_test_db().await;
    let repo = RunRepository::new(pool);

    let run = repo.create(Trigger::Manual, 2).await.unwrap();
    repo.set_current_company(run.id, "Evercore").await.unwrap();
    repo.record_progress(run.id, &counters_for(&[("Evercore", true)]))
        .await
        .unwrap();

    let live = repo.get(run.id).await.unwrap().unwrap();
    assert_eq!(live.status, RunStatus::Running);
    assert_eq!(live.current_company.as_deref(), Some("Evercore"));
    assert_eq!(live.total_scraped, 5);
    assert_eq!(live.new_jobs, 3);
    assert_eq!(live.updated_jobs, 2);
    assert_eq!(live.companies_scraped, 1);
    assert_eq!(live.progress_percent(), 50);
}

#[tokio::test]
async fn test_finalize_stamps_and_clears_pointer() {
    let (pool, _container) = setup_test_db().await;
    let repo = RunRepository::new(pool);

    let run = repo.create(Trigger::Scheduled, 2).await.unwrap();
    repo.set_current_company(run.id, "Lazard").await.unwrap();

    let counters = counters_for(&[("Evercore", true), ("Lazard", false)]);
    let status = counters.final_status();
    repo.finalize(run.id, status, &counters, Some("Lazard: no postings scraped"))
        .await
        .unwrap();

    let done = repo.get(run.id).await.unwrap().unwrap();
    assert_eq!(done.status, RunStatus::Partial);
    assert!(done.completed_at.is_some());
    assert!(done.duration_seconds.is_some());
    assert!(done.current_company.is_none());
    assert_eq!(done.companies_failed, 1);
    assert!(done.error_log.unwrap().contains("Lazard"));

    // Per-company outcomes round-trip through the JSONB results column.
    let results = done.results.unwrap();
    assert_eq!(results["company_results"]["Evercore"]["new_jobs"], 3);
}

#[tokio::test]
async fn test_fail_stale_runs_only_sweeps_old_in_flight() {
    let (pool, _container) = setup_test_db().await;
    let repo = RunRepository::new(pool.clone());

    let stuck = repo.create(Trigger::Manual, 3).await.unwrap();
    sqlx::query("UPDATE scrape_runs SET started_at = NOW() - interval '5 hours' WHERE id = $1")
        .bind(stuck.id)
        .execute(&pool)
        .await
        .unwrap();

    let fresh = repo.create(Trigger::Manual, 3).await.unwrap();

    let swept = repo.fail_stale_runs(4).await.unwrap();
    assert_eq!(swept, 1);

    let stuck = repo.get(stuck.id).await.unwrap().unwrap();
    assert_eq!(stuck.status, RunStatus::Failed);
    assert!(stuck.completed_at.is_some());
    assert!(stuck.error_log.unwrap().contains("stale"));

    let fresh = repo.get(fresh.id).await.unwrap().unwrap();
    assert_eq!(fresh.status, RunStatus::Running);
}

#[tokio::test]
async fn test_force_stop_flips_running_to_failed() {
    let (pool, _container) = setup_test_db().await;
    let repo = RunRepository::new(pool);

    let run = repo.create(Trigger::Manual, 1).await.unwrap();
    let stopped = repo.force_stop_running().await.unwrap();
    assert_eq!(stopped, 1);

    let run = repo.get(run.id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_log.unwrap().contains("force stopped"));

    // Terminal runs are left alone.
    assert_eq!(repo.force_stop_running().await.unwrap(), 0);
}

#[tokio::test]
async fn test_latest_and_list_order() {
    let (pool, _container) = setup_test_db().await;
    let repo = RunRepository::new(pool.clone());

    let first = repo.create(Trigger::Manual, 1).await.unwrap();
    sqlx::query("UPDATE scrape_runs SET started_at = NOW() - interval '1 hour' WHERE id = $1")
        .bind(first.id)
        .execute(&pool)
        .await
        .unwrap();
    let second = repo.create(Trigger::Scheduled, 1).await.unwrap();

    let latest = repo.latest().await.unwrap().unwrap();
    assert_eq!(latest.id, second.id);

    let runs = repo.list(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].id, second.id);
    assert_eq!(runs[1].id, first.id);
}
