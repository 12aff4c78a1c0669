use chrono::{Duration, Utc};
use krill_core::error::AppError;
use krill_db::{Database, JobRepository};

use crate::common::{posting, setup_test_db};

#[tokio::test]
async fn test_database_facade_vends_working_repos() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);

    db.health_check().await.unwrap();

    let p = posting("Evercore", "M&A Analyst", "US - New York");
    let id = db.job_repo().insert(&p).await.unwrap();
    assert_eq!(db.job_repo().find_id_by_hash(&p.job_hash).await.unwrap(), Some(id));

    // The raw pool is reachable for ad-hoc queries.
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(row.0, 1);
}

#[tokio::test]
async fn test_insert_and_find_by_hash() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let p = posting("Evercore", "M&A Analyst", "US - New York");
    let id = repo.insert(&p).await.unwrap();

    let found = repo.find_id_by_hash(&p.job_hash).await.unwrap();
    assert_eq!(found, Some(id));

    let missing = repo.find_id_by_hash("no-such-hash").await.unwrap();
    assert!(missing.is_none());

    let stored = repo.get(id).await.unwrap().unwrap();
    assert_eq!(stored.company, "Evercore");
    assert_eq!(stored.ai_proof_category, "Sales & Trading");
    assert!(stored.description_hash.is_some());
    assert_eq!(stored.first_seen, stored.last_seen);
}

#[tokio::test]
async fn test_duplicate_hash_is_unique_violation() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let p = posting("Evercore", "M&A Analyst", "US - New York");
    repo.insert(&p).await.unwrap();

    // Same identity triple, different URL — still the same posting.
    let mut racing = posting("Evercore", "M&A Analyst", "US - New York");
    racing.job_url = "https://test.example.com/rotated-url".to_string();
    let err = repo.insert(&racing).await.unwrap_err();
    assert!(matches!(err, AppError::UniqueViolation(_)));
}

#[tokio::test]
async fn test_touch_last_seen() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    let p = posting("Lazard", "Restructuring Associate", "UK - London");
    let id = repo.insert(&p).await.unwrap();
    let before = repo.get(id).await.unwrap().unwrap();

    let later = Utc::now() + Duration::hours(1);
    repo.touch_last_seen(id, later).await.unwrap();

    let after = repo.get(id).await.unwrap().unwrap();
    assert!(after.last_seen > before.last_seen);
    // first_seen is immutable.
    assert_eq!(after.first_seen, before.first_seen);
}

#[tokio::test]
async fn test_reclassify_rewrites_stale_verdicts() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    // Stored with a verdict the current rules would not produce.
    let mut p = posting("Point72", "Equity Trader", "US - Stamford");
    p.is_ai_proof = false;
    p.ai_proof_category = "EXCLUDED".to_string();
    let id = repo.insert(&p).await.unwrap();

    // And one already correct.
    let p2 = posting("Point72", "Execution Trader", "China - Hong Kong");
    repo.insert(&p2).await.unwrap();

    let changed = repo.reclassify_all().await.unwrap();
    assert_eq!(changed, 1);

    let fixed = repo.get(id).await.unwrap().unwrap();
    assert!(fixed.is_ai_proof);
    assert_eq!(fixed.ai_proof_category, "Sales & Trading");

    // A second pass is a no-op.
    assert_eq!(repo.reclassify_all().await.unwrap(), 0);
}

#[tokio::test]
async fn test_renormalize_updates_location_but_not_hash() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    // Rows stored before normalization existed, one with a hyphenated
    // city name.
    let p = posting("DRW", "Options Trader", "New York, NY 10019");
    let id = repo.insert(&p).await.unwrap();
    let hyphenated = posting("DRW", "Credit Trader", "Winston-Salem, NC");
    let hyphenated_id = repo.insert(&hyphenated).await.unwrap();

    let changed = repo.renormalize_locations().await.unwrap();
    assert_eq!(changed, 2);

    let row = repo.get(id).await.unwrap().unwrap();
    assert_eq!(row.location, "US - New York");
    // Identity frozen at first sighting.
    assert_eq!(row.job_hash, p.job_hash);

    let row = repo.get(hyphenated_id).await.unwrap().unwrap();
    assert_eq!(row.location, "US - Winston-Salem");

    // Normalization is idempotent, so a second pass changes nothing.
    assert_eq!(repo.renormalize_locations().await.unwrap(), 0);
}

#[tokio::test]
async fn test_counts() {
    let (pool, _container) = setup_test_db().await;
    let repo = JobRepository::new(pool);

    repo.insert(&posting("Evercore", "M&A Analyst", "US - New York"))
        .await
        .unwrap();
    let mut excluded = posting("Evercore", "Receptionist", "US - New York");
    excluded.is_ai_proof = false;
    excluded.ai_proof_category = "EXCLUDED".to_string();
    repo.insert(&excluded).await.unwrap();

    let (total, ai_proof) = repo.counts().await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(ai_proof, 1);
}
