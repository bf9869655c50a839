//! Integration tests for database initialization
//!
//! Covers automatic database creation, pragma configuration, seed data, and
//! idempotent/concurrent re-initialization.

use bookshelf_common::db::init::init_database;
use std::path::PathBuf;

fn temp_db_path(tag: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/bookshelf-test-{}-{}.db", tag, std::process::id()))
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let db_path = temp_db_path("create");
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "database file was not created");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_database_opens_existing() {
    let db_path = temp_db_path("existing");
    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "failed to reopen: {:?}", pool2.err());

    drop(pool1);
    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_all_tables_created() {
    let db_path = temp_db_path("tables");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    for table in ["books", "genres", "publishers", "formats", "platforms", "book_platforms"] {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(exists, 1, "table '{}' not created", table);
    }

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_default_lookup_rows_seeded() {
    let db_path = temp_db_path("seed");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let genre_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(genre_count >= 5, "expected seeded genres, got {}", genre_count);

    let platform_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM platforms")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(platform_count >= 5, "expected seeded platforms, got {}", platform_count);

    let publisher_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM publishers")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(publisher_count >= 4, "expected seeded publishers, got {}", publisher_count);

    let fantasy: Option<String> =
        sqlx::query_scalar("SELECT name FROM genres WHERE name = 'Fantasy'")
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert!(fantasy.is_some(), "Fantasy genre not seeded");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let db_path = temp_db_path("idempotent");
    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await.unwrap();
    let count1: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
        .fetch_one(&pool1)
        .await
        .unwrap();
    drop(pool1);

    let pool2 = init_database(&db_path).await.unwrap();
    let count2: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(count1, count2, "seed row count changed on re-initialization");

    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let db_path = temp_db_path("fk");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let fk_enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(fk_enabled, 1, "foreign keys should be enabled");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_busy_timeout_set() {
    let db_path = temp_db_path("timeout");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let timeout: i64 = sqlx::query_scalar("PRAGMA busy_timeout")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(timeout, 5000, "busy timeout should be 5000ms");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_concurrent_initialization() {
    let db_path = temp_db_path("concurrent");
    let _ = std::fs::remove_file(&db_path);

    let mut handles = vec![];
    for _ in 0..5 {
        let db_path_clone = db_path.clone();
        handles.push(tokio::spawn(async move { init_database(&db_path_clone).await }));
    }

    let mut results = vec![];
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    for result in &results {
        assert!(result.is_ok(), "concurrent initialization failed: {:?}", result);
    }

    // Seed rows must not be duplicated by racing initializers
    let pool = results[0].as_ref().unwrap();
    let dupes: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT name FROM genres GROUP BY name HAVING COUNT(*) > 1)",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(dupes, 0, "duplicate seed rows after concurrent init");

    for result in results {
        drop(result);
    }
    let _ = std::fs::remove_file(&db_path);
}
