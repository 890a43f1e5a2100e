//! Tests for database initialization

use chronicle_common::db::{init_database, SCHEMA_VERSION};
use tempfile::TempDir;

const TABLES: [&str; 10] = [
    "schema_version",
    "users",
    "sessions",
    "lessons",
    "user_progress",
    "feed_posts",
    "feed_likes",
    "user_saved_posts",
    "achievements",
    "billing_events",
];

#[tokio::test]
async fn test_database_created_with_all_tables() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("chronicle.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());

    for table in TABLES {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_reopening_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("chronicle.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO users (username, password_hash) VALUES ('ada', 'x')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn test_progress_is_unique_per_user_and_lesson() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("chronicle.db")).await.unwrap();

    sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (1, 'ada', 'x')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO lessons (id, title, description, content, era, estimated_minutes) \
         VALUES (1, 't', 'd', 'c', 'ancient', 10)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let insert = "INSERT INTO user_progress (user_id, lesson_id, completed) VALUES (1, 1, 1)";
    sqlx::query(insert).execute(&pool).await.unwrap();
    assert!(sqlx::query(insert).execute(&pool).await.is_err());
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("chronicle.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) \
         VALUES ('t', 99, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_likes_counter_cannot_go_negative() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("chronicle.db")).await.unwrap();

    sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (1, 'ada', 'x')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO feed_posts (id, author_id, title, content) VALUES (1, 1, 't', 'c')")
        .execute(&pool)
        .await
        .unwrap();

    let result = sqlx::query("UPDATE feed_posts SET likes = likes - 1 WHERE id = 1")
        .execute(&pool)
        .await;
    assert!(result.is_err());
}
