//! Tests for database initialization

use genji_common::db::{init_database, init_memory_database};

const TABLES: [&str; 11] = [
    "users",
    "maps",
    "map_types",
    "map_mechanics",
    "map_restrictions",
    "map_creators",
    "map_ratings",
    "guides",
    "map_medals",
    "map_submission_dates",
    "records",
];

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("genji.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("genji.db");

    let first = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO users (user_id, nickname) VALUES (1, 'Genji')")
        .execute(&first)
        .await
        .unwrap();
    first.close().await;

    let second = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&second)
        .await
        .unwrap();
    assert_eq!(count, 1, "Re-initialization must keep existing rows");
}

#[tokio::test]
async fn test_all_tables_created() {
    let pool = init_memory_database().await.unwrap();

    for table in TABLES {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(exists, 1, "table {} missing", table);
    }
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query("INSERT INTO map_types (map_code, map_type) VALUES ('NOPE', 'Classic')")
        .execute(&pool)
        .await;

    assert!(result.is_err(), "child row without a map must be rejected");
}

#[tokio::test]
async fn test_user_defaults() {
    let pool = init_memory_database().await.unwrap();
    sqlx::query("INSERT INTO users (user_id, nickname) VALUES (42, 'Hanzo')")
        .execute(&pool)
        .await
        .unwrap();

    let (rank, rank_plus, alertable): (i64, i64, bool) =
        sqlx::query_as("SELECT rank, rank_plus, alertable FROM users WHERE user_id = 42")
            .fetch_one(&pool)
            .await
            .unwrap();

    assert_eq!((rank, rank_plus), (0, 0));
    assert!(alertable);
}
