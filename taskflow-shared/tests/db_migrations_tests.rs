/// Integration tests for database migrations

use taskflow_shared::db::migrations::{get_migration_status, run_migrations};
use taskflow_shared::db::pool::{close_pool, create_pool, DatabaseConfig};

#[tokio::test]
async fn test_run_migrations() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    let result = run_migrations(&pool).await;
    assert!(result.is_ok(), "Migrations failed: {:?}", result.err());

    let status = get_migration_status(&pool).await.expect("Failed to get migration status");
    assert!(status.applied_migrations > 0, "No migrations were applied");
    assert!(status.is_up_to_date);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_migrations_are_idempotent() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");

    run_migrations(&pool).await.expect("First migration run failed");
    let first = get_migration_status(&pool).await.unwrap();

    run_migrations(&pool).await.expect("Second migration run failed");
    let second = get_migration_status(&pool).await.unwrap();

    assert_eq!(first.applied_migrations, second.applied_migrations);
    assert_eq!(first.latest_version, second.latest_version);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_expected_tables_exist() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'tasks') ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(tables, vec!["tasks".to_string(), "users".to_string()]);

    close_pool(pool).await;
}

#[tokio::test]
async fn test_email_is_unique() {
    let pool = create_pool(DatabaseConfig::in_memory())
        .await
        .expect("Failed to create pool");
    run_migrations(&pool).await.unwrap();

    let insert = "INSERT INTO users (email, password_hash, created_at, updated_at)
                  VALUES ('dup@example.com', 'x', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')";
    sqlx::query(insert).execute(&pool).await.unwrap();

    let err = sqlx::query(insert).execute(&pool).await.unwrap_err();
    match err {
        sqlx::Error::Database(db_err) => assert!(db_err.is_unique_violation()),
        other => panic!("unexpected error: {other:?}"),
    }

    close_pool(pool).await;
}
