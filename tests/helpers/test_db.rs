use postboard::infrastructure::persistence::Database;

/// Fresh SQLite database in a throwaway file, migrated
pub async fn setup_test_db() -> Database {
    // Unique file per test for parallel execution
    let path = std::env::temp_dir().join(format!("postboard_test_{}.db", uuid::Uuid::new_v4()));
    let db_url = format!("sqlite://{}?mode=rwc", path.display());

    let db = Database::connect(&db_url)
        .await
        .expect("Failed to connect to test database");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    db
}
