use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// In-memory store for tests. A single connection keeps every query on the
/// same in-memory database.
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    crate::MIGRATOR.run(&pool).await.expect("migrations");
    pool
}
