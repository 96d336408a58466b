//! Database repositories for data access layer
//!
//! `MediaRepository` owns the `image` table, `TagRepository` owns `tag` and the
//! `image_tag` association table. Methods ending in `_tx` run inside a caller
//! supplied transaction so the catalog can commit a whole ingest or delete at
//! once.

pub mod media;
pub mod pool;
pub mod tag;
pub mod transaction;

pub use media::MediaRepository;
pub use pool::{connect, MIGRATOR};
pub use tag::TagRepository;
pub use transaction::TransactionGuard;

/// True when `err` is a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
pub(crate) mod test_support {
    use boardy_core::Config;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Fresh migrated database in a temporary directory.
    pub async fn pool() -> (TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_root(dir.path());
        let pool = super::connect(&config).await.unwrap();
        (dir, pool)
    }
}
