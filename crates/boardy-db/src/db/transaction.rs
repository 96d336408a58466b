//! Database transaction utilities
//!
//! This module provides utilities for working with database transactions,
//! particularly for multi-step catalog mutations that need atomicity.

use boardy_core::AppError;
use sqlx::{Sqlite, SqlitePool, Transaction};

/// A database transaction wrapper that makes unfinished transactions visible
///
/// sqlx rolls a dropped transaction back on its own; the guard adds a warning
/// so a code path that forgets to commit shows up in the logs.
///
/// # Example
///
/// ```ignore
/// use boardy_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::SqlitePool) -> Result<(), boardy_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("INSERT INTO tag (name) VALUES ('x')")
///         .execute(&mut **tx.transaction()?)
///         .await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Sqlite>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &SqlitePool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;

        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// The underlying transaction, for passing to repository `_tx` methods.
    pub fn transaction(&mut self) -> Result<&mut Transaction<'static, Sqlite>, AppError> {
        self.transaction.as_mut().ok_or_else(|| {
            AppError::Internal("Transaction was already committed or rolled back".to_string())
        })
    }

    /// Commit the transaction
    ///
    /// After calling this, the transaction is consumed and cannot be used further.
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Rollback the transaction
    ///
    /// After calling this, the transaction is consumed and cannot be used further.
    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    async fn tag_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM tag")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let (_dir, pool) = test_support::pool().await;

        let mut tx = TransactionGuard::begin(&pool).await.unwrap();
        sqlx::query("INSERT INTO tag (name) VALUES ('kept')")
            .execute(&mut **tx.transaction().unwrap())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(tag_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard() {
        let (_dir, pool) = test_support::pool().await;

        let mut tx = TransactionGuard::begin(&pool).await.unwrap();
        sqlx::query("INSERT INTO tag (name) VALUES ('gone')")
            .execute(&mut **tx.transaction().unwrap())
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = TransactionGuard::begin(&pool).await.unwrap();
            sqlx::query("INSERT INTO tag (name) VALUES ('dropped')")
                .execute(&mut **tx.transaction().unwrap())
                .await
                .unwrap();
        }

        assert_eq!(tag_count(&pool).await, 0);
    }
}
