//! Database transaction utilities
//!
//! Read-modify-write document updates run inside a [`TransactionGuard`] so the row
//! lock taken by `SELECT ... FOR UPDATE` is held until the merged body is written.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::document::{DbError, DbResult};

/// A database transaction wrapper with explicit commit/rollback.
///
/// A guard dropped without either is rolled back by sqlx when the connection is
/// returned to the pool.
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> DbResult<Self> {
        let transaction = pool.begin().await?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection to run statements on inside the transaction.
    pub fn conn(&mut self) -> DbResult<&mut PgConnection> {
        self.transaction
            .as_deref_mut()
            .ok_or_else(|| DbError::Unavailable("transaction already finished".to_string()))
    }

    pub async fn commit(mut self) -> DbResult<()> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    pub async fn rollback(mut self) -> DbResult<()> {
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
