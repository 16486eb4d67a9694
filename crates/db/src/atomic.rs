//! Atomic execution of multi-statement repository operations.
//!
//! Any operation that must change more than one row (version restore,
//! snapshot-then-mutate page edits, batch reorder, home-page swap) runs its
//! steps through [`run_atomic`]: the whole sequence commits only if every
//! step succeeds, and any failure rolls back all prior steps so a partially
//! applied state is never observable.

use std::future::Future;
use std::pin::Pin;

use sqlx::{PgPool, Postgres, Transaction};

use crate::error::RepoError;

/// Boxed future type returned by transactional closures.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, RepoError>> + Send + 'c>>;

/// Run `op` inside a single transaction.
///
/// Commits on `Ok`, rolls back and propagates the error unchanged on `Err`.
/// The rollback result is deliberately ignored: the connection is dropped
/// either way and the transaction never became visible.
pub async fn run_atomic<T, F>(pool: &PgPool, op: F) -> Result<T, RepoError>
where
    F: for<'c> FnOnce(&'c mut Transaction<'static, Postgres>) -> TxFuture<'c, T>,
{
    let mut tx = pool.begin().await.map_err(RepoError::Storage)?;
    match op(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(RepoError::Storage)?;
            Ok(value)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}
