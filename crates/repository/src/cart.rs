//! Cart line storage.

use async_trait::async_trait;
use deadpool_postgres::{Pool, Transaction};
use model::{CartLine, CartLineId, SkuId, UserId};
use tokio_postgres::error::SqlState;
use tracing::warn;

use crate::{PgTxManager, RepositoryError};

/// # CartRepository
///
/// Store for cart lines, one line per (user_id, sku_id).
///
/// Implementations of this trait provide specific storage mechanisms,
/// such as PostgreSQL database access.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Insert or replace the line for (user, sku) and return its id.
    ///
    /// Replace semantics: the stored count becomes `count`, it does not
    /// accumulate. Concurrent interference (the looked-up line vanished, or
    /// a racing insert won the unique constraint) surfaces as
    /// [`RepositoryError::Conflict`] and may be retried.
    async fn upsert_line(
        &self,
        user_id: UserId,
        sku_id: SkuId,
        count: u16,
    ) -> Result<CartLineId, RepositoryError>;

    /// Delete the line for (user, sku); `NotFound` when no line matched.
    async fn delete_line(&self, user_id: UserId, sku_id: SkuId) -> Result<(), RepositoryError>;

    /// All lines in the user's cart. Ordering follows the result set.
    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError>;

    /// Delete every line in the user's cart; `NotFound` when it was empty.
    async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError>;
}

/// Cart repository handle bound to an open transaction.
///
/// Constructed by [`PgTxManager`] per `with_cart_tx` call; not usable
/// after the call returns.
pub struct CartTx<'a> {
    tx: Transaction<'a>,
}

impl<'a> CartTx<'a> {
    pub(crate) fn new(tx: Transaction<'a>) -> Self {
        Self { tx }
    }

    pub(crate) async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(RepositoryError::from)
    }

    /// Rollback failures are logged, not surfaced; the work's error wins.
    pub(crate) async fn rollback(self) {
        if let Err(err) = self.tx.rollback().await {
            warn!(error = %err, "cart transaction rollback failed");
        }
    }

    /// Line id for (user, sku), 0 when no line exists.
    pub async fn line_id(
        &self,
        user_id: UserId,
        sku_id: SkuId,
    ) -> Result<CartLineId, RepositoryError> {
        let query = "SELECT id FROM cart WHERE user_id = $1 AND sku_id = $2";
        let row = self
            .tx
            .query_opt(query, &[&user_id, &i64::from(sku_id)])
            .await?;
        Ok(row.map(|r| r.get("id")).unwrap_or(0))
    }

    pub async fn insert_line(
        &self,
        user_id: UserId,
        sku_id: SkuId,
        count: u16,
    ) -> Result<CartLineId, RepositoryError> {
        let query = "INSERT INTO cart (user_id, sku_id, count) VALUES ($1, $2, $3) RETURNING id";
        let row = self
            .tx
            .query_one(query, &[&user_id, &i64::from(sku_id), &i32::from(count)])
            .await
            .map_err(unique_violation)?;
        Ok(row.get("id"))
    }

    /// Replace the count on an existing line; `NotFound` when the line
    /// vanished between lookup and update.
    pub async fn update_line(
        &self,
        user_id: UserId,
        sku_id: SkuId,
        count: u16,
    ) -> Result<(), RepositoryError> {
        let query = "UPDATE cart SET count = $1 WHERE user_id = $2 AND sku_id = $3";
        let touched = self
            .tx
            .execute(query, &[&i32::from(count), &user_id, &i64::from(sku_id)])
            .await?;
        if touched < 1 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let touched = self
            .tx
            .execute("DELETE FROM cart WHERE user_id = $1", &[&user_id])
            .await?;
        if touched < 1 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Two concurrent upserts for the same (user, sku) can both observe "line
/// absent" and race on the insert; the loser hits the unique constraint.
fn unique_violation(err: tokio_postgres::Error) -> RepositoryError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        RepositoryError::Conflict
    } else {
        RepositoryError::Db(err)
    }
}

/// PostgreSQL implementation of the [`CartRepository`] trait.
///
/// Multi-statement mutations run through [`PgTxManager`]; single-statement
/// operations go straight to the pool.
pub struct PgCartRepository {
    pool: Pool,
    tx: PgTxManager,
}

impl PgCartRepository {
    pub fn new(pool: Pool) -> Self {
        let tx = PgTxManager::new(pool.clone());
        Self { pool, tx }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn upsert_line(
        &self,
        user_id: UserId,
        sku_id: SkuId,
        count: u16,
    ) -> Result<CartLineId, RepositoryError> {
        self.tx
            .with_cart_tx(move |repo| {
                Box::pin(async move {
                    let line_id = repo.line_id(user_id, sku_id).await?;
                    if line_id > 0 {
                        match repo.update_line(user_id, sku_id, count).await {
                            // The looked-up line vanished before the update;
                            // a concurrent delete won the race.
                            Err(RepositoryError::NotFound) => Err(RepositoryError::Conflict),
                            Err(err) => Err(err),
                            Ok(()) => Ok(line_id),
                        }
                    } else {
                        repo.insert_line(user_id, sku_id, count).await
                    }
                })
            })
            .await
    }

    async fn delete_line(&self, user_id: UserId, sku_id: SkuId) -> Result<(), RepositoryError> {
        let client = self.pool.get().await?;
        let query = "DELETE FROM cart WHERE user_id = $1 AND sku_id = $2";
        let touched = client
            .execute(query, &[&user_id, &i64::from(sku_id)])
            .await?;
        if touched < 1 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let client = self.pool.get().await?;
        let query = "SELECT id, user_id, sku_id, count FROM cart WHERE user_id = $1";
        let rows = client.query(query, &[&user_id]).await?;
        rows.into_iter()
            .map(|row| {
                Ok(CartLine {
                    id: row.get("id"),
                    user_id: row.get("user_id"),
                    sku_id: u32::try_from(row.get::<_, i64>("sku_id"))?,
                    count: u16::try_from(row.get::<_, i32>("count"))?,
                })
            })
            .collect()
    }

    async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        self.tx
            .with_cart_tx(move |repo| Box::pin(async move { repo.clear(user_id).await }))
            .await
    }
}
