//! Stock row and catalog storage.

use async_trait::async_trait;
use deadpool_postgres::{Pool, Transaction};
use model::{ItemInfo, Sku, SkuId, StockRow, StockRowId, UserId};
use tokio_postgres::Row;
use tracing::warn;

use crate::{PgTxManager, RepositoryError};

/// Input of a restock mutation: a stock row without its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStock {
    pub sku_id: SkuId,
    pub user_id: UserId,
    pub count: u16,
    pub price: u32,
    pub location: String,
}

/// Outcome of a restock mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpsert {
    /// First stock row for the SKU; carries the stored count.
    Created { new_count: u16 },
    /// An owned row was restocked; carries the accumulated count.
    Restocked { new_count: u16 },
    /// The row belongs to a different owner; nothing was written.
    ForeignOwner,
}

/// Parameters of the paginated location listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    pub user_id: UserId,
    pub location: String,
    pub limit: i64,
    pub offset: i64,
}

/// # StockRepository
///
/// Store for the SKU catalog and per-owner inventory rows, one row per
/// (sku_id, user_id).
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Restock (sku, user): insert the first row for the SKU, or accumulate
    /// `count` onto a row with matching ownership, replacing price and
    /// location. `NotFound` when the SKU is not in the catalog.
    async fn add_stock(&self, stock: &NewStock) -> Result<StockUpsert, RepositoryError>;

    /// Delete the row for (sku, user); `NotFound` when no row matched.
    async fn delete_row(&self, sku_id: SkuId, user_id: UserId) -> Result<(), RepositoryError>;

    /// Catalog row joined with its stock row. `NotFound` only when the SKU
    /// record is absent; stock fields are zeroed when no stock row exists.
    async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, RepositoryError>;

    /// Stocked items for one owner and location, paginated. Rows without
    /// stock do not appear.
    async fn items_by_location(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<ItemInfo>, RepositoryError>;
}

/// Stock repository handle bound to an open transaction.
pub struct StockTx<'a> {
    tx: Transaction<'a>,
}

impl<'a> StockTx<'a> {
    pub(crate) fn new(tx: Transaction<'a>) -> Self {
        Self { tx }
    }

    pub(crate) async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(RepositoryError::from)
    }

    pub(crate) async fn rollback(self) {
        if let Err(err) = self.tx.rollback().await {
            warn!(error = %err, "stock transaction rollback failed");
        }
    }

    /// Catalog row for the SKU, `NotFound` when absent.
    pub async fn sku(&self, sku_id: SkuId) -> Result<Sku, RepositoryError> {
        let query = "SELECT sku_id, name, type FROM sku WHERE sku_id = $1";
        let row = self
            .tx
            .query_opt(query, &[&i64::from(sku_id)])
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(Sku {
            sku_id: u32::try_from(row.get::<_, i64>("sku_id"))?,
            name: row.get("name"),
            kind: row.get("type"),
        })
    }

    /// The SKU's stock row, locked for the rest of the transaction so a
    /// concurrent restock cannot lose the accumulated count.
    pub async fn stock_for_update(
        &self,
        sku_id: SkuId,
    ) -> Result<Option<StockRow>, RepositoryError> {
        let query = r#"
            SELECT id, sku_id, count, price, location, user_id
            FROM stock WHERE sku_id = $1
            FOR UPDATE
        "#;
        match self.tx.query_opt(query, &[&i64::from(sku_id)]).await? {
            Some(row) => Ok(Some(stock_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn insert_stock(&self, stock: &NewStock) -> Result<(), RepositoryError> {
        let query = r#"
            INSERT INTO stock (sku_id, count, price, location, user_id)
            VALUES ($1, $2, $3, $4, $5)
        "#;
        self.tx
            .execute(
                query,
                &[
                    &i64::from(stock.sku_id),
                    &i32::from(stock.count),
                    &i64::from(stock.price),
                    &stock.location,
                    &stock.user_id,
                ],
            )
            .await?;
        Ok(())
    }

    /// Accumulated update of an owned row: `count` is the new total, price
    /// and location replace the stored values.
    pub async fn update_stock(
        &self,
        id: StockRowId,
        count: u16,
        price: u32,
        location: &str,
    ) -> Result<(), RepositoryError> {
        let query = "UPDATE stock SET count = $1, price = $2, location = $3 WHERE id = $4";
        let touched = self
            .tx
            .execute(
                query,
                &[&i32::from(count), &i64::from(price), &location, &id],
            )
            .await?;
        if touched < 1 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn stock_row(row: &Row) -> Result<StockRow, RepositoryError> {
    Ok(StockRow {
        id: row.get("id"),
        sku_id: u32::try_from(row.get::<_, i64>("sku_id"))?,
        count: u16::try_from(row.get::<_, i32>("count"))?,
        price: u32::try_from(row.get::<_, i64>("price"))?,
        location: row.get("location"),
        user_id: row.get("user_id"),
    })
}

/// One row of the sku ⟕ stock join; stock columns may be NULL.
fn item_info(row: &Row) -> Result<ItemInfo, RepositoryError> {
    Ok(ItemInfo {
        sku_id: u32::try_from(row.get::<_, i64>("sku_id"))?,
        name: row.get("name"),
        kind: row.get("type"),
        count: match row.get::<_, Option<i32>>("count") {
            Some(count) => u16::try_from(count)?,
            None => 0,
        },
        price: match row.get::<_, Option<i64>>("price") {
            Some(price) => u32::try_from(price)?,
            None => 0,
        },
        location: row.get::<_, Option<String>>("location").unwrap_or_default(),
        user_id: row.get::<_, Option<i64>>("user_id").unwrap_or_default(),
    })
}

/// PostgreSQL implementation of the [`StockRepository`] trait.
pub struct PgStockRepository {
    pool: Pool,
    tx: PgTxManager,
}

impl PgStockRepository {
    pub fn new(pool: Pool) -> Self {
        let tx = PgTxManager::new(pool.clone());
        Self { pool, tx }
    }
}

#[async_trait]
impl StockRepository for PgStockRepository {
    async fn add_stock(&self, stock: &NewStock) -> Result<StockUpsert, RepositoryError> {
        let stock = stock.clone();
        self.tx
            .with_stock_tx(move |repo| {
                Box::pin(async move {
                    repo.sku(stock.sku_id).await?;
                    match repo.stock_for_update(stock.sku_id).await? {
                        None => {
                            repo.insert_stock(&stock).await?;
                            Ok(StockUpsert::Created {
                                new_count: stock.count,
                            })
                        }
                        Some(existing) if existing.user_id == stock.user_id => {
                            let new_count = u16::try_from(
                                u32::from(existing.count) + u32::from(stock.count),
                            )?;
                            repo.update_stock(existing.id, new_count, stock.price, &stock.location)
                                .await?;
                            Ok(StockUpsert::Restocked { new_count })
                        }
                        Some(_) => Ok(StockUpsert::ForeignOwner),
                    }
                })
            })
            .await
    }

    async fn delete_row(&self, sku_id: SkuId, user_id: UserId) -> Result<(), RepositoryError> {
        let client = self.pool.get().await?;
        let query = "DELETE FROM stock WHERE sku_id = $1 AND user_id = $2";
        let touched = client
            .execute(query, &[&i64::from(sku_id), &user_id])
            .await?;
        if touched < 1 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, RepositoryError> {
        let client = self.pool.get().await?;
        let query = r#"
            SELECT s.sku_id, s.name, s.type, st.count, st.price, st.location, st.user_id
            FROM sku s LEFT JOIN stock st ON st.sku_id = s.sku_id
            WHERE s.sku_id = $1
        "#;
        let row = client
            .query_opt(query, &[&i64::from(sku_id)])
            .await?
            .ok_or(RepositoryError::NotFound)?;
        item_info(&row)
    }

    async fn items_by_location(
        &self,
        query: &LocationQuery,
    ) -> Result<Vec<ItemInfo>, RepositoryError> {
        let client = self.pool.get().await?;
        let sql = r#"
            SELECT s.sku_id, s.name, s.type, st.count, st.price, st.location, st.user_id
            FROM sku s INNER JOIN stock st ON st.sku_id = s.sku_id
            WHERE st.location = $1 AND st.user_id = $2
            ORDER BY s.sku_id
            LIMIT $3 OFFSET $4
        "#;
        let rows = client
            .query(
                sql,
                &[&query.location, &query.user_id, &query.limit, &query.offset],
            )
            .await?;
        rows.iter().map(item_info).collect()
    }
}
