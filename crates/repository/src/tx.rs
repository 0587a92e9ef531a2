//! Transaction manager shared by the cart and stock repositories.

use deadpool_postgres::Pool;
use futures::future::BoxFuture;

use crate::cart::CartTx;
use crate::stock::StockTx;
use crate::RepositoryError;

/// Scopes repository work to one database transaction.
///
/// Each `with_*_tx` call opens a fresh transaction on a pooled connection
/// and passes a repository handle bound to it into `work`. The transaction
/// commits only when `work` returns `Ok`; an `Err` rolls it back, and an
/// unwound panic rolls it back through the transaction's drop. The handle
/// is consumed when the call returns.
///
/// Begin and commit failures surface to the caller. Rollback failures are
/// logged and suppressed: the error out of `work` is the one the caller
/// sees.
pub struct PgTxManager {
    pool: Pool,
}

impl PgTxManager {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub async fn with_cart_tx<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t CartTx<'t>) -> BoxFuture<'t, Result<T, RepositoryError>> + Send,
    {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let repo = CartTx::new(tx);
        match work(&repo).await {
            Ok(value) => {
                repo.commit().await?;
                Ok(value)
            }
            Err(err) => {
                repo.rollback().await;
                Err(err)
            }
        }
    }

    pub async fn with_stock_tx<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t StockTx<'t>) -> BoxFuture<'t, Result<T, RepositoryError>> + Send,
    {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let repo = StockTx::new(tx);
        match work(&repo).await {
            Ok(value) => {
                repo.commit().await?;
                Ok(value)
            }
            Err(err) => {
                repo.rollback().await;
                Err(err)
            }
        }
    }
}
