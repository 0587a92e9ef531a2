//! # Data Repository Layer
//!
//! Repository traits and PostgreSQL implementations for the cart and stock
//! stores, plus the transaction manager that scopes read-modify-write
//! sequences to a single database transaction.
//!
//! The traits expose the semantic operations the use cases need
//! (`upsert_line`, `add_stock`, ...); the Pg implementations route the
//! multi-statement ones through [`PgTxManager`] so each runs inside one
//! transaction with commit-on-success and rollback-on-failure.

mod cart;
mod stock;
mod tx;

pub use cart::{CartRepository, CartTx, PgCartRepository};
pub use stock::{LocationQuery, NewStock, PgStockRepository, StockRepository, StockTx, StockUpsert};
pub use tx::PgTxManager;

use thiserror::Error;

/// # RepositoryError
///
/// Error conditions that can arise in the data storage layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database-related errors, wrapping the underlying PostgreSQL error
    #[error("Database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    /// Failed to obtain a database connection from the pool.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    /// No row matched the addressed entity.
    #[error("Not found")]
    NotFound,
    /// A concurrent writer interfered with a read-modify-write sequence.
    /// Callers may retry the operation once.
    #[error("Conflicting concurrent update")]
    Conflict,
    /// A stored value does not fit the domain type.
    #[error("Numeric value out of range")]
    OutOfRange(#[from] std::num::TryFromIntError),
}
