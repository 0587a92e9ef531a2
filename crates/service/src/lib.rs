//! Business logic layer for the cart and stocks services.
//!
//! This crate holds the transactional use cases behind both gateways:
//! cart mutations that consult the stock service before touching rows, and
//! stock mutations that enforce ownership and accumulate inventory. Every
//! use case is generic over its repository (and, for the cart, the stock
//! client), so the suites below run against in-memory fakes.
//!
//! # Features
//! - Availability-checked cart adds with replace semantics.
//! - Accumulating restocks with an ownership guard.
//! - Metric record emission per cart-add attempt and per stock mutation,
//!   best-effort via [`kafka_producer::EventSink`].
//! - Well-typed error handling via [`ServiceError`].

mod cart;
mod stock;

pub use cart::{CartItemView, CartService, CartUsecase, CartView};
pub use stock::{RestockCommand, StockPage, StockService, StockUsecase};

use repository::RepositoryError;
use stock_client::StockClientError;
use thiserror::Error;

/// The main error type for all cart and stock use cases.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The addressed entity does not exist.
    #[error("not found")]
    NotFound,
    /// The cart-add precondition failed: fewer units available than asked.
    #[error("not enough stock")]
    InsufficientStock,
    /// Restock requested by a non-owner of the stock row.
    #[error("stock belongs to another user")]
    OwnershipMismatch,
    /// Shape violation or numeric range overflow.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A repository (database) operation failed.
    #[error("Database error: {0}")]
    Db(RepositoryError),
    /// The cross-service stock lookup failed in transit.
    #[error("Stock service error: {0}")]
    Stock(StockClientError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::OutOfRange(_) => {
                Self::InvalidArgument("numeric value out of range".into())
            }
            other => Self::Db(other),
        }
    }
}

impl From<StockClientError> for ServiceError {
    fn from(err: StockClientError) -> Self {
        match err {
            StockClientError::NotFound => Self::NotFound,
            other => Self::Stock(other),
        }
    }
}
