//! Cart use cases.

use std::sync::Arc;

use async_trait::async_trait;
use kafka_producer::EventSink;
use model::event::MetricEvent;
use model::{SkuId, UserId};
use repository::{CartRepository, RepositoryError};
use serde::Serialize;
use stock_client::StockClient;
use tracing::{instrument, warn};

use crate::ServiceError;

const REASON_NOT_ENOUGH_STOCK: &str = "not enough stock";

/// One reported cart line: the stored count clamped to availability.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CartItemView {
    pub sku: SkuId,
    pub name: String,
    pub count: u16,
    pub price: u32,
}

/// Result of listing a cart.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_price: u64,
}

/// Trait describing the cart operations exposed to the gateway.
#[async_trait]
pub trait CartUsecase: Send + Sync {
    /// Add `count` units of a SKU to the user's cart, replacing any
    /// existing line for the same SKU, after checking availability against
    /// the stock service.
    async fn add_item(
        &self,
        user_id: UserId,
        sku_id: SkuId,
        count: u16,
    ) -> Result<(), ServiceError>;

    /// Remove the user's line for the SKU.
    async fn delete_item(&self, user_id: UserId, sku_id: SkuId) -> Result<(), ServiceError>;

    /// The user's cart with per-line availability clamping and the summed
    /// total price. Read-only: clamping is reported, never persisted.
    async fn list(&self, user_id: UserId) -> Result<CartView, ServiceError>;

    /// Remove every line in the user's cart.
    async fn clear(&self, user_id: UserId) -> Result<(), ServiceError>;
}

/// Async implementation of [`CartUsecase`] over a cart repository and the
/// stock service client.
pub struct CartService<R, S> {
    repo: R,
    stock: S,
    events: Arc<dyn EventSink>,
}

impl<R, S> CartService<R, S>
where
    R: CartRepository,
    S: StockClient,
{
    pub fn new(repo: R, stock: S, events: Arc<dyn EventSink>) -> Self {
        Self { repo, stock, events }
    }
}

#[async_trait]
impl<R, S> CartUsecase for CartService<R, S>
where
    R: CartRepository,
    S: StockClient,
{
    #[instrument(skip(self))]
    async fn add_item(
        &self,
        user_id: UserId,
        sku_id: SkuId,
        count: u16,
    ) -> Result<(), ServiceError> {
        // The gateway rejects count = 0; if one slips through anyway the
        // add is refused, it does not turn into a delete.
        if count == 0 {
            return Err(ServiceError::InsufficientStock);
        }

        let item = self.stock.item(sku_id).await?;
        if item.count < count {
            self.events
                .publish(MetricEvent::cart_item_failed(
                    sku_id,
                    count,
                    REASON_NOT_ENOUGH_STOCK,
                ))
                .await;
            return Err(ServiceError::InsufficientStock);
        }

        let cart_id = match self.repo.upsert_line(user_id, sku_id, count).await {
            // One retry for races on the (user_id, sku_id) unique key.
            Err(RepositoryError::Conflict) => self.repo.upsert_line(user_id, sku_id, count).await?,
            other => other?,
        };

        self.events
            .publish(MetricEvent::cart_item_added(cart_id, sku_id, count))
            .await;
        Ok(())
    }

    async fn delete_item(&self, user_id: UserId, sku_id: SkuId) -> Result<(), ServiceError> {
        self.repo.delete_line(user_id, sku_id).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: UserId) -> Result<CartView, ServiceError> {
        let lines = self.repo.lines(user_id).await?;

        let mut view = CartView::default();
        for line in lines {
            // Any stock lookup failure aborts the whole list; partial
            // results are not returned.
            let item = self.stock.item(line.sku_id).await?;

            let reported = if line.count > item.count {
                warn!(
                    user_id,
                    sku = line.sku_id,
                    in_cart = line.count,
                    available = item.count,
                    "cart line exceeds available stock, clamping"
                );
                item.count
            } else {
                line.count
            };

            view.total_price += u64::from(reported) * u64::from(item.price);
            view.items.push(CartItemView {
                sku: line.sku_id,
                name: item.name,
                count: reported,
                price: item.price,
            });
        }

        Ok(view)
    }

    async fn clear(&self, user_id: UserId) -> Result<(), ServiceError> {
        self.repo.clear(user_id).await?;
        Ok(())
    }
}
