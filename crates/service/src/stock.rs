//! Stock use cases.

use std::sync::Arc;

use async_trait::async_trait;
use kafka_producer::EventSink;
use model::event::MetricEvent;
use model::{ItemInfo, SkuId, UserId};
use repository::{LocationQuery, NewStock, StockRepository, StockUpsert};
use serde::Serialize;
use tracing::instrument;

use crate::ServiceError;

/// Input of the restock use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockCommand {
    pub sku_id: SkuId,
    pub user_id: UserId,
    pub count: u16,
    pub price: u32,
    pub location: String,
}

/// One page of the per-location listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StockPage {
    pub stocks: Vec<ItemInfo>,
    /// Number of rows in this page; the unpaginated total is not computed.
    pub total_count: usize,
    pub current_page: i64,
}

/// Trait describing the stock operations exposed to the gateway.
#[async_trait]
pub trait StockUsecase: Send + Sync {
    /// Restock (sku, user): create the first stock row for the SKU or
    /// accumulate onto an owned one. Rejected when the SKU is unknown or
    /// the row belongs to another owner.
    async fn add_stock(&self, command: RestockCommand) -> Result<(), ServiceError>;

    /// Delete the stock row for (sku, user).
    async fn delete_stock(&self, sku_id: SkuId, user_id: UserId) -> Result<(), ServiceError>;

    /// Catalog row joined with its stock row; stock fields zeroed when no
    /// stock exists.
    async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, ServiceError>;

    /// Paginated listing of one owner's stock at a location.
    async fn items_by_location(
        &self,
        user_id: UserId,
        location: String,
        page_size: i64,
        current_page: i64,
    ) -> Result<StockPage, ServiceError>;
}

/// Async implementation of [`StockUsecase`] over a stock repository.
pub struct StockService<R> {
    repo: R,
    events: Arc<dyn EventSink>,
}

impl<R> StockService<R>
where
    R: StockRepository,
{
    pub fn new(repo: R, events: Arc<dyn EventSink>) -> Self {
        Self { repo, events }
    }
}

#[async_trait]
impl<R> StockUsecase for StockService<R>
where
    R: StockRepository,
{
    #[instrument(skip(self))]
    async fn add_stock(&self, command: RestockCommand) -> Result<(), ServiceError> {
        if command.sku_id == 0 {
            return Err(ServiceError::InvalidArgument("sku must be non-zero".into()));
        }

        let outcome = self
            .repo
            .add_stock(&NewStock {
                sku_id: command.sku_id,
                user_id: command.user_id,
                count: command.count,
                price: command.price,
                location: command.location,
            })
            .await?;

        match outcome {
            StockUpsert::Created { new_count } => {
                self.events
                    .publish(MetricEvent::sku_created(
                        command.sku_id,
                        new_count,
                        command.price,
                    ))
                    .await;
            }
            StockUpsert::Restocked { new_count } => {
                self.events
                    .publish(MetricEvent::stock_changed(
                        command.sku_id,
                        new_count,
                        command.price,
                    ))
                    .await;
            }
            // Treated as "no such owner-sku pair": nothing was written and
            // no event fires.
            StockUpsert::ForeignOwner => return Err(ServiceError::OwnershipMismatch),
        }

        Ok(())
    }

    async fn delete_stock(&self, sku_id: SkuId, user_id: UserId) -> Result<(), ServiceError> {
        self.repo.delete_row(sku_id, user_id).await?;
        Ok(())
    }

    async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, ServiceError> {
        Ok(self.repo.item(sku_id).await?)
    }

    #[instrument(skip(self))]
    async fn items_by_location(
        &self,
        user_id: UserId,
        location: String,
        page_size: i64,
        current_page: i64,
    ) -> Result<StockPage, ServiceError> {
        if page_size < 1 || current_page < 1 {
            return Err(ServiceError::InvalidArgument(
                "page_size and current_page must be positive".into(),
            ));
        }

        let stocks = self
            .repo
            .items_by_location(&LocationQuery {
                user_id,
                location,
                limit: page_size,
                offset: page_size * (current_page - 1),
            })
            .await?;

        Ok(StockPage {
            total_count: stocks.len(),
            stocks,
            current_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::event::{EventPayload, EventType};
    use model::StockRow;
    use repository::RepositoryError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeStockRepo {
        catalog: HashMap<SkuId, (String, String)>,
        rows: Mutex<HashMap<SkuId, StockRow>>,
        next_id: Mutex<i64>,
    }

    impl FakeStockRepo {
        fn with_catalog(skus: &[SkuId]) -> Self {
            Self {
                catalog: skus
                    .iter()
                    .map(|sku| (*sku, (format!("sku-{sku}"), "test".to_string())))
                    .collect(),
                rows: Mutex::new(HashMap::new()),
                next_id: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl StockRepository for FakeStockRepo {
        async fn add_stock(&self, stock: &NewStock) -> Result<StockUpsert, RepositoryError> {
            if !self.catalog.contains_key(&stock.sku_id) {
                return Err(RepositoryError::NotFound);
            }
            let mut rows = self.rows.lock().unwrap();
            match rows.get_mut(&stock.sku_id) {
                None => {
                    let mut next_id = self.next_id.lock().unwrap();
                    *next_id += 1;
                    rows.insert(
                        stock.sku_id,
                        StockRow {
                            id: *next_id,
                            sku_id: stock.sku_id,
                            count: stock.count,
                            price: stock.price,
                            location: stock.location.clone(),
                            user_id: stock.user_id,
                        },
                    );
                    Ok(StockUpsert::Created {
                        new_count: stock.count,
                    })
                }
                Some(existing) if existing.user_id == stock.user_id => {
                    let new_count =
                        u16::try_from(u32::from(existing.count) + u32::from(stock.count))?;
                    existing.count = new_count;
                    existing.price = stock.price;
                    existing.location = stock.location.clone();
                    Ok(StockUpsert::Restocked { new_count })
                }
                Some(_) => Ok(StockUpsert::ForeignOwner),
            }
        }

        async fn delete_row(
            &self,
            sku_id: SkuId,
            user_id: UserId,
        ) -> Result<(), RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            match rows.get(&sku_id) {
                Some(row) if row.user_id == user_id => {
                    rows.remove(&sku_id);
                    Ok(())
                }
                _ => Err(RepositoryError::NotFound),
            }
        }

        async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, RepositoryError> {
            let (name, kind) = self
                .catalog
                .get(&sku_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let rows = self.rows.lock().unwrap();
            Ok(match rows.get(&sku_id) {
                Some(row) => ItemInfo {
                    sku_id,
                    name,
                    kind,
                    count: row.count,
                    price: row.price,
                    location: row.location.clone(),
                    user_id: row.user_id,
                },
                None => ItemInfo {
                    sku_id,
                    name,
                    kind,
                    ..ItemInfo::default()
                },
            })
        }

        async fn items_by_location(
            &self,
            query: &LocationQuery,
        ) -> Result<Vec<ItemInfo>, RepositoryError> {
            let rows = self.rows.lock().unwrap();
            let mut matched: Vec<&StockRow> = rows
                .values()
                .filter(|row| row.user_id == query.user_id && row.location == query.location)
                .collect();
            matched.sort_by_key(|row| row.sku_id);
            Ok(matched
                .into_iter()
                .skip(query.offset as usize)
                .take(query.limit as usize)
                .map(|row| ItemInfo {
                    sku_id: row.sku_id,
                    name: format!("sku-{}", row.sku_id),
                    kind: "test".to_string(),
                    count: row.count,
                    price: row.price,
                    location: row.location.clone(),
                    user_id: row.user_id,
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<MetricEvent>>,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn publish(&self, event: MetricEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn service(skus: &[SkuId]) -> (StockService<FakeStockRepo>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (
            StockService::new(FakeStockRepo::with_catalog(skus), sink.clone()),
            sink,
        )
    }

    fn restock(sku_id: SkuId, user_id: UserId, count: u16) -> RestockCommand {
        RestockCommand {
            sku_id,
            user_id,
            count,
            price: 2500,
            location: "msk-1".to_string(),
        }
    }

    #[tokio::test]
    async fn restock_creates_then_accumulates() {
        let (svc, sink) = service(&[1001]);

        svc.add_stock(restock(1001, 1, 10)).await.unwrap();
        svc.add_stock(restock(1001, 1, 5)).await.unwrap();

        let item = svc.item(1001).await.unwrap();
        assert_eq!(item.count, 15);
        assert_eq!(item.user_id, 1);

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventType::SkuCreated);
        assert_eq!(events[1].kind, EventType::StockChanged);
        match &events[1].payload {
            EventPayload::Stock(payload) => {
                assert_eq!(payload.count, 15);
                assert_eq!(payload.price, 2500);
            }
            EventPayload::Cart(_) => panic!("expected a stock payload"),
        }
    }

    #[tokio::test]
    async fn restock_by_foreign_owner_writes_nothing_and_emits_nothing() {
        let (svc, sink) = service(&[1001]);

        svc.add_stock(restock(1001, 1, 10)).await.unwrap();
        let err = svc.add_stock(restock(1001, 2, 5)).await.unwrap_err();
        assert!(matches!(err, ServiceError::OwnershipMismatch));

        let item = svc.item(1001).await.unwrap();
        assert_eq!(item.count, 10);
        assert_eq!(item.user_id, 1);

        // Only the creation event exists.
        assert_eq!(sink.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restock_unknown_sku_is_not_found() {
        let (svc, sink) = service(&[]);

        let err = svc.add_stock(restock(1001, 1, 10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
        assert!(sink.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn restock_zero_sku_is_invalid() {
        let (svc, _) = service(&[1001]);
        let err = svc.add_stock(restock(0, 1, 10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn restock_overflowing_count_is_invalid() {
        let (svc, _) = service(&[1001]);

        svc.add_stock(restock(1001, 1, u16::MAX)).await.unwrap();
        let err = svc.add_stock(restock(1001, 1, 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn restock_replaces_price_and_location() {
        let (svc, _) = service(&[1001]);

        svc.add_stock(RestockCommand {
            price: 100,
            location: "msk-1".to_string(),
            ..restock(1001, 1, 10)
        })
        .await
        .unwrap();
        svc.add_stock(RestockCommand {
            price: 200,
            location: "spb-2".to_string(),
            ..restock(1001, 1, 5)
        })
        .await
        .unwrap();

        let item = svc.item(1001).await.unwrap();
        assert_eq!(item.count, 15);
        assert_eq!(item.price, 200);
        assert_eq!(item.location, "spb-2");
    }

    #[tokio::test]
    async fn delete_stock_returns_the_slot_to_absent() {
        let (svc, _) = service(&[1001]);

        svc.add_stock(restock(1001, 1, 10)).await.unwrap();
        svc.delete_stock(1001, 1).await.unwrap();

        // The SKU record survives; only the stock fields are gone.
        let item = svc.item(1001).await.unwrap();
        assert_eq!(item.count, 0);
        assert_eq!(item.user_id, 0);

        let err = svc.delete_stock(1001, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn delete_stock_by_non_owner_is_not_found() {
        let (svc, _) = service(&[1001]);

        svc.add_stock(restock(1001, 1, 10)).await.unwrap();
        let err = svc.delete_stock(1001, 2).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));

        // The owned row survives the rejected delete.
        assert_eq!(svc.item(1001).await.unwrap().count, 10);
    }

    #[tokio::test]
    async fn item_for_unknown_sku_is_not_found() {
        let (svc, _) = service(&[1001]);
        let err = svc.item(9999).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound));
    }

    #[tokio::test]
    async fn location_page_counts_returned_rows() {
        let (svc, _) = service(&[1001, 1002, 1003]);
        for sku in [1001, 1002, 1003] {
            svc.add_stock(restock(sku, 1, 5)).await.unwrap();
        }

        let first = svc
            .items_by_location(1, "msk-1".to_string(), 2, 1)
            .await
            .unwrap();
        assert_eq!(first.stocks.len(), 2);
        // total_count is the page length, not the unpaginated total.
        assert_eq!(first.total_count, 2);
        assert_eq!(first.current_page, 1);

        let second = svc
            .items_by_location(1, "msk-1".to_string(), 2, 2)
            .await
            .unwrap();
        assert_eq!(second.stocks.len(), 1);
        assert_eq!(second.total_count, 1);
        assert_eq!(second.current_page, 2);
    }

    #[tokio::test]
    async fn location_page_rejects_non_positive_paging() {
        let (svc, _) = service(&[1001]);

        let err = svc
            .items_by_location(1, "msk-1".to_string(), 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));

        let err = svc
            .items_by_location(1, "msk-1".to_string(), 10, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }
}
