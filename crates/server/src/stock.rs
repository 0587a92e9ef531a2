//! Stocks gateway.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use service::{RestockCommand, StockUsecase};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::metrics::{self, Metrics};
use crate::response::{error_response, failure, success};
use crate::shutdown_signal;

#[derive(Debug, Deserialize)]
struct AddStockRequest {
    sku: u32,
    user_id: i64,
    count: u16,
    price: u32,
    location: String,
}

#[derive(Debug, Deserialize)]
struct DeleteStockRequest {
    user_id: i64,
    sku: u32,
}

#[derive(Debug, Deserialize)]
struct GetItemRequest {
    sku: u32,
}

#[derive(Debug, Deserialize)]
struct ListByLocationRequest {
    user_id: i64,
    location: String,
    page_size: i64,
    current_page: i64,
}

#[derive(Clone)]
struct StockState {
    usecase: Arc<dyn StockUsecase>,
    metrics: Arc<Metrics>,
}

/// HTTP gateway in front of the stock use cases.
pub struct StockServer {
    usecase: Arc<dyn StockUsecase>,
    addr: String,
    metrics: Arc<Metrics>,
    expose_metrics: bool,
}

impl StockServer {
    pub fn new(addr: String, usecase: Arc<dyn StockUsecase>, expose_metrics: bool) -> Self {
        info!(%addr, "initializing stocks gateway");

        Self {
            usecase,
            addr,
            metrics: Arc::new(Metrics::new()),
            expose_metrics,
        }
    }

    /// Starts the gateway and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router();

        let listener = TcpListener::bind(&self.addr)
            .await
            .context("Failed to bind stocks gateway")?;

        info!(addr = %self.addr, "stocks gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Stocks gateway error")?;

        info!("stocks gateway shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let state = StockState {
            usecase: self.usecase.clone(),
            metrics: self.metrics.clone(),
        };

        let mut router = Router::new()
            .route("/stocks/item/add", post(Self::handle_add_stock))
            .route("/stocks/item/delete", post(Self::handle_delete_stock))
            .route("/stocks/item/get", post(Self::handle_get_item))
            .route("/stocks/list/location", post(Self::handle_list_by_location))
            .route("/health", get(Self::handle_health));

        if self.expose_metrics {
            router = router.route("/metrics", get(Self::handle_metrics));
        }

        router
            .layer(axum::middleware::from_fn_with_state(
                self.metrics.clone(),
                metrics::track,
            ))
            .with_state(state)
    }

    async fn handle_add_stock(
        State(state): State<StockState>,
        payload: Result<Json<AddStockRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };
        if req.sku == 0 {
            return failure(StatusCode::BAD_REQUEST, "sku must be non-zero");
        }

        let command = RestockCommand {
            sku_id: req.sku,
            user_id: req.user_id,
            count: req.count,
            price: req.price,
            location: req.location,
        };
        match state.usecase.add_stock(command).await {
            Ok(()) => success(""),
            Err(err) => {
                warn!(user_id = req.user_id, sku = req.sku, error = %err, "add stock failed");
                error_response(&err)
            }
        }
    }

    async fn handle_delete_stock(
        State(state): State<StockState>,
        payload: Result<Json<DeleteStockRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        match state.usecase.delete_stock(req.sku, req.user_id).await {
            Ok(()) => success(""),
            Err(err) => {
                warn!(user_id = req.user_id, sku = req.sku, error = %err, "delete stock failed");
                error_response(&err)
            }
        }
    }

    async fn handle_get_item(
        State(state): State<StockState>,
        payload: Result<Json<GetItemRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        match state.usecase.item(req.sku).await {
            Ok(item) => success(item),
            Err(err) => {
                warn!(sku = req.sku, error = %err, "get item failed");
                error_response(&err)
            }
        }
    }

    async fn handle_list_by_location(
        State(state): State<StockState>,
        payload: Result<Json<ListByLocationRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        match state
            .usecase
            .items_by_location(req.user_id, req.location, req.page_size, req.current_page)
            .await
        {
            Ok(page) => success(page),
            Err(err) => {
                warn!(user_id = req.user_id, error = %err, "list by location failed");
                error_response(&err)
            }
        }
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<StockState>) -> Response {
        state.metrics.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_stock_request_uses_snake_case_fields() {
        let req: AddStockRequest = serde_json::from_str(
            r#"{"sku": 1001, "user_id": 1, "count": 10, "price": 2500, "location": "msk-1"}"#,
        )
        .unwrap();
        assert_eq!(req.sku, 1001);
        assert_eq!(req.count, 10);
        assert_eq!(req.location, "msk-1");
    }

    #[test]
    fn list_by_location_request_carries_paging() {
        let req: ListByLocationRequest = serde_json::from_str(
            r#"{"user_id": 1, "location": "msk-1", "page_size": 20, "current_page": 2}"#,
        )
        .unwrap();
        assert_eq!(req.page_size, 20);
        assert_eq!(req.current_page, 2);
    }
}
