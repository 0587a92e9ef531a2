//! Cart gateway.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use service::CartUsecase;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::metrics::{self, Metrics};
use crate::response::{error_response, failure, success};
use crate::shutdown_signal;

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    user_id: i64,
    sku: u32,
    count: u16,
}

#[derive(Debug, Deserialize)]
struct DeleteItemRequest {
    user_id: i64,
    sku: u32,
}

#[derive(Debug, Deserialize)]
struct UserRequest {
    user_id: i64,
}

#[derive(Clone)]
struct CartState {
    usecase: Arc<dyn CartUsecase>,
    metrics: Arc<Metrics>,
}

/// HTTP gateway in front of the cart use cases.
pub struct CartServer {
    usecase: Arc<dyn CartUsecase>,
    addr: String,
    metrics: Arc<Metrics>,
    expose_metrics: bool,
}

impl CartServer {
    /// # Arguments
    ///
    /// * `addr` - The address the gateway binds to
    /// * `usecase` - The cart use cases behind the routes
    /// * `expose_metrics` - Whether to serve prometheus metrics on `/metrics`
    pub fn new(addr: String, usecase: Arc<dyn CartUsecase>, expose_metrics: bool) -> Self {
        info!(%addr, "initializing cart gateway");

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
            .context("Failed to bind cart gateway")?;

        info!(addr = %self.addr, "cart gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Cart gateway error")?;

        info!("cart gateway shut down gracefully");
        Ok(())
    }

    fn create_router(&self) -> Router {
        let state = CartState {
            usecase: self.usecase.clone(),
            metrics: self.metrics.clone(),
        };

        let mut router = Router::new()
            .route("/cart/item/add", post(Self::handle_add_item))
            .route("/cart/item/delete", post(Self::handle_delete_item))
            .route("/cart/list", post(Self::handle_list))
            .route("/cart/clear", post(Self::handle_clear))
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

    async fn handle_add_item(
        State(state): State<CartState>,
        payload: Result<Json<AddItemRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };
        if req.sku == 0 || req.count == 0 {
            return failure(StatusCode::BAD_REQUEST, "sku and count must be positive");
        }

        match state.usecase.add_item(req.user_id, req.sku, req.count).await {
            Ok(()) => success(""),
            Err(err) => {
                warn!(user_id = req.user_id, sku = req.sku, error = %err, "add item failed");
                error_response(&err)
            }
        }
    }

    async fn handle_delete_item(
        State(state): State<CartState>,
        payload: Result<Json<DeleteItemRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        match state.usecase.delete_item(req.user_id, req.sku).await {
            Ok(()) => success(""),
            Err(err) => {
                warn!(user_id = req.user_id, sku = req.sku, error = %err, "delete item failed");
                error_response(&err)
            }
        }
    }

    async fn handle_list(
        State(state): State<CartState>,
        payload: Result<Json<UserRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        match state.usecase.list(req.user_id).await {
            Ok(view) => success(view),
            Err(err) => {
                warn!(user_id = req.user_id, error = %err, "list cart failed");
                error_response(&err)
            }
        }
    }

    async fn handle_clear(
        State(state): State<CartState>,
        payload: Result<Json<UserRequest>, JsonRejection>,
    ) -> Response {
        let Json(req) = match payload {
            Ok(json) => json,
            Err(rejection) => return failure(StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        match state.usecase.clear(req.user_id).await {
            Ok(()) => success(""),
            Err(err) => {
                warn!(user_id = req.user_id, error = %err, "clear cart failed");
                error_response(&err)
            }
        }
    }

    async fn handle_health() -> &'static str {
        "OK"
    }

    async fn handle_metrics(State(state): State<CartState>) -> Response {
        state.metrics.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_item_request_uses_snake_case_fields() {
        let req: AddItemRequest =
            serde_json::from_str(r#"{"user_id": 1, "sku": 1001, "count": 9}"#).unwrap();
        assert_eq!(req.user_id, 1);
        assert_eq!(req.sku, 1001);
        assert_eq!(req.count, 9);
    }

    #[test]
    fn negative_count_does_not_deserialize() {
        let req: Result<AddItemRequest, _> =
            serde_json::from_str(r#"{"user_id": 1, "sku": 1001, "count": -1}"#);
        assert!(req.is_err());
    }
}
