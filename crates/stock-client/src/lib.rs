//! HTTP client for the stock service's item lookup.
//!
//! The cart service calls this during `AddItem` (availability check) and
//! `ListCart` (name, price, and current availability per line). The wire
//! is the stock gateway's own JSON surface: POST `{"sku": n}` and an
//! `{"message": {...}}` envelope around the item on success.

use async_trait::async_trait;
use model::{ItemInfo, SkuId};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum StockClientError {
    /// The SKU is unknown to the stock service.
    #[error("sku not found")]
    NotFound,
    /// The request never produced a usable answer.
    #[error("stock service transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The stock service answered outside the expected envelope.
    #[error("unexpected stock service response: status {0}")]
    BadResponse(StatusCode),
}

/// Synchronous item lookup against the stock service, one RPC wide.
#[async_trait]
pub trait StockClient: Send + Sync {
    async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, StockClientError>;
}

#[derive(Serialize)]
struct GetItemRequest {
    sku: SkuId,
}

#[derive(Deserialize)]
struct Envelope {
    message: ItemInfo,
}

/// reqwest-backed [`StockClient`] posting to the stock gateway.
///
/// The underlying client multiplexes requests over a shared connection
/// pool and is cheap to clone.
#[derive(Clone)]
pub struct HttpStockClient {
    http: Client,
    base_url: String,
}

impl HttpStockClient {
    /// # Arguments
    /// * `base_url` - Full URL of the stock item-lookup route
    ///   (the `CLIENT_URL` configuration value).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl StockClient for HttpStockClient {
    async fn item(&self, sku_id: SkuId) -> Result<ItemInfo, StockClientError> {
        let response = self
            .http
            .post(&self.base_url)
            .json(&GetItemRequest { sku: sku_id })
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let envelope: Envelope = response.json().await?;
                Ok(envelope.message)
            }
            StatusCode::NOT_FOUND => Err(StockClientError::NotFound),
            status => {
                error!(sku = sku_id, %status, "stock lookup failed");
                Err(StockClientError::BadResponse(status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> HttpStockClient {
        HttpStockClient::new(format!("{}/stocks/item/get", server.uri()))
    }

    #[tokio::test]
    async fn item_unwraps_message_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stocks/item/get"))
            .and(body_json(json!({ "sku": 1001 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {
                    "sku": 1001,
                    "name": "T-Shirt",
                    "type": "apparel",
                    "count": 10,
                    "price": 1599,
                    "location": "msk-1",
                    "user_id": 7
                }
            })))
            .mount(&server)
            .await;

        let item = client_for(&server).await.item(1001).await.unwrap();
        assert_eq!(item.name, "T-Shirt");
        assert_eq!(item.count, 10);
        assert_eq!(item.price, 1599);
    }

    #[tokio::test]
    async fn item_without_stock_fields_reads_as_zero_available() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "sku": 1002, "name": "Mug", "type": "kitchen" }
            })))
            .mount(&server)
            .await;

        let item = client_for(&server).await.item(1002).await.unwrap();
        assert_eq!(item.count, 0);
        assert_eq!(item.user_id, 0);
    }

    #[tokio::test]
    async fn unknown_sku_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).await.item(9999).await.unwrap_err();
        assert!(matches!(err, StockClientError::NotFound));
    }

    #[tokio::test]
    async fn server_error_is_not_a_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).await.item(1001).await.unwrap_err();
        assert!(matches!(
            err,
            StockClientError::BadResponse(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }
}
