//! Outbound metric records and their JSON wire shape.
//!
//! One record is produced per cart-add attempt (success or rejection) and
//! per successful stock mutation. Records are ephemeral: they are handed
//! to the event bus and never persisted by the producer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CartLineId, SkuId};

/// Enumerated record tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CartItemAdded,
    CartItemFailed,
    SkuCreated,
    StockChanged,
}

/// Originating service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventService {
    Cart,
    Stock,
}

/// Outcome of the cart mutation the record describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CartEventPayload {
    /// Cart line id; 0 on a rejected add, where no row was touched.
    pub cart_id: CartLineId,
    pub sku: SkuId,
    pub count: u16,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockEventPayload {
    pub sku: SkuId,
    /// Count after the mutation.
    pub count: u16,
    pub price: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EventPayload {
    Cart(CartEventPayload),
    Stock(StockEventPayload),
}

/// A single metric record as it travels over the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricEvent {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub service: EventService,
    /// RFC 3339 timestamp taken at emission.
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl MetricEvent {
    pub fn cart_item_added(cart_id: CartLineId, sku: SkuId, count: u16) -> Self {
        Self {
            kind: EventType::CartItemAdded,
            service: EventService::Cart,
            timestamp: Utc::now(),
            payload: EventPayload::Cart(CartEventPayload {
                cart_id,
                sku,
                count,
                status: EventStatus::Success,
                reason: None,
            }),
        }
    }

    pub fn cart_item_failed(sku: SkuId, count: u16, reason: &str) -> Self {
        Self {
            kind: EventType::CartItemFailed,
            service: EventService::Cart,
            timestamp: Utc::now(),
            payload: EventPayload::Cart(CartEventPayload {
                cart_id: 0,
                sku,
                count,
                status: EventStatus::Failed,
                reason: Some(reason.to_string()),
            }),
        }
    }

    pub fn sku_created(sku: SkuId, count: u16, price: u32) -> Self {
        Self {
            kind: EventType::SkuCreated,
            service: EventService::Stock,
            timestamp: Utc::now(),
            payload: EventPayload::Stock(StockEventPayload { sku, count, price }),
        }
    }

    pub fn stock_changed(sku: SkuId, count: u16, price: u32) -> Self {
        Self {
            kind: EventType::StockChanged,
            service: EventService::Stock,
            timestamp: Utc::now(),
            payload: EventPayload::Stock(StockEventPayload { sku, count, price }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_failure_record_wire_shape() {
        let event = MetricEvent::cart_item_failed(1001, 11, "not enough stock");
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["type"], "cart_item_failed");
        assert_eq!(value["service"], "cart");
        assert_eq!(value["payload"]["cartId"], 0);
        assert_eq!(value["payload"]["sku"], 1001);
        assert_eq!(value["payload"]["count"], 11);
        assert_eq!(value["payload"]["status"], "failed");
        assert_eq!(value["payload"]["reason"], "not enough stock");
        // chrono's serde form is RFC 3339.
        let ts = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[test]
    fn success_record_omits_reason() {
        let event = MetricEvent::cart_item_added(42, 1001, 3);
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("reason"));
        assert!(json.contains(r#""cartId":42"#));
        assert!(json.contains(r#""status":"success""#));
    }

    #[test]
    fn stock_record_round_trips() {
        let event = MetricEvent::stock_changed(1001, 15, 2500);
        let json = serde_json::to_string(&event).unwrap();
        let back: MetricEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        match back.payload {
            EventPayload::Stock(payload) => {
                assert_eq!(payload.count, 15);
                assert_eq!(payload.price, 2500);
            }
            EventPayload::Cart(_) => panic!("expected a stock payload"),
        }
    }
}
