//! Domain types shared by the cart service, the stocks service, and the
//! metrics pipeline.

pub mod event;

use serde::{Deserialize, Serialize};

/// Stock-keeping-unit identifier. Non-zero in valid rows.
pub type SkuId = u32;

/// User identifier.
pub type UserId = i64;

/// Server-assigned surrogate id of a cart line.
pub type CartLineId = i64;

/// Server-assigned surrogate id of a stock row.
pub type StockRowId = i64;

/// Catalog record for a sellable product variant.
///
/// Created administratively; the APIs here never delete one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Sku {
    #[serde(rename = "sku")]
    pub sku_id: SkuId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Per-owner inventory record for a SKU.
///
/// At most one row exists per (sku_id, user_id); restocking accumulates
/// onto `count`, never past `u16::MAX`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StockRow {
    pub id: StockRowId,
    pub sku_id: SkuId,
    pub count: u16,
    /// Minor currency units.
    pub price: u32,
    pub location: String,
    /// Owner; restocking requires matching ownership.
    pub user_id: UserId,
}

/// One SKU line in one user's cart.
///
/// At most one line exists per (user_id, sku_id); a repeated add replaces
/// `count` rather than accumulating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CartLine {
    pub id: CartLineId,
    pub user_id: UserId,
    pub sku_id: SkuId,
    pub count: u16,
}

/// Catalog row joined with its stock row, if any.
///
/// The SKU fields are always filled. The stock fields are zeroed when no
/// stock row exists — a successful lookup with zeroed stock is distinct
/// from the SKU being absent altogether, which is a not-found outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ItemInfo {
    #[serde(rename = "sku")]
    pub sku_id: SkuId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub count: u16,
    #[serde(default)]
    pub price: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub user_id: UserId,
}

#[cfg(test)]
mod tests {
    use super::ItemInfo;

    #[test]
    fn item_info_stock_fields_default_to_zero() {
        // The stock service omits stock fields for a SKU with no stock row;
        // the cart side must read that as "zero available".
        let json = r#"{"sku": 1001, "name": "T-Shirt", "type": "apparel"}"#;
        let item: ItemInfo = serde_json::from_str(json).unwrap();
        assert_eq!(item.sku_id, 1001);
        assert_eq!(item.count, 0);
        assert_eq!(item.price, 0);
        assert_eq!(item.user_id, 0);
        assert!(item.location.is_empty());
    }

    #[test]
    fn item_info_round_trips_with_stock() {
        let item = ItemInfo {
            sku_id: 1001,
            name: "T-Shirt".to_string(),
            kind: "apparel".to_string(),
            count: 10,
            price: 1599,
            location: "msk-1".to_string(),
            user_id: 7,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""sku":1001"#));
        assert!(json.contains(r#""type":"apparel""#));
        let back: ItemInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
