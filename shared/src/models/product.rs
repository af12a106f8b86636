//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Product entity
///
/// Authoritative copies live only in the server's catalog store; every other
/// holder (broadcast payloads, client caches) is a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Selling price, never negative
    pub price: Decimal,
    /// Discount in percent (0-100)
    #[serde(default)]
    pub discount: Decimal,
    pub stock: u32,
    /// Stock level below which the product is low on stock
    #[serde(default)]
    pub threshold: u32,
    /// Shelf life in days
    #[serde(default)]
    pub shelf_life: u32,
    pub quantity_unit: String,
    #[serde(default)]
    pub nutrition: BTreeMap<String, String>,
    /// Ordered image references, first one is the cover
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    /// Whether stock has dropped below the configured threshold
    pub fn is_low_stock(&self) -> bool {
        self.stock < self.threshold
    }

    /// Price after discount, rounded to cents
    ///
    /// `None` when the arithmetic leaves the decimal range.
    pub fn effective_price(&self) -> Option<Decimal> {
        let hundred = Decimal::ONE_HUNDRED;
        let discounted = self
            .price
            .checked_mul(hundred.checked_sub(self.discount)?)?
            .checked_div(hundred)?;
        Some(discounted.round_dp(2))
    }
}

/// Full catalog read, tagged with the commit sequence it reflects
///
/// Every commit with `version <= self.version` is already included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: u64,
    pub products: Vec<Product>,
}

/// Products changed after a given commit sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogChanges {
    /// Latest commit sequence on the server
    pub version: u64,
    /// The requested cursor cannot be served, fetch the full catalog instead
    pub full_refetch: bool,
    pub products: Vec<Product>,
}
