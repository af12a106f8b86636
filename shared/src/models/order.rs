//! Order Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order fulfillment status
///
/// ```text
/// Pending ──▶ Processing ──▶ Shipped ──▶ Delivered
///    │             │
///    └──────┬──────┘
///           ▼
///       Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Delivered and Cancelled accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery address kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AddressType {
    #[default]
    Home,
    Work,
    Other,
}

/// Delivery address attached to an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub address_type: AddressType,
}

/// One order line
///
/// `unit_price` is a snapshot of the catalog price at creation and is never
/// updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    /// `None` when the total leaves the decimal range
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub items: Vec<LineItem>,
    pub address: DeliveryAddress,
    pub status: OrderStatus,
    pub total: Decimal,
    /// Creation time (Unix millis)
    pub created_at: i64,
    /// Last status change (Unix millis)
    pub updated_at: i64,
}

// ========== Request payloads ==========

/// Requested order line (`POST /order/new-order`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: String,
    /// Signed so that zero/negative input can be rejected explicitly
    pub quantity: i64,
}

/// Create order payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub user_id: String,
    pub items: Vec<OrderItemInput>,
    pub address: DeliveryAddress,
}

/// `PUT /order/confirm-order`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOrderRequest {
    pub order_id: String,
    pub status: OrderStatus,
}

/// `PUT /order/reject-order`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectOrderRequest {
    pub order_id: String,
}

/// `POST /order/get-user-orders`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOrdersRequest {
    pub user_id: String,
}

/// `{orders: [...]}` list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
}

/// Order counts per status bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Pending
    pub pending: usize,
    /// Processing + Shipped
    pub active: usize,
    pub delivered: usize,
    pub cancelled: usize,
    pub total: usize,
}

impl OrderSummary {
    pub fn from_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut summary = Self::default();
        for order in orders {
            match order.status {
                OrderStatus::Pending => summary.pending += 1,
                OrderStatus::Processing | OrderStatus::Shipped => summary.active += 1,
                OrderStatus::Delivered => summary.delivered += 1,
                OrderStatus::Cancelled => summary.cancelled += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"Processing\""
        );
        let s: OrderStatus = serde_json::from_str("\"Cancelled\"").unwrap();
        assert_eq!(s, OrderStatus::Cancelled);
        assert!(serde_json::from_str::<OrderStatus>("\"Returned\"").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_confirm_request_shape() {
        let req: ConfirmOrderRequest =
            serde_json::from_str(r#"{"orderId":"o-1","status":"Shipped"}"#).unwrap();
        assert_eq!(req.order_id, "o-1");
        assert_eq!(req.status, OrderStatus::Shipped);
    }
}
