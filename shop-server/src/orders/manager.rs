//! Orders Manager
//!
//! Placement and fulfillment of orders. Status changes are checked by the
//! state machine inside the store's per-order critical section; the loser of
//! two racing confirm calls sees the winner's status and is rejected.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{LineItem, Order, OrderCreate, OrderStatus, OrderSummary};
use shared::util::now_millis;
use uuid::Uuid;

use super::error::OrderError;
use super::state_machine;
use super::store::OrderStore;
use crate::catalog::CatalogStore;

#[derive(Debug, Clone)]
pub struct OrdersManager {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl OrdersManager {
    pub fn new(store: Arc<dyn OrderStore>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { store, catalog }
    }

    /// Place a new order in `Pending`
    ///
    /// Unit prices are snapshotted from the catalog (after discount) and never
    /// follow later catalog edits. Stock is not touched here.
    pub fn create(&self, input: OrderCreate) -> Result<Order, OrderError> {
        if input.user_id.trim().is_empty() {
            return Err(OrderError::MissingField("userId"));
        }
        if input.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut items = Vec::with_capacity(input.items.len());
        let mut total = Decimal::ZERO;
        for item in &input.items {
            let quantity = u32::try_from(item.quantity)
                .ok()
                .filter(|q| *q > 0)
                .ok_or_else(|| OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                })?;
            let product = self
                .catalog
                .get(&item.product_id)
                .ok_or_else(|| OrderError::ProductNotFound(item.product_id.clone()))?;

            let out_of_range = || OrderError::AmountOutOfRange {
                product_id: product.id.clone(),
            };
            let unit_price = product.effective_price().ok_or_else(out_of_range)?;
            let line = LineItem {
                product_id: product.id.clone(),
                name: product.name.clone(),
                quantity,
                unit_price,
            };
            total = line
                .line_total()
                .and_then(|amount| total.checked_add(amount))
                .ok_or_else(out_of_range)?;
            items.push(line);
        }

        let now = now_millis();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            items,
            address: input.address,
            status: OrderStatus::Pending,
            total,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(order.clone());
        tracing::info!(order_id = %order.id, user_id = %order.user_id, total = %order.total, "Order placed");
        Ok(order)
    }

    /// Move an order to `target` if it is the allowed successor of its status
    pub fn confirm(&self, order_id: &str, target: OrderStatus) -> Result<Order, OrderError> {
        let mut advance = |order: &mut Order| -> Result<(), OrderError> {
            let next = state_machine::transition(order.status, target).map_err(|(from, to)| {
                OrderError::InvalidTransition {
                    order_id: order.id.clone(),
                    from,
                    to,
                }
            })?;
            order.status = next;
            order.updated_at = now_millis();
            Ok(())
        };
        let order = self.store.update_with(order_id, &mut advance);

        match &order {
            Ok(o) => tracing::info!(order_id = %o.id, status = %o.status, "Order status changed"),
            Err(e) => tracing::info!(order_id = %order_id, target = %target, "Order status change rejected: {}", e),
        }
        order
    }

    /// Cancel an order (`Pending` or `Processing` only)
    pub fn reject(&self, order_id: &str) -> Result<Order, OrderError> {
        self.confirm(order_id, OrderStatus::Cancelled)
    }

    pub fn get(&self, order_id: &str) -> Result<Order, OrderError> {
        self.store
            .get(order_id)
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    pub fn list_all(&self) -> Vec<Order> {
        self.store.list()
    }

    pub fn list_for_user(&self, user_id: &str) -> Vec<Order> {
        self.store
            .list()
            .into_iter()
            .filter(|o| o.user_id == user_id)
            .collect()
    }

    pub fn summary(&self) -> OrderSummary {
        OrderSummary::from_orders(&self.store.list())
    }
}
