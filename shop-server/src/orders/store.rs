//! Order Store
//!
//! Sole owner of authoritative order state. Status changes go through
//! [`OrderStore::update_with`], which runs the mutation while holding the
//! order's slot so concurrent writers to one order are linearized.

use dashmap::DashMap;
use shared::models::Order;

use super::error::OrderError;

/// Order storage seam
pub trait OrderStore: Send + Sync + std::fmt::Debug {
    fn insert(&self, order: Order);

    fn get(&self, id: &str) -> Option<Order>;

    /// All orders, newest first
    fn list(&self) -> Vec<Order>;

    /// Run `mutate` against the stored order under its slot lock
    ///
    /// If `mutate` fails the stored order is left untouched.
    fn update_with(
        &self,
        id: &str,
        mutate: &mut dyn FnMut(&mut Order) -> Result<(), OrderError>,
    ) -> Result<Order, OrderError>;
}

/// In-memory order store
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for MemoryOrderStore {
    fn insert(&self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    fn get(&self, id: &str) -> Option<Order> {
        self.orders.get(id).map(|o| o.value().clone())
    }

    fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        orders
    }

    fn update_with(
        &self,
        id: &str,
        mutate: &mut dyn FnMut(&mut Order) -> Result<(), OrderError>,
    ) -> Result<Order, OrderError> {
        let mut entry = self
            .orders
            .get_mut(id)
            .ok_or_else(|| OrderError::OrderNotFound(id.to_string()))?;

        let mut updated = entry.value().clone();
        mutate(&mut updated)?;
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }
}
