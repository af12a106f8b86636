//! Catalog Store
//!
//! Sole owner of authoritative product state. Every write goes through
//! [`CatalogStore::apply`] or [`CatalogStore::insert`]; readers get clones.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::models::{Product, ProductPatch};

use crate::utils::{AppError, AppResult};

/// Product storage seam
///
/// Implementations must make `apply` atomic per product: the patch is applied
/// to the current record and written back without another writer in between.
pub trait CatalogStore: Send + Sync + std::fmt::Debug {
    fn get(&self, id: &str) -> Option<Product>;

    fn contains(&self, id: &str) -> bool;

    /// All products ordered by id
    fn list(&self) -> Vec<Product>;

    /// Insert a new product, failing if the id is taken
    fn insert(&self, product: Product) -> AppResult<Product>;

    /// Overwrite the fields named by `patch`, returning the resulting product
    fn apply(&self, id: &str, patch: &ProductPatch) -> AppResult<Product>;
}

/// In-memory catalog backed by a sharded map
///
/// Writers to different products land on different shards most of the time
/// and never wait on each other's work.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    products: DashMap<String, Product>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with products
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        for product in products {
            store.products.insert(product.id.clone(), product);
        }
        store
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn get(&self, id: &str) -> Option<Product> {
        self.products.get(id).map(|p| p.value().clone())
    }

    fn contains(&self, id: &str) -> bool {
        self.products.contains_key(id)
    }

    fn list(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.iter().map(|p| p.value().clone()).collect();
        products.sort_by(|a, b| a.id.cmp(&b.id));
        products
    }

    fn insert(&self, product: Product) -> AppResult<Product> {
        match self.products.entry(product.id.clone()) {
            Entry::Occupied(_) => Err(AppError::already_exists(format!(
                "Product {} already exists",
                product.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(product.clone());
                Ok(product)
            }
        }
    }

    fn apply(&self, id: &str, patch: &ProductPatch) -> AppResult<Product> {
        let mut entry = self
            .products
            .get_mut(id)
            .ok_or_else(|| AppError::product_not_found(id))?;

        patch.apply_to(entry.value_mut());
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::error::ErrorCode;
    use std::collections::BTreeMap;

    pub(crate) fn product(id: &str, stock: u32, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            category: "Milk".to_string(),
            description: String::new(),
            price: Decimal::from(price),
            discount: Decimal::ZERO,
            stock,
            threshold: 10,
            shelf_life: 7,
            quantity_unit: "Litre".to_string(),
            nutrition: BTreeMap::new(),
            images: vec![],
        }
    }

    #[test]
    fn test_apply_overwrites_named_fields() {
        let store = MemoryCatalogStore::with_products([product("p-1", 50, 100)]);
        let patch = ProductPatch {
            stock: Some(40),
            ..Default::default()
        };

        let updated = store.apply("p-1", &patch).unwrap();
        assert_eq!(updated.stock, 40);
        assert_eq!(updated.price, Decimal::from(100));
        assert_eq!(store.get("p-1").unwrap().stock, 40);
    }

    #[test]
    fn test_apply_unknown_product() {
        let store = MemoryCatalogStore::new();
        let err = store.apply("nope", &ProductPatch::default()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let store = MemoryCatalogStore::new();
        store.insert(product("p-1", 1, 1)).unwrap();
        let err = store.insert(product("p-1", 2, 2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
        assert_eq!(store.get("p-1").unwrap().stock, 1);
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let store =
            MemoryCatalogStore::with_products([product("b", 1, 1), product("a", 1, 1)]);
        let ids: Vec<_> = store.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
