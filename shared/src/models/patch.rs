//! Catalog edit fields
//!
//! A catalog edit arrives as a free-form JSON object (`field -> value`). It is
//! parsed into a typed [`ProductPatch`] before anything touches the store, so
//! a malformed edit can never reach the catalog.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::product::Product;
use crate::error::{AppError, AppResult, ErrorCode};

// ── Text length limits ──────────────────────────────────────────────

/// Product names, categories, quantity units
pub const MAX_NAME_LEN: usize = 200;

/// Product descriptions
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Image references (URLs / storage keys)
pub const MAX_IMAGE_REF_LEN: usize = 2048;

/// Upper bound for discount percentage
const MAX_DISCOUNT: Decimal = Decimal::ONE_HUNDRED;

/// Upper bound for a unit price (1,000,000)
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Field names accepted in an edit (wire spelling)
pub const EDITABLE_FIELDS: &[&str] = &[
    "name",
    "category",
    "description",
    "price",
    "stock",
    "threshold",
    "discount",
    "shelfLife",
    "quantityUnit",
    "image",
    "nutrition",
];

/// Validated set of field overwrites for one product
///
/// Every `Some` field fully replaces the stored value; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub threshold: Option<u32>,
    pub discount: Option<Decimal>,
    pub shelf_life: Option<u32>,
    pub quantity_unit: Option<String>,
    pub images: Option<Vec<String>>,
    pub nutrition: Option<BTreeMap<String, String>>,
}

impl ProductPatch {
    /// Parse and validate a raw field map.
    ///
    /// Numeric fields accept JSON numbers or numeric strings. Negative or
    /// non-numeric values, unknown fields and blank text fields are rejected.
    pub fn from_fields(fields: &Map<String, Value>) -> AppResult<Self> {
        if fields.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let mut patch = Self::default();
        for (key, value) in fields {
            match key.as_str() {
                "name" => patch.name = Some(parse_text(key, value, MAX_NAME_LEN)?),
                "category" => patch.category = Some(parse_text(key, value, MAX_NAME_LEN)?),
                "description" => {
                    patch.description = Some(parse_text(key, value, MAX_DESCRIPTION_LEN)?)
                }
                "quantityUnit" => {
                    patch.quantity_unit = Some(parse_text(key, value, MAX_NAME_LEN)?)
                }
                "price" => {
                    let price = parse_decimal(key, value)?;
                    if price > MAX_PRICE {
                        return Err(AppError::with_message(
                            ErrorCode::ProductInvalidPrice,
                            format!("price exceeds maximum allowed ({MAX_PRICE}), got {price}"),
                        )
                        .with_detail("field", key.as_str()));
                    }
                    patch.price = Some(price);
                }
                "discount" => {
                    let discount = parse_decimal(key, value)?;
                    if discount > MAX_DISCOUNT {
                        return Err(field_error(key, "must be between 0 and 100"));
                    }
                    patch.discount = Some(discount);
                }
                "stock" => patch.stock = Some(parse_count(key, value)?),
                "threshold" => patch.threshold = Some(parse_count(key, value)?),
                "shelfLife" => patch.shelf_life = Some(parse_count(key, value)?),
                "image" => patch.images = Some(parse_images(key, value)?),
                "nutrition" => patch.nutrition = Some(parse_nutrition(key, value)?),
                _ => {
                    return Err(AppError::validation(format!("Unknown field: {key}"))
                        .with_detail("field", key.as_str()));
                }
            }
        }
        Ok(patch)
    }

    /// Overwrite the fields this patch names
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(v) = &self.name {
            product.name = v.clone();
        }
        if let Some(v) = &self.category {
            product.category = v.clone();
        }
        if let Some(v) = &self.description {
            product.description = v.clone();
        }
        if let Some(v) = self.price {
            product.price = v;
        }
        if let Some(v) = self.stock {
            product.stock = v;
        }
        if let Some(v) = self.threshold {
            product.threshold = v;
        }
        if let Some(v) = self.discount {
            product.discount = v;
        }
        if let Some(v) = self.shelf_life {
            product.shelf_life = v;
        }
        if let Some(v) = &self.quantity_unit {
            product.quantity_unit = v.clone();
        }
        if let Some(v) = &self.images {
            product.images = v.clone();
        }
        if let Some(v) = &self.nutrition {
            product.nutrition = v.clone();
        }
    }

    /// Build a new product from a patch that names every required field
    pub fn into_product(self, id: impl Into<String>) -> AppResult<Product> {
        let missing: Vec<&str> = [
            ("name", self.name.is_none()),
            ("category", self.category.is_none()),
            ("quantityUnit", self.quantity_unit.is_none()),
            ("price", self.price.is_none()),
            ("stock", self.stock.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let mut product = Product {
            id: id.into(),
            name: String::new(),
            category: String::new(),
            description: String::new(),
            price: Decimal::ZERO,
            discount: Decimal::ZERO,
            stock: 0,
            threshold: 0,
            shelf_life: 0,
            quantity_unit: String::new(),
            nutrition: BTreeMap::new(),
            images: Vec::new(),
        };
        self.apply_to(&mut product);
        Ok(product)
    }
}

fn field_error(field: &str, reason: &str) -> AppError {
    AppError::validation(format!("{field} {reason}")).with_detail("field", field)
}

fn parse_text(field: &str, value: &Value, max_len: usize) -> AppResult<String> {
    let Some(text) = value.as_str() else {
        return Err(field_error(field, "must be text"));
    };
    let text = text.trim();
    if text.is_empty() {
        return Err(field_error(field, "must not be empty"));
    }
    let chars = text.chars().count();
    if chars > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({chars} chars, max {max_len})"
        ))
        .with_detail("field", field));
    }
    Ok(text.to_string())
}

fn parse_decimal(field: &str, value: &Value) -> AppResult<Decimal> {
    let parsed = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().and_then(Decimal::from_f64),
        },
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    };

    let Some(number) = parsed else {
        return Err(field_error(field, "must be a number"));
    };
    if number.is_sign_negative() && !number.is_zero() {
        return Err(field_error(field, "must not be negative"));
    }
    Ok(number.normalize())
}

fn parse_count(field: &str, value: &Value) -> AppResult<u32> {
    let number = parse_decimal(field, value)?;
    if !number.fract().is_zero() {
        return Err(field_error(field, "must be a whole number"));
    }
    number
        .to_u32()
        .ok_or_else(|| field_error(field, "is out of range"))
}

fn parse_image_ref(field: &str, value: &Value) -> AppResult<String> {
    parse_text(field, value, MAX_IMAGE_REF_LEN)
}

fn parse_images(field: &str, value: &Value) -> AppResult<Vec<String>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| parse_image_ref(field, item))
            .collect(),
        other => Ok(vec![parse_image_ref(field, other)?]),
    }
}

fn parse_nutrition(field: &str, value: &Value) -> AppResult<BTreeMap<String, String>> {
    let Some(entries) = value.as_object() else {
        return Err(field_error(field, "must be an object"));
    };
    entries
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return Err(field_error(field, "values must be text or numbers")),
            };
            Ok((k.clone(), v))
        })
        .collect()
}
