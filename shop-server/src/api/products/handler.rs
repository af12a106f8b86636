//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use shared::message::CommittedPayload;
use shared::models::{CatalogChanges, CatalogSnapshot, Product, ProductPatch};
use uuid::Uuid;

use crate::api::json_body;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Full catalog with the commit sequence it reflects
pub async fn snapshot(State(state): State<ServerState>) -> Json<CatalogSnapshot> {
    Json(state.coordinator.snapshot())
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Product>> {
    state
        .catalog
        .get(&id)
        .map(Json)
        .ok_or_else(|| AppError::product_not_found(&id))
}

#[derive(Debug, Deserialize)]
pub struct ChangesQuery {
    #[serde(default)]
    pub since: u64,
}

/// Products committed after `since`
pub async fn changes(
    State(state): State<ServerState>,
    Query(query): Query<ChangesQuery>,
) -> Json<CatalogChanges> {
    Json(state.coordinator.changes_since(query.since))
}

/// Add a product
///
/// Body is a field map like an edit's, with every required field present.
/// An optional `id` picks the product id; otherwise one is generated.
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> AppResult<(StatusCode, Json<CommittedPayload>)> {
    let mut fields = json_body(payload)?;

    let id = match fields.remove("id") {
        None | Some(Value::Null) => Uuid::new_v4().to_string(),
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        Some(_) => {
            return Err(AppError::validation("id must be a non-empty string").with_detail("field", "id"));
        }
    };

    let product = ProductPatch::from_fields(&fields)?.into_product(id)?;
    let committed = state.coordinator.create_product(product).await?;
    Ok((StatusCode::CREATED, Json(committed)))
}
