//! Product API Module
//!
//! Read-only access for refetch, plus product creation. Edits to existing
//! products only go through the message channel.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Product router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/product", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/all", get(handler::snapshot))
        .route("/changes", get(handler::changes))
        .route("/new-product", post(handler::create))
        .route("/{id}", get(handler::get_by_id))
}
