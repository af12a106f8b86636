//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::api::json_body;
use crate::core::ServerState;
use crate::utils::AppResult;
use shared::models::{
    ConfirmOrderRequest, Order, OrderCreate, OrderList, OrderSummary, RejectOrderRequest,
    UserOrdersRequest,
};

/// Place an order
pub async fn create(
    State(state): State<ServerState>,
    payload: Result<Json<OrderCreate>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.orders.create(json_body(payload)?)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Orders of one user, newest first
pub async fn list_for_user(
    State(state): State<ServerState>,
    payload: Result<Json<UserOrdersRequest>, JsonRejection>,
) -> AppResult<Json<OrderList>> {
    let request = json_body(payload)?;
    Ok(Json(OrderList {
        orders: state.orders.list_for_user(&request.user_id),
    }))
}

/// Every order, newest first
pub async fn list_all(State(state): State<ServerState>) -> Json<OrderList> {
    Json(OrderList {
        orders: state.orders.list_all(),
    })
}

pub async fn confirm(
    State(state): State<ServerState>,
    payload: Result<Json<ConfirmOrderRequest>, JsonRejection>,
) -> AppResult<Json<Order>> {
    let request = json_body(payload)?;
    let order = state.orders.confirm(&request.order_id, request.status)?;
    Ok(Json(order))
}

pub async fn reject(
    State(state): State<ServerState>,
    payload: Result<Json<RejectOrderRequest>, JsonRejection>,
) -> AppResult<Json<Order>> {
    let request = json_body(payload)?;
    let order = state.orders.reject(&request.order_id)?;
    Ok(Json(order))
}

pub async fn summary(State(state): State<ServerState>) -> Json<OrderSummary> {
    Json(state.orders.summary())
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.get(&id)?))
}
