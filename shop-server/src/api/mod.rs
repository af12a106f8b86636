//! API 路由模块
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单接口
//! - [`products`] - 商品目录读取与新增
//!
//! 成功响应直接返回实体 JSON；失败响应统一为 `ApiResponse` 错误体
//! (由 [`AppError`] 的 `IntoResponse` 生成)。

pub mod health;
pub mod orders;
pub mod products;

use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::http::Uri;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(orders::router())
        .merge(products::router())
        .merge(health::router())
        .fallback(route_not_found)
}

async fn route_not_found(uri: Uri) -> AppError {
    AppError::not_found(format!("Route {}", uri.path()))
}

/// Build the fully configured application
///
/// Used by the HTTP server and by tests driving it through `oneshot`.
pub fn build_app(state: &ServerState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_millis(
            state.config.request_timeout_ms,
        )))
        .with_state(state.clone())
}

/// Unwrap a JSON body, turning axum's rejection into a validation error
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(format!("Invalid request body: {}", rejection.body_text())))
}
