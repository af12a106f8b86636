//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 简单健康检查 |
//!
//! ```json
//! {
//!   "status": "ok",
//!   "version": "0.1.0",
//!   "connected_sessions": 1,
//!   "sessions": [{ "id": "till-1", "addr": "10.0.0.5:53122" }]
//! }
//! ```

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::message::ConnectedClient;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// 已登记的 TCP 会话数 (进程内会话不计)
    connected_sessions: usize,
    sessions: Vec<ConnectedClient>,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let sessions = state.message_bus.get_connected_clients();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        connected_sessions: sessions.len(),
        sessions,
    })
}
