//! Order API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /order/new-order | POST | 下单 (Pending) |
//! | /order/get-user-orders | POST | 某用户的订单 |
//! | /order/get-all-orders | POST | 全部订单 |
//! | /order/confirm-order | PUT | 推进到下一状态 |
//! | /order/reject-order | PUT | 取消 |
//! | /order/summary | GET | 按状态统计 |
//! | /order/{id} | GET | 订单详情 |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/order", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/new-order", post(handler::create))
        .route("/get-user-orders", post(handler::list_for_user))
        .route("/get-all-orders", post(handler::list_all))
        .route("/confirm-order", put(handler::confirm))
        .route("/reject-order", put(handler::reject))
        .route("/summary", get(handler::summary))
        .route("/{id}", get(handler::get_by_id))
}
