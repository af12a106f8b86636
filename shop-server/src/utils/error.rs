//! 统一错误处理
//!
//! 服务端直接复用 `shared::error` 的错误体系：
//! - [`AppError`] 实现了 axum `IntoResponse`，处理器可以直接返回
//! - 错误码决定 HTTP 状态码，见 [`ErrorCode::http_status`]
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::order_not_found(&order_id))
//!
//! // 返回成功响应
//! Ok(Json(order))
//! ```

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
