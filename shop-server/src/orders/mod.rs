//! 订单模块
//!
//! ```text
//! REST ─▶ OrdersManager ─▶ state_machine::transition ─▶ OrderStore
//! ```
//!
//! 订单状态变更不广播，客户端通过 REST 轮询/刷新获取最新状态。

pub mod error;
pub mod manager;
pub mod state_machine;
pub mod store;

pub use error::OrderError;
pub use manager::OrdersManager;
pub use store::{MemoryOrderStore, OrderStore};

// Re-export shared types for convenience
pub use shared::models::{Order, OrderStatus, OrderSummary};
