//! Shop Server - 商品目录与订单服务
//!
//! # 架构概述
//!
//! - **商品目录** (`catalog`): 内存存储 + 按商品串行化的编辑协调器
//! - **订单** (`orders`): 订单存储与状态机
//! - **消息总线** (`message`): TCP / 进程内会话的实时事件通道
//! - **HTTP API** (`api`): 订单接口与目录读取
//!
//! # 模块结构
//!
//! ```text
//! shop-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── catalog/       # CatalogStore、MutationCoordinator
//! ├── orders/        # OrdersManager、状态机
//! ├── message/       # 总线、TCP 服务器、handler
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod catalog;
pub mod core;
pub mod message;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use catalog::{CatalogStore, MemoryCatalogStore, MutationCoordinator};
pub use core::{Config, Server, ServerState};
pub use message::{BusMessage, EventType, MessageBus};
pub use orders::OrdersManager;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($fields:tt)*) => {
        tracing::warn!(
            target: "security",
            level = $level,
            event = $event,
            $($fields)*
        );
    };
}

/// 按配置初始化日志
pub fn setup_environment(config: &Config) {
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
}
