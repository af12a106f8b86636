//! 消息模块 - 事件通道客户端
//!
//! ```text
//! MessageClient ──▶ ClientTransport ──┬── TcpTransport (网络会话)
//!                                     └── MemoryTransport (同进程会话)
//! ```

mod client;
mod transport;

pub use client::MessageClient;
pub use shared::message::{BusMessage, EventType};
pub use transport::{MemoryTransport, TcpTransport, Transport};

use std::time::Duration;
use thiserror::Error;

/// 事件通道错误
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Handshake rejected: {0}")]
    Handshake(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 消息客户端配置
#[derive(Debug, Clone)]
pub struct MessageClientConfig {
    /// 编辑等待 committed/failed 的时限，超时后标记 stale
    pub edit_timeout: Duration,
    /// 握手响应时限
    pub handshake_timeout: Duration,
    /// 检查超时编辑的间隔
    pub sweep_interval: Duration,
    /// 本地事件广播容量
    pub event_capacity: usize,
}

impl Default for MessageClientConfig {
    fn default() -> Self {
        Self {
            edit_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(3),
            sweep_interval: Duration::from_millis(500),
            event_capacity: 1024,
        }
    }
}

impl MessageClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置编辑超时
    pub fn with_edit_timeout(mut self, timeout: Duration) -> Self {
        self.edit_timeout = timeout;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
