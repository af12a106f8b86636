//! 消息总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                           │
//! │  ┌──────────────────────┐  ┌──────────────────────────┐  │
//! │  │ client_tx (上行)     │  │ server_tx (下行/广播)    │  │
//! │  └──────────────────────┘  └──────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//!               ┌──────────┴──────────┐
//!               │    Transport Trait  │
//!               └──────────┬──────────┘
//!                          ▼
//!                    TcpTransport
//! ```
//!
//! # 消息流
//!
//! ```text
//! Session ──▶ send_to_server() ──▶ client_tx ──▶ MessageHandler ──▶ MutationCoordinator
//!                                                                        │
//! Coordinator ──▶ publish() ────▶ server_tx ──▶ 每个连接的 forwarder ◀────┘
//!                                              (按 target 过滤)
//! ```

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::ConnectedClient;
use super::transport::Transport;
use crate::utils::AppError;

/// 事件通道参数
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tcp_listen_addr: String,
    /// 上下行两个广播通道各自的容量
    pub channel_capacity: usize,
    /// 新连接必须在此时限内发来握手
    pub handshake_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:8081".to_string(),
            channel_capacity: 1024,
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// 会话与协调器之间的事件路由
///
/// 上行只有 MessageHandler 一个消费者；下行由每个会话各自订阅，
/// 慢会话只会让自己 lag，不会拖住协调器。
#[derive(Debug, Clone)]
pub struct MessageBus {
    upstream: broadcast::Sender<BusMessage>,
    downstream: broadcast::Sender<BusMessage>,
    pub(crate) config: TransportConfig,
    shutdown_token: CancellationToken,
    /// session id -> 该会话的传输
    pub(crate) clients: Arc<DashMap<String, Arc<dyn Transport>>>,
}

impl MessageBus {
    pub fn from_config(config: TransportConfig) -> Self {
        let (upstream, _) = broadcast::channel(config.channel_capacity);
        let (downstream, _) = broadcast::channel(config.channel_capacity);
        Self {
            upstream,
            downstream,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
        }
    }

    pub fn with_capacity(channel_capacity: usize) -> Self {
        Self::from_config(TransportConfig {
            channel_capacity,
            ..TransportConfig::default()
        })
    }

    /// 下发事件；带 target 的只有目标会话会收到
    ///
    /// 没有任何会话订阅时返回错误，调用方通常只记日志。
    pub fn publish(&self, msg: BusMessage) -> Result<(), AppError> {
        self.downstream
            .send(msg)
            .map(|_| ())
            .map_err(|_| AppError::internal("No session subscribed to the catalog channel"))
    }

    /// 把会话提交的编辑交给 MessageHandler
    pub fn send_to_server(&self, msg: BusMessage) -> Result<(), AppError> {
        self.upstream
            .send(msg)
            .map(|_| ())
            .map_err(|_| AppError::internal("Message handler is not running"))
    }

    pub fn subscribe_to_clients(&self) -> broadcast::Receiver<BusMessage> {
        self.upstream.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.downstream.subscribe()
    }

    /// 进程内会话直接挂在这两个通道上
    pub fn sender_to_server(&self) -> &broadcast::Sender<BusMessage> {
        &self.upstream
    }

    pub fn sender(&self) -> &broadcast::Sender<BusMessage> {
        &self.downstream
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    pub fn connected_sessions(&self) -> usize {
        self.clients.len()
    }

    pub fn get_connected_clients(&self) -> Vec<ConnectedClient> {
        let mut sessions: Vec<ConnectedClient> = self
            .clients
            .iter()
            .map(|entry| ConnectedClient {
                id: entry.key().clone(),
                addr: entry.value().peer_addr(),
            })
            .collect();
        sessions.sort_by(|a, b| a.id.cmp(&b.id));
        sessions
    }

    /// 停止接入、handler 与所有 worker
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}
