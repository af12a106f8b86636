use std::sync::Arc;
use std::time::Duration;

use shared::models::Product;

use crate::catalog::{CatalogStore, MemoryCatalogStore, MutationCoordinator};
use crate::core::Config;
use crate::message::{MessageBus, MessageHandler, TransportConfig};
use crate::orders::{MemoryOrderStore, OrdersManager};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，作为 axum `State` 传给每个 handler。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | catalog | 商品存储，只读访问；写入必须经过 coordinator |
/// | orders | 订单管理 |
/// | coordinator | 商品编辑的唯一写入口 |
/// | message_bus | 事件通道 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: OrdersManager,
    pub coordinator: MutationCoordinator,
    pub message_bus: Arc<MessageBus>,
}

impl ServerState {
    /// 初始化服务器状态 (空商品目录)
    pub fn initialize(config: &Config) -> Self {
        Self::with_catalog(config, Vec::new())
    }

    /// 使用预置商品初始化
    pub fn with_catalog(config: &Config, products: Vec<Product>) -> Self {
        let message_bus = Arc::new(MessageBus::from_config(TransportConfig {
            tcp_listen_addr: config.tcp_listen_addr(),
            channel_capacity: config.channel_capacity,
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
        }));

        let catalog: Arc<dyn CatalogStore> = Arc::new(MemoryCatalogStore::with_products(products));
        let coordinator =
            MutationCoordinator::new(catalog.clone(), message_bus.clone(), config.dedup_capacity);
        let orders = OrdersManager::new(Arc::new(MemoryOrderStore::new()), catalog.clone());

        Self {
            config: config.clone(),
            catalog,
            orders,
            coordinator,
            message_bus,
        }
    }

    /// 启动后台任务
    ///
    /// 目前只有 MessageHandler。必须在接受会话之前调用，否则上行消息无人消费。
    pub fn start_background_tasks(&self) {
        let handler = MessageHandler::with_default_processors(
            self.message_bus.subscribe_to_clients(),
            self.message_bus.shutdown_token().clone(),
            self.coordinator.clone(),
        );
        tokio::spawn(handler.run());
        tracing::debug!("Background tasks started");
    }

    pub fn message_bus(&self) -> &Arc<MessageBus> {
        &self.message_bus
    }
}
