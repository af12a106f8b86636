#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use rust_decimal::Decimal;
use shared::models::Product;
use shop_client::{MessageClient, MessageClientConfig, SyncAgent, SyncSession};
use shop_server::{Config, ServerState};

pub fn product(id: &str, stock: u32, price: i64) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        category: "Milk".to_string(),
        description: String::new(),
        price: Decimal::from(price),
        discount: Decimal::ZERO,
        stock,
        threshold: 10,
        shelf_life: 7,
        quantity_unit: "Litre".to_string(),
        nutrition: BTreeMap::new(),
        images: vec![],
    }
}

/// Server state with background tasks running
pub fn start_state(products: Vec<Product>) -> ServerState {
    start_state_with(products, |_| {})
}

/// Same as [`start_state`] with config tweaks applied first
pub fn start_state_with(products: Vec<Product>, tune: impl FnOnce(&mut Config)) -> ServerState {
    let mut config = Config::with_overrides(0, 0);
    config.channel_capacity = 1024;
    config.dedup_capacity = 64;
    tune(&mut config);
    let state = ServerState::with_catalog(&config, products);
    state.start_background_tasks();
    state
}

/// In-process session seeded from the current catalog
pub fn open_session(state: &ServerState, session_id: &str) -> SyncSession {
    let bus = state.message_bus();
    let client = MessageClient::memory(bus.sender(), bus.sender_to_server(), session_id);
    let agent = SyncAgent::from_snapshot(state.coordinator.snapshot());
    SyncSession::start(client, agent, &MessageClientConfig::default())
}

/// Poll until `check` holds, panicking after two seconds
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
