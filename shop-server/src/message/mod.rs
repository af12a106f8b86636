//! Message channel for catalog sessions
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           MessageBus                     │
//! │  client_tx (上行)   server_tx (下行)     │
//! └────────────────┬────────────────────────┘
//!                  │
//!         ┌────────┴────────┐
//!         │ Transport Trait │
//!         └────────┬────────┘
//!                  ▼
//!            TcpTransport
//! ```
//!
//! In-process sessions skip the transport and talk to the two channels
//! directly (see `shop_client::message::MemoryTransport`).

pub mod bus;
pub mod handler;
pub mod processor;
mod tcp_server;
pub mod transport;

pub use bus::{MessageBus, TransportConfig};
pub use handler::MessageHandler;
pub use processor::{MessageProcessor, ProcessResult, SubmitEditProcessor};
pub use shared::message::{
    BusMessage, ChannelEvent, CommittedPayload, EventType, FailedPayload, SubmitEditPayload,
};

use serde::Serialize;

/// A registered network session
#[derive(Debug, Clone, Serialize)]
pub struct ConnectedClient {
    pub id: String,
    pub addr: Option<String>,
}
