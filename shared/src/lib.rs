//! Shared types for the storefront
//!
//! Entity schemas, wire payloads and the unified error system used by
//! both `shop-server` and `shop-client`.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

// Message bus re-exports (for convenient access)
pub use message::{BusMessage, ChannelEvent, EventType};
