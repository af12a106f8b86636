//! Shop Client - session side of the shop server
//!
//! - [`HttpClient`]: REST calls for orders and catalog refetch
//! - [`MessageClient`]: event channel over TCP or in-process
//! - [`SyncAgent`] / [`SyncSession`]: optimistic catalog view reconciled
//!   against server events

pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod sync;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;

pub use message::{BusMessage, EventType, MessageClient, MessageClientConfig, MessageError};
pub use sync::{SyncAgent, SyncNotice, SyncSession, SyncState, TrackedProduct};

// Re-export shared types for convenience
pub use shared::error::{ApiResponse, AppError, ErrorCode};
