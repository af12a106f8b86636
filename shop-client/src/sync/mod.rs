//! Optimistic catalog synchronization
//!
//! [`SyncAgent`] is the pure state machine; [`SyncSession`] drives it from a
//! [`MessageClient`](crate::MessageClient).

mod agent;
mod session;

pub use agent::{SyncAgent, SyncNotice, SyncState, TrackedProduct};
pub use session::SyncSession;
