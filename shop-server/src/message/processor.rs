//! Message Processor Trait
//!
//! One processor per upstream event type. Processors run on the handler task,
//! in the order messages arrived on the bus.

use async_trait::async_trait;
use shared::message::{BusMessage, ChannelEvent, EventType, FailedPayload};

use crate::catalog::{EditRequest, MutationCoordinator};
use crate::utils::{AppError, ErrorCode};

/// Result of message processing
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// Message accepted
    Success { message: String },
    /// Message rejected, the originator has been told
    Failed { reason: String },
    /// Message ignored
    Skipped { reason: String },
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessResult::Success { .. })
    }
}

#[async_trait]
pub trait MessageProcessor: Send + Sync {
    /// Get the event type this processor handles
    fn event_type(&self) -> EventType;

    async fn process(&self, msg: &BusMessage) -> Result<ProcessResult, AppError>;
}

/// Hands catalog edits to the [`MutationCoordinator`]
///
/// Does not wait for the outcome: the coordinator publishes Committed or
/// Failed itself, and waiting here would serialize edits to unrelated
/// products behind each other.
pub struct SubmitEditProcessor {
    coordinator: MutationCoordinator,
}

impl SubmitEditProcessor {
    pub fn new(coordinator: MutationCoordinator) -> Self {
        Self { coordinator }
    }

    /// Tell the originator its message could not be decoded
    fn reject_malformed(&self, msg: &BusMessage, err: &AppError) {
        // Recover the requestId from raw JSON so the session can match the failure
        let request_id = serde_json::from_slice::<serde_json::Value>(&msg.payload)
            .ok()
            .and_then(|v| v.get("requestId").and_then(|r| r.as_str()).map(String::from))
            .unwrap_or_else(|| msg.request_id.to_string());
        let product_id = serde_json::from_slice::<serde_json::Value>(&msg.payload)
            .ok()
            .and_then(|v| v.get("productId").and_then(|r| r.as_str()).map(String::from))
            .unwrap_or_default();

        let payload = FailedPayload {
            request_id,
            product_id,
            message: err.message.clone(),
            code: ErrorCode::InvalidRequest,
        };

        let Some(source) = msg.source.as_deref() else {
            return;
        };
        match BusMessage::failed(&payload) {
            Ok(failed) => {
                if let Err(e) = self.coordinator.bus().publish(failed.with_target(source)) {
                    tracing::debug!("Failed event not delivered: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to encode failed event: {}", e),
        }
    }
}

#[async_trait]
impl MessageProcessor for SubmitEditProcessor {
    fn event_type(&self) -> EventType {
        EventType::SubmitEdit
    }

    async fn process(&self, msg: &BusMessage) -> Result<ProcessResult, AppError> {
        let payload = match ChannelEvent::try_from(msg) {
            Ok(ChannelEvent::SubmitEdit(payload)) => payload,
            Ok(other) => {
                return Ok(ProcessResult::Skipped {
                    reason: format!("Unexpected {} event", other.event_type()),
                });
            }
            Err(e) => {
                self.reject_malformed(msg, &e);
                return Ok(ProcessResult::Failed { reason: e.message });
            }
        };

        let request_id = payload.request_id.clone();
        let product_id = payload.product_id.clone();

        // The receiver is dropped: the outcome reaches the session over the bus
        let _ = self
            .coordinator
            .intake(EditRequest::from_payload(payload, msg.source.clone()));

        Ok(ProcessResult::Success {
            message: format!("Edit {request_id} queued for product {product_id}"),
        })
    }
}
