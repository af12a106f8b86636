//! Message Handler for server-side message processing
//!
//! Consumes the upstream channel on a single task, so messages reach their
//! processor in arrival order. Edits are not retried here: a rejected edit is
//! reported to its session and the session decides what to do.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::catalog::MutationCoordinator;
use crate::message::processor::{MessageProcessor, ProcessResult, SubmitEditProcessor};
use crate::message::{BusMessage, EventType};
use crate::utils::AppError;

pub struct MessageHandler {
    receiver: broadcast::Receiver<BusMessage>,
    shutdown_token: CancellationToken,
    processors: HashMap<EventType, Arc<dyn MessageProcessor>>,
}

impl MessageHandler {
    pub fn new(receiver: broadcast::Receiver<BusMessage>, shutdown_token: CancellationToken) -> Self {
        Self {
            receiver,
            shutdown_token,
            processors: HashMap::new(),
        }
    }

    /// Register a processor for a specific event type
    pub fn register_processor(mut self, processor: Arc<dyn MessageProcessor>) -> Self {
        let event_type = processor.event_type();
        self.processors.insert(event_type, processor);
        self
    }

    /// Create a handler with the catalog processors
    pub fn with_default_processors(
        receiver: broadcast::Receiver<BusMessage>,
        shutdown_token: CancellationToken,
        coordinator: MutationCoordinator,
    ) -> Self {
        Self::new(receiver, shutdown_token)
            .register_processor(Arc::new(SubmitEditProcessor::new(coordinator)))
    }

    /// Start processing messages
    ///
    /// Long-running; spawn it in the background.
    pub async fn run(mut self) {
        tracing::info!("Message handler started");

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Message handler shutting down");
                    break;
                }

                msg_result = self.receiver.recv() => {
                    match msg_result {
                        Ok(msg) => {
                            if let Err(e) = self.handle_message(&msg).await {
                                tracing::error!("Failed to handle message: {}", e);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Skipped edits never reach the coordinator; their sessions time out
                            tracing::warn!("Message handler lagged, skipped {} messages", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Message channel closed");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("Message handler stopped");
    }

    async fn handle_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        let Some(processor) = self.processors.get(&msg.event_type) else {
            tracing::warn!(
                event_type = %msg.event_type,
                source = ?msg.source,
                "No processor registered, message dropped"
            );
            return Ok(());
        };

        match processor.process(msg).await? {
            ProcessResult::Success { message } => {
                tracing::debug!(event_type = %msg.event_type, result = %message, "Message processed");
            }
            ProcessResult::Skipped { reason } => {
                tracing::info!(event_type = %msg.event_type, reason = %reason, "Message skipped");
            }
            ProcessResult::Failed { reason } => {
                tracing::warn!(
                    event_type = %msg.event_type,
                    source = ?msg.source,
                    reason = %reason,
                    "Message rejected"
                );
            }
        }
        Ok(())
    }
}
