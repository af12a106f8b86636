//! Sync Session
//!
//! Wires a [`MessageClient`] to a [`SyncAgent`]: a pump task decodes server
//! events, feeds them to the agent and re-broadcasts the resulting notices.
//! The agent lock is never held across an await.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use shared::message::{BusMessage, ChannelEvent};
use shared::models::Product;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::agent::{SyncAgent, SyncNotice, TrackedProduct};
use crate::error::ClientResult;
use crate::http::HttpClient;
use crate::message::{MessageClient, MessageClientConfig};

const NOTICE_CAPACITY: usize = 256;

/// A running synchronization session
#[derive(Debug, Clone)]
pub struct SyncSession {
    client: MessageClient,
    agent: Arc<Mutex<SyncAgent>>,
    notice_tx: broadcast::Sender<SyncNotice>,
    shutdown: CancellationToken,
}

impl SyncSession {
    /// Start pumping events from `client` into `agent`
    ///
    /// Subscribes before returning, so every event delivered afterwards is
    /// seen. Seed the agent (or call [`refetch`](Self::refetch)) after this.
    pub fn start(client: MessageClient, agent: SyncAgent, config: &MessageClientConfig) -> Self {
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);
        let session = Self {
            client,
            agent: Arc::new(Mutex::new(agent)),
            notice_tx,
            shutdown: CancellationToken::new(),
        };

        tokio::spawn(pump(
            session.client.subscribe(),
            session.client.closed().clone(),
            session.agent.clone(),
            session.notice_tx.clone(),
            session.shutdown.clone(),
            config.clone(),
        ));

        session
    }

    pub fn session_id(&self) -> &str {
        self.client.session_id()
    }

    pub fn client(&self) -> &MessageClient {
        &self.client
    }

    /// Notices for the UI (commits, failures, timeouts, staleness)
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notice_tx.subscribe()
    }

    /// Current view of one product
    pub fn product(&self, product_id: &str) -> Option<TrackedProduct> {
        self.agent.lock().get(product_id).cloned()
    }

    /// What the UI shows for every product
    pub fn shown(&self) -> Vec<Product> {
        self.agent.lock().products().map(|p| p.shown().clone()).collect()
    }

    pub fn has_stale(&self) -> bool {
        self.agent.lock().has_stale()
    }

    /// Apply an edit locally and send it
    ///
    /// Returns the request id. Validation failures are returned without
    /// touching the view or the channel. If sending fails the optimistic copy
    /// is rolled back.
    pub async fn submit_edit(
        &self,
        product_id: &str,
        fields: Map<String, Value>,
    ) -> ClientResult<String> {
        let payload = self.agent.lock().begin_edit(product_id, fields)?;

        if let Err(e) = self.client.submit_edit(&payload).await {
            tracing::warn!(
                session_id = %self.session_id(),
                request_id = %payload.request_id,
                "Failed to send edit: {}", e
            );
            self.agent
                .lock()
                .abandon_edit(product_id, &payload.request_id, &e.to_string());
            return Err(e.into());
        }

        tracing::debug!(
            session_id = %self.session_id(),
            request_id = %payload.request_id,
            product_id = %product_id,
            "Edit submitted"
        );
        Ok(payload.request_id)
    }

    /// Replace the whole view with a fresh catalog read
    pub async fn refetch(&self, http: &HttpClient) -> ClientResult<()> {
        let snapshot = http.catalog_snapshot().await?;
        tracing::debug!(version = snapshot.version, "Catalog refetched");
        self.agent.lock().apply_refetch(snapshot);
        Ok(())
    }

    /// Incremental catch-up from the last known version, refetching when the
    /// server cannot serve it
    pub async fn catch_up(&self, http: &HttpClient) -> ClientResult<()> {
        let since = self.agent.lock().cursor();
        let changes = http.catalog_changes(since).await?;
        let applied = self.agent.lock().apply_changes(changes);
        if !applied {
            tracing::debug!(since, "Changes unavailable, falling back to refetch");
            self.refetch(http).await?;
        }
        Ok(())
    }

    /// Stop the pump and close the channel
    pub async fn shutdown(&self) -> ClientResult<()> {
        self.shutdown.cancel();
        self.client.close().await?;
        Ok(())
    }
}

async fn pump(
    mut events: broadcast::Receiver<BusMessage>,
    closed: CancellationToken,
    agent: Arc<Mutex<SyncAgent>>,
    notice_tx: broadcast::Sender<SyncNotice>,
    shutdown: CancellationToken,
    config: MessageClientConfig,
) {
    let mut sweep = tokio::time::interval(config.sweep_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let notify = |notice: SyncNotice| {
        tracing::debug!(?notice, "Sync notice");
        let _ = notice_tx.send(notice);
    };

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            _ = closed.cancelled() => {
                agent.lock().mark_all_stale();
                notify(SyncNotice::Disconnected);
                break;
            }

            _ = sweep.tick() => {
                let notices = agent.lock().expire_pending(Instant::now(), config.edit_timeout);
                for notice in notices {
                    notify(notice);
                }
            }

            result = events.recv() => match result {
                Ok(msg) => {
                    let event = match ChannelEvent::try_from(&msg) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!(event_type = %msg.event_type, "Dropping undecodable event: {}", e);
                            continue;
                        }
                    };
                    let notice = agent.lock().handle_event(&event);
                    if let Some(notice) = notice {
                        notify(notice);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // The local fan-out dropped events; same remedy as a server resync
                    agent.lock().mark_all_stale();
                    notify(SyncNotice::Resync { dropped: n });
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    tracing::debug!("Sync pump stopped");
}
