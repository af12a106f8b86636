//! Client Synchronization Agent
//!
//! Holds the session's optimistic copy of the displayed products and
//! reconciles it against server events. The agent performs no I/O: the
//! caller feeds it events and sends what it returns.
//!
//! ```text
//!            begin_edit                committed (newer)
//! Committed ───────────▶ Pending ─────────────────────▶ Committed
//!     ▲                    │  │
//!     │ refetch            │  └─ failed (own) ──▶ Failed  (rolled back)
//!     │                    └──── timeout ──────▶ Stale   (rolled back)
//!   Stale ◀── resync / disconnect (any state)
//! ```
//!
//! Server state always wins: a `committed` event replaces the shown product
//! even when it came from another session's edit.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::message::{ChannelEvent, CommittedPayload, FailedPayload, SubmitEditPayload};
use shared::models::{CatalogChanges, CatalogSnapshot, Product, ProductPatch};
use shared::util::new_request_id;

/// Reconciliation tag of one displayed product
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Shows the last committed server state
    Committed,
    /// Shows a local edit the server has not answered yet
    Pending,
    /// The last own edit was rejected and rolled back
    Failed,
    /// May be behind the server; needs a refetch
    Stale,
}

#[derive(Debug, Clone)]
struct PendingEdit {
    request_id: String,
    submitted_at: Instant,
}

/// One product as the session currently sees it
#[derive(Debug, Clone)]
pub struct TrackedProduct {
    shown: Product,
    committed: Product,
    version: u64,
    state: SyncState,
    pending: Option<PendingEdit>,
    last_error: Option<String>,
}

impl TrackedProduct {
    fn new(product: Product, version: u64) -> Self {
        Self {
            shown: product.clone(),
            committed: product,
            version,
            state: SyncState::Committed,
            pending: None,
            last_error: None,
        }
    }

    /// What the UI should display
    pub fn shown(&self) -> &Product {
        &self.shown
    }

    /// Last state confirmed by the server
    pub fn committed(&self) -> &Product {
        &self.committed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn pending_request(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.request_id.as_str())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn rollback(&mut self) {
        self.shown = self.committed.clone();
        self.pending = None;
    }

    /// A read confirmed nothing newer was missed for this product
    fn refreshed(&mut self) {
        if self.state == SyncState::Stale {
            self.state = SyncState::Committed;
            self.last_error = None;
        }
    }
}

/// Something the user should be told about
#[derive(Debug, Clone, PartialEq)]
pub enum SyncNotice {
    /// A product was replaced by committed server state
    Committed {
        product_id: String,
        request_id: String,
        message: String,
        /// The commit answered this session's pending edit
        own: bool,
    },
    /// An edit was rejected
    Failed {
        product_id: String,
        request_id: String,
        message: String,
        code: ErrorCode,
        /// False when the edit was no longer pending (superseded or expired)
        rolled_back: bool,
    },
    /// No answer within the edit timeout; the product is now stale
    TimedOut {
        product_id: String,
        request_id: String,
    },
    /// The channel dropped events; every product is stale
    Resync { dropped: u64 },
    /// The channel is gone; every product is stale
    Disconnected,
}

impl SyncNotice {
    /// Human-readable text for the notification
    pub fn message(&self) -> String {
        match self {
            SyncNotice::Committed { message, .. } => message.clone(),
            SyncNotice::Failed { message, .. } => message.clone(),
            SyncNotice::TimedOut { product_id, .. } => format!(
                "No response for the edit to product {product_id}; refresh to see the current state"
            ),
            SyncNotice::Resync { dropped } => {
                format!("Missed {dropped} updates; refresh to see the current catalog")
            }
            SyncNotice::Disconnected => {
                "Connection lost; refresh to see the current catalog".to_string()
            }
        }
    }

    /// Whether this notice reports a failure
    pub fn is_failure(&self) -> bool {
        !matches!(self, SyncNotice::Committed { .. })
    }
}

/// Per-session optimistic catalog view
#[derive(Debug, Default)]
pub struct SyncAgent {
    products: BTreeMap<String, TrackedProduct>,
    /// Commit sequence the whole view was last refreshed to
    cursor: u64,
}

impl SyncAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full catalog read
    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut agent = Self::new();
        agent.apply_refetch(snapshot);
        agent
    }

    pub fn get(&self, product_id: &str) -> Option<&TrackedProduct> {
        self.products.get(product_id)
    }

    pub fn products(&self) -> impl Iterator<Item = &TrackedProduct> {
        self.products.values()
    }

    /// Version to ask `changes since` from
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn has_stale(&self) -> bool {
        self.products.values().any(|p| p.state == SyncState::Stale)
    }

    /// Apply a local edit optimistically
    ///
    /// Returns the payload to send. The edit is validated with the same rules
    /// the server uses, so malformed input never leaves the session. A newer
    /// edit supersedes one still pending on the same product.
    pub fn begin_edit(
        &mut self,
        product_id: &str,
        fields: Map<String, Value>,
    ) -> AppResult<SubmitEditPayload> {
        let entry = self
            .products
            .get_mut(product_id)
            .ok_or_else(|| AppError::product_not_found(product_id))?;

        if entry.state == SyncState::Stale {
            return Err(AppError::conflict_timeout(format!(
                "Product {product_id} is stale, refresh before editing"
            )));
        }

        let patch = ProductPatch::from_fields(&fields)?;
        patch.apply_to(&mut entry.shown);

        let request_id = new_request_id();
        entry.pending = Some(PendingEdit {
            request_id: request_id.clone(),
            submitted_at: Instant::now(),
        });
        entry.state = SyncState::Pending;
        entry.last_error = None;

        Ok(SubmitEditPayload {
            request_id,
            product_id: product_id.to_string(),
            fields,
        })
    }

    /// Roll back an edit that could not be sent
    pub fn abandon_edit(&mut self, product_id: &str, request_id: &str, reason: &str) {
        if let Some(entry) = self.products.get_mut(product_id)
            && entry.pending_request() == Some(request_id)
        {
            entry.rollback();
            entry.state = SyncState::Failed;
            entry.last_error = Some(reason.to_string());
        }
    }

    /// Reconcile one server event
    pub fn handle_event(&mut self, event: &ChannelEvent) -> Option<SyncNotice> {
        match event {
            ChannelEvent::Committed(payload) => self.on_committed(payload),
            ChannelEvent::Failed(payload) => Some(self.on_failed(payload)),
            ChannelEvent::Resync(payload) => {
                self.mark_all_stale();
                Some(SyncNotice::Resync {
                    dropped: payload.dropped,
                })
            }
            ChannelEvent::Handshake(_) | ChannelEvent::SubmitEdit(_) | ChannelEvent::Response(_) => {
                None
            }
        }
    }

    fn on_committed(&mut self, payload: &CommittedPayload) -> Option<SyncNotice> {
        let entry = self.products.get_mut(&payload.product.id)?;
        let own = entry.pending_request() == Some(payload.request_id.as_str());

        if payload.version <= entry.version {
            // Already reflected; a replayed answer still settles our pending edit
            if own {
                entry.rollback();
                if entry.state != SyncState::Stale {
                    entry.state = SyncState::Committed;
                }
            }
            return None;
        }

        entry.committed = payload.product.clone();
        entry.version = payload.version;
        entry.rollback();
        if entry.state != SyncState::Stale {
            entry.state = SyncState::Committed;
            entry.last_error = None;
        }

        Some(SyncNotice::Committed {
            product_id: payload.product.id.clone(),
            request_id: payload.request_id.clone(),
            message: payload.message.clone(),
            own,
        })
    }

    fn on_failed(&mut self, payload: &FailedPayload) -> SyncNotice {
        let mut rolled_back = false;
        if let Some(entry) = self.products.get_mut(&payload.product_id)
            && entry.pending_request() == Some(payload.request_id.as_str())
        {
            entry.rollback();
            entry.state = SyncState::Failed;
            entry.last_error = Some(payload.message.clone());
            rolled_back = true;
        }

        SyncNotice::Failed {
            product_id: payload.product_id.clone(),
            request_id: payload.request_id.clone(),
            message: payload.message.clone(),
            code: payload.code,
            rolled_back,
        }
    }

    /// Turn edits pending longer than `timeout` into stale products
    ///
    /// The edit is not resubmitted: it may still commit on the server.
    pub fn expire_pending(&mut self, now: Instant, timeout: Duration) -> Vec<SyncNotice> {
        let mut notices = Vec::new();
        for entry in self.products.values_mut() {
            let Some(pending) = &entry.pending else {
                continue;
            };
            if now.saturating_duration_since(pending.submitted_at) < timeout {
                continue;
            }
            let request_id = pending.request_id.clone();
            entry.rollback();
            entry.state = SyncState::Stale;
            entry.last_error = Some(ErrorCode::ConflictTimeout.message().to_string());
            notices.push(SyncNotice::TimedOut {
                product_id: entry.committed.id.clone(),
                request_id,
            });
        }
        notices
    }

    /// Mark every product stale (missed events or lost connection)
    pub fn mark_all_stale(&mut self) {
        for entry in self.products.values_mut() {
            entry.rollback();
            entry.state = SyncState::Stale;
        }
    }

    /// Replace the whole view with a fresh catalog read
    ///
    /// Pending edits are forgotten; if they commit later the event is newer
    /// than the snapshot and is applied normally. A product whose commit
    /// arrived over the channel after the snapshot was taken keeps that
    /// newer state.
    pub fn apply_refetch(&mut self, snapshot: CatalogSnapshot) {
        let version = snapshot.version;
        let mut previous = std::mem::take(&mut self.products);

        for product in snapshot.products {
            let entry = match previous.remove(&product.id) {
                Some(mut entry) if entry.version > version => {
                    entry.refreshed();
                    entry
                }
                _ => TrackedProduct::new(product, version),
            };
            self.products.insert(entry.committed.id.clone(), entry);
        }
        // Created after the snapshot and already seen committed
        for (id, mut entry) in previous {
            if entry.version > version {
                entry.refreshed();
                self.products.insert(id, entry);
            }
        }
        self.cursor = version;
    }

    /// Apply an incremental catch-up
    ///
    /// Returns `false` when the server asks for a full refetch instead; the
    /// view is left untouched in that case.
    pub fn apply_changes(&mut self, changes: CatalogChanges) -> bool {
        if changes.full_refetch {
            return false;
        }

        for product in changes.products {
            match self.products.get_mut(&product.id) {
                Some(entry) if entry.version > changes.version => {}
                Some(entry) => {
                    entry.committed = product;
                    entry.version = changes.version;
                }
                None => {
                    self.products.insert(
                        product.id.clone(),
                        TrackedProduct::new(product, changes.version),
                    );
                }
            }
        }

        // Everything not listed is unchanged since the cursor, so the whole
        // view is now current as of `changes.version`
        for entry in self.products.values_mut() {
            if entry.version > changes.version {
                entry.refreshed();
                continue;
            }
            entry.version = changes.version;
            entry.rollback();
            entry.state = SyncState::Committed;
            entry.last_error = None;
        }
        self.cursor = changes.version;
        true
    }
}
