//! Mutation Coordinator
//!
//! Accepts catalog edits, serializes them per product, applies them to the
//! [`CatalogStore`] and announces the outcome on the message bus.
//!
//! ```text
//! submitEdit ─▶ intake() ─▶ validate, product exists? ──no──▶ Failed ─▶ originator
//!                              │
//!                              ▼
//!                   per-product FIFO queue ─▶ worker (one per product)
//!                                               │
//!                                  dedup ─▶ store.apply ─▶ Committed ─▶ every session
//!                                               └─ error ─▶ Failed ─▶ originator
//! ```
//!
//! Intake order is authoritative: `intake` is synchronous, so whichever caller
//! reaches it first is queued first. Workers for different products run
//! independently and never share a lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use shared::message::{BusMessage, CommittedPayload, FailedPayload, SubmitEditPayload};
use shared::models::{CatalogChanges, CatalogSnapshot, Product, ProductPatch};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::store::CatalogStore;
use crate::message::MessageBus;
use crate::utils::{AppError, AppResult};

/// A catalog edit as received from a session
#[derive(Debug, Clone)]
pub struct EditRequest {
    pub request_id: String,
    pub product_id: String,
    pub fields: Map<String, Value>,
    /// Originating session, `None` for server-internal callers
    pub session_id: Option<String>,
}

impl EditRequest {
    pub fn from_payload(payload: SubmitEditPayload, session_id: Option<String>) -> Self {
        Self {
            request_id: payload.request_id,
            product_id: payload.product_id,
            fields: payload.fields,
            session_id,
        }
    }
}

/// Result of one edit, identical to what the originator is sent
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Committed(CommittedPayload),
    Failed(FailedPayload),
}

impl EditOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, EditOutcome::Committed(_))
    }

    pub fn request_id(&self) -> &str {
        match self {
            EditOutcome::Committed(p) => &p.request_id,
            EditOutcome::Failed(p) => &p.request_id,
        }
    }

    pub fn into_result(self) -> AppResult<CommittedPayload> {
        match self {
            EditOutcome::Committed(p) => Ok(p),
            EditOutcome::Failed(p) => Err(AppError::with_message(p.code, p.message)),
        }
    }
}

enum Job {
    Edit {
        request: EditRequest,
        patch: ProductPatch,
        reply: oneshot::Sender<EditOutcome>,
    },
    Create {
        product: Product,
        reply: oneshot::Sender<AppResult<CommittedPayload>>,
    },
}

/// Committed outcomes remembered by one product worker, oldest evicted first
struct DedupWindow {
    capacity: usize,
    order: VecDeque<String>,
    outcomes: HashMap<String, CommittedPayload>,
}

impl DedupWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            outcomes: HashMap::new(),
        }
    }

    fn get(&self, request_id: &str) -> Option<&CommittedPayload> {
        self.outcomes.get(request_id)
    }

    fn remember(&mut self, payload: CommittedPayload) {
        if self.capacity == 0 {
            return;
        }
        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.outcomes.remove(&oldest);
        }
        self.order.push_back(payload.request_id.clone());
        self.outcomes.insert(payload.request_id.clone(), payload);
    }
}

/// Commit sequence and the latest commit of each product
///
/// Both move under one lock, so a reader never sees a sequence value whose
/// product is missing from `latest`.
#[derive(Debug, Default)]
struct CommitIndex {
    sequence: u64,
    latest: HashMap<String, u64>,
}

impl CommitIndex {
    fn record(&mut self, product_id: &str) -> u64 {
        self.sequence += 1;
        self.latest.insert(product_id.to_string(), self.sequence);
        self.sequence
    }

    /// Ids committed after `since`, ordered by id
    fn changed_since(&self, since: u64) -> Vec<String> {
        let mut changed: Vec<String> = self
            .latest
            .iter()
            .filter(|(_, version)| **version > since)
            .map(|(id, _)| id.clone())
            .collect();
        changed.sort();
        changed
    }
}

#[derive(Debug)]
struct Shared {
    store: Arc<dyn CatalogStore>,
    bus: Arc<MessageBus>,
    commits: Mutex<CommitIndex>,
    /// One queue per existing product, created on its first edit
    queues: DashMap<String, mpsc::UnboundedSender<Job>>,
    dedup_capacity: usize,
    shutdown: CancellationToken,
}

/// Serializes and commits catalog edits
#[derive(Debug, Clone)]
pub struct MutationCoordinator {
    shared: Arc<Shared>,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn CatalogStore>, bus: Arc<MessageBus>, dedup_capacity: usize) -> Self {
        let shutdown = bus.shutdown_token().clone();
        Self {
            shared: Arc::new(Shared {
                store,
                bus,
                commits: Mutex::new(CommitIndex::default()),
                queues: DashMap::new(),
                dedup_capacity,
                shutdown,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.shared.store
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.shared.bus
    }

    /// Accept an edit for processing.
    ///
    /// Validation runs here, before the store is touched. A valid edit is
    /// queued behind every edit to the same product accepted earlier. The
    /// receiver resolves once the edit is committed or rejected; dropping it
    /// does not cancel the edit.
    pub fn intake(&self, request: EditRequest) -> oneshot::Receiver<EditOutcome> {
        let (reply, rx) = oneshot::channel();

        let patch = match ProductPatch::from_fields(&request.fields) {
            Ok(patch) => patch,
            Err(e) => {
                let outcome = self.shared.reject(&request, e);
                let _ = reply.send(outcome);
                return rx;
            }
        };

        // Products are never removed, so the check cannot go stale before
        // the worker runs. Unknown ids never get a worker of their own.
        if !self.shared.store.contains(&request.product_id) {
            let outcome = self
                .shared
                .reject(&request, AppError::product_not_found(&request.product_id));
            let _ = reply.send(outcome);
            return rx;
        }

        let product_id = request.product_id.clone();
        self.enqueue(
            &product_id,
            Job::Edit {
                request,
                patch,
                reply,
            },
        );
        rx
    }

    /// Submit an edit and wait for its outcome
    pub async fn submit_edit(&self, request: EditRequest) -> AppResult<EditOutcome> {
        self.intake(request)
            .await
            .map_err(|_| AppError::internal("Mutation coordinator stopped"))
    }

    /// Add a new product, committed and broadcast like an edit
    pub async fn create_product(&self, product: Product) -> AppResult<CommittedPayload> {
        let (reply, rx) = oneshot::channel();
        let product_id = product.id.clone();
        self.enqueue(&product_id, Job::Create { product, reply });
        rx.await
            .map_err(|_| AppError::internal("Mutation coordinator stopped"))?
    }

    /// Latest commit sequence
    pub fn current_version(&self) -> u64 {
        self.shared.commits.lock().sequence
    }

    /// Full catalog read for refetch
    pub fn snapshot(&self) -> CatalogSnapshot {
        // Read the sequence first: products can only be newer than it
        let version = self.current_version();
        CatalogSnapshot {
            version,
            products: self.shared.store.list(),
        }
    }

    /// Products whose latest commit is after `since`
    ///
    /// A cursor ahead of the server (e.g. issued before a restart) cannot be
    /// served incrementally and asks for a full refetch.
    pub fn changes_since(&self, since: u64) -> CatalogChanges {
        let (version, changed) = {
            let commits = self.shared.commits.lock();
            if since > commits.sequence {
                return CatalogChanges {
                    version: commits.sequence,
                    full_refetch: true,
                    products: vec![],
                };
            }
            (commits.sequence, commits.changed_since(since))
        };

        // The store is written before a commit is recorded, so these reads
        // are at least as new as `version`
        let products = changed
            .iter()
            .filter_map(|id| self.shared.store.get(id))
            .collect();

        CatalogChanges {
            version,
            full_refetch: false,
            products,
        }
    }

    fn enqueue(&self, product_id: &str, job: Job) {
        let sender = self
            .shared
            .queues
            .entry(product_id.to_string())
            .or_insert_with(|| spawn_worker(self.shared.clone(), product_id.to_string()))
            .clone();

        if sender.send(job).is_err() {
            // Worker has exited on shutdown; dropping the job drops its reply
            tracing::warn!(product_id = %product_id, "Edit dropped, coordinator is shutting down");
        }
    }
}

fn spawn_worker(shared: Arc<Shared>, product_id: String) -> mpsc::UnboundedSender<Job> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tracing::debug!(product_id = %product_id, "Product worker started");
        let mut dedup = DedupWindow::new(shared.dedup_capacity);

        loop {
            tokio::select! {
                biased;

                job = rx.recv() => match job {
                    Some(Job::Edit { request, patch, reply }) => {
                        let outcome = shared.commit_edit(&request, &patch, &mut dedup);
                        let _ = reply.send(outcome);
                    }
                    Some(Job::Create { product, reply }) => {
                        let _ = reply.send(shared.commit_create(product));
                    }
                    None => break,
                },

                _ = shared.shutdown.cancelled() => break,
            }
        }

        tracing::debug!(product_id = %product_id, "Product worker stopped");
    });

    tx
}

impl Shared {
    fn commit_edit(
        &self,
        request: &EditRequest,
        patch: &ProductPatch,
        dedup: &mut DedupWindow,
    ) -> EditOutcome {
        if let Some(prior) = dedup.get(&request.request_id) {
            tracing::info!(
                request_id = %request.request_id,
                product_id = %request.product_id,
                "Duplicate edit, replaying committed outcome to originator"
            );
            if let Some(session) = &request.session_id {
                self.deliver(BusMessage::committed(prior), Some(session));
            }
            return EditOutcome::Committed(prior.clone());
        }

        match self.store.apply(&request.product_id, patch) {
            Ok(product) => {
                let payload = CommittedPayload {
                    request_id: request.request_id.clone(),
                    message: format!("Product {} updated successfully", product.name),
                    version: self.next_version(&product.id),
                    product,
                };
                tracing::info!(
                    request_id = %payload.request_id,
                    product_id = %payload.product.id,
                    version = payload.version,
                    "Edit committed"
                );
                dedup.remember(payload.clone());
                self.deliver(BusMessage::committed(&payload), None);
                EditOutcome::Committed(payload)
            }
            Err(e) => self.reject(request, e),
        }
    }

    fn commit_create(&self, product: Product) -> AppResult<CommittedPayload> {
        let product = self.store.insert(product)?;
        let payload = CommittedPayload {
            request_id: shared::util::new_request_id(),
            message: format!("Product {} created successfully", product.name),
            version: self.next_version(&product.id),
            product,
        };
        tracing::info!(product_id = %payload.product.id, version = payload.version, "Product created");
        self.deliver(BusMessage::committed(&payload), None);
        Ok(payload)
    }

    /// Build the failure outcome and notify the originator only
    fn reject(&self, request: &EditRequest, error: AppError) -> EditOutcome {
        tracing::info!(
            request_id = %request.request_id,
            product_id = %request.product_id,
            code = %error.code,
            "Edit rejected: {}",
            error.message
        );
        let payload = FailedPayload {
            request_id: request.request_id.clone(),
            product_id: request.product_id.clone(),
            message: error.message,
            code: error.code,
        };
        if let Some(session) = &request.session_id {
            self.deliver(BusMessage::failed(&payload), Some(session));
        }
        EditOutcome::Failed(payload)
    }

    fn next_version(&self, product_id: &str) -> u64 {
        self.commits.lock().record(product_id)
    }

    fn deliver(&self, msg: Result<BusMessage, serde_json::Error>, target: Option<&str>) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!("Failed to encode outcome event: {}", e);
                return;
            }
        };
        let msg = match target {
            Some(session) => msg.with_target(session),
            None => msg,
        };
        if let Err(e) = self.bus.publish(msg) {
            tracing::debug!("Outcome not delivered: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::store::MemoryCatalogStore;
    use crate::catalog::store::tests::product;
    use rust_decimal::Decimal;
    use serde_json::json;
    use shared::error::ErrorCode;
    use shared::message::{ChannelEvent, EventType};

    fn setup() -> (MutationCoordinator, Arc<MessageBus>) {
        let store = Arc::new(MemoryCatalogStore::with_products([
            product("p-1", 50, 100),
            product("p-2", 5, 10),
        ]));
        let bus = Arc::new(MessageBus::with_capacity(64));
        (MutationCoordinator::new(store, bus.clone(), 16), bus)
    }

    fn edit(request_id: &str, product_id: &str, fields: Value, session: &str) -> EditRequest {
        EditRequest {
            request_id: request_id.to_string(),
            product_id: product_id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
            session_id: Some(session.to_string()),
        }
    }

    #[tokio::test]
    async fn test_commit_is_broadcast_with_full_product() {
        let (coordinator, bus) = setup();
        let mut rx = bus.subscribe();

        let outcome = coordinator
            .submit_edit(edit("r1", "p-1", json!({"stock": 40}), "a"))
            .await
            .unwrap();
        assert!(outcome.is_committed());

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, EventType::Committed);
        assert!(msg.target.is_none());
        match ChannelEvent::try_from(&msg).unwrap() {
            ChannelEvent::Committed(p) => {
                assert_eq!(p.product.stock, 40);
                assert_eq!(p.product.price, Decimal::from(100));
                assert_eq!(p.version, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_edit_fails_to_originator_only() {
        let (coordinator, bus) = setup();
        let mut rx = bus.subscribe();

        let outcome = coordinator
            .submit_edit(edit("r1", "p-1", json!({"stock": "abc"}), "a"))
            .await
            .unwrap();

        let EditOutcome::Failed(failed) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failed.code, ErrorCode::ValidationFailed);

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.event_type, EventType::Failed);
        assert_eq!(msg.target.as_deref(), Some("a"));
        assert_eq!(coordinator.store().get("p-1").unwrap().stock, 50);
        assert_eq!(coordinator.current_version(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_fails() {
        let (coordinator, _bus) = setup();
        let outcome = coordinator
            .submit_edit(edit("r1", "missing", json!({"stock": 1}), "a"))
            .await
            .unwrap();
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
    }

    #[tokio::test]
    async fn test_same_product_edits_apply_in_intake_order() {
        let (coordinator, _bus) = setup();

        let first = coordinator.intake(edit("r1", "p-1", json!({"price": 100}), "a"));
        let second = coordinator.intake(edit("r2", "p-1", json!({"price": 120}), "b"));

        let first = first.await.unwrap().into_result().unwrap();
        let second = second.await.unwrap().into_result().unwrap();

        assert!(first.version < second.version);
        assert_eq!(second.product.price, Decimal::from(120));
        assert_eq!(
            coordinator.store().get("p-1").unwrap().price,
            Decimal::from(120)
        );
    }

    #[tokio::test]
    async fn test_duplicate_request_is_not_reapplied() {
        let (coordinator, bus) = setup();
        let mut rx = bus.subscribe();

        let first = coordinator
            .submit_edit(edit("r1", "p-1", json!({"stock": 40}), "a"))
            .await
            .unwrap();
        // Someone else moves the stock in between
        coordinator
            .submit_edit(edit("r2", "p-1", json!({"stock": 30}), "b"))
            .await
            .unwrap();
        let again = coordinator
            .submit_edit(edit("r1", "p-1", json!({"stock": 40}), "a"))
            .await
            .unwrap();

        assert_eq!(first, again);
        assert_eq!(coordinator.store().get("p-1").unwrap().stock, 30);
        assert_eq!(coordinator.current_version(), 2);

        let _ = rx.recv().await.unwrap();
        let _ = rx.recv().await.unwrap();
        let replay = rx.recv().await.unwrap();
        assert_eq!(replay.event_type, EventType::Committed);
        assert_eq!(replay.target.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_edits() {
        let (coordinator, _bus) = setup();
        let bad = coordinator.intake(edit("r1", "p-2", json!({"stock": -1}), "a"));
        let good = coordinator.intake(edit("r2", "p-2", json!({"stock": 7}), "a"));

        assert!(!bad.await.unwrap().is_committed());
        assert!(good.await.unwrap().is_committed());
        assert_eq!(coordinator.store().get("p-2").unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_changes_since() {
        let (coordinator, _bus) = setup();
        coordinator
            .submit_edit(edit("r1", "p-1", json!({"stock": 1}), "a"))
            .await
            .unwrap();
        coordinator
            .submit_edit(edit("r2", "p-2", json!({"stock": 2}), "a"))
            .await
            .unwrap();

        let changes = coordinator.changes_since(1);
        assert!(!changes.full_refetch);
        assert_eq!(changes.version, 2);
        assert_eq!(changes.products.len(), 1);
        assert_eq!(changes.products[0].id, "p-2");

        assert_eq!(coordinator.changes_since(0).products.len(), 2);
        assert!(coordinator.changes_since(99).full_refetch);
    }

    #[tokio::test]
    async fn test_create_product_commits_version() {
        let (coordinator, _bus) = setup();
        let created = coordinator
            .create_product(product("p-3", 9, 3))
            .await
            .unwrap();
        assert_eq!(created.version, 1);

        let err = coordinator
            .create_product(product("p-3", 1, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn test_unknown_products_get_no_worker() {
        let (coordinator, _bus) = setup();
        for i in 0..1000 {
            let ghost = edit(&format!("r{i}"), &format!("ghost-{i}"), json!({"stock": 1}), "a");
            let outcome = coordinator.submit_edit(ghost).await.unwrap();
            assert!(!outcome.is_committed());
        }
        assert_eq!(coordinator.shared.queues.len(), 0);

        coordinator
            .submit_edit(edit("r-ok", "p-1", json!({"stock": 1}), "a"))
            .await
            .unwrap();
        assert_eq!(coordinator.shared.queues.len(), 1);
    }

    #[test]
    fn test_commit_index_records_sequence_and_product_together() {
        let mut index = CommitIndex::default();
        assert_eq!(index.record("p-2"), 1);
        assert_eq!(index.record("p-1"), 2);
        assert_eq!(index.record("p-2"), 3);

        assert_eq!(index.sequence, 3);
        assert_eq!(index.changed_since(0), vec!["p-1", "p-2"]);
        assert_eq!(index.changed_since(2), vec!["p-2"]);
        assert!(index.changed_since(3).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_changes_never_miss_a_counted_commit() {
        let ids: Vec<String> = (0..8).map(|i| format!("p-{i}")).collect();
        let store = Arc::new(MemoryCatalogStore::with_products(
            ids.iter().map(|id| product(id, 1, 1)),
        ));
        let bus = Arc::new(MessageBus::with_capacity(4096));
        let coordinator = MutationCoordinator::new(store, bus, 16);

        let writer = {
            let coordinator = coordinator.clone();
            let ids = ids.clone();
            tokio::spawn(async move {
                let mut pending = Vec::new();
                for round in 0..50u32 {
                    for id in &ids {
                        pending.push(coordinator.intake(edit(
                            &format!("{id}-{round}"),
                            id,
                            json!({ "stock": round }),
                            "w",
                        )));
                    }
                }
                let mut committed = Vec::new();
                for rx in pending {
                    committed.push(rx.await.unwrap().into_result().unwrap());
                }
                committed
            })
        };

        let mut reads = Vec::new();
        while !writer.is_finished() {
            reads.push(coordinator.changes_since(0));
            tokio::task::yield_now().await;
        }
        let committed = writer.await.unwrap();
        assert_eq!(coordinator.current_version(), 400);

        for changes in reads {
            for commit in committed.iter().filter(|c| c.version <= changes.version) {
                assert!(
                    changes.products.iter().any(|p| p.id == commit.product.id),
                    "changes at version {} miss {} committed at {}",
                    changes.version,
                    commit.product.id,
                    commit.version
                );
            }
        }
    }

    #[test]
    fn test_dedup_window_evicts_oldest() {
        let mut window = DedupWindow::new(2);
        for id in ["a", "b", "c"] {
            window.remember(CommittedPayload {
                request_id: id.to_string(),
                message: String::new(),
                product: product("p", 1, 1),
                version: 1,
            });
        }
        assert!(window.get("a").is_none());
        assert!(window.get("b").is_some());
        assert!(window.get("c").is_some());
    }
}
