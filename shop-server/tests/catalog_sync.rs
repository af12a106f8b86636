//! End-to-end catalog edits through the event channel

mod common;

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use shared::message::{BusMessage, ChannelEvent, EventType, SubmitEditPayload};
use shop_client::{ErrorCode, SyncNotice, SyncState};
use shop_server::CatalogStore;

use common::{eventually, open_session, product, start_state};

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

async fn next_notice(rx: &mut tokio::sync::broadcast::Receiver<SyncNotice>) -> SyncNotice {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no notice")
        .expect("notice channel closed")
}

#[tokio::test]
async fn test_edit_reaches_every_session() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let a = open_session(&state, "a");
    let b = open_session(&state, "b");
    let mut b_notices = b.subscribe_notices();

    let request_id = a.submit_edit("p-1", fields(json!({"stock": 40}))).await.unwrap();

    match next_notice(&mut b_notices).await {
        SyncNotice::Committed {
            request_id: seen,
            own,
            ..
        } => {
            assert_eq!(seen, request_id);
            assert!(!own);
        }
        other => panic!("unexpected notice: {other:?}"),
    }

    eventually("a committed", || {
        a.product("p-1").unwrap().state() == SyncState::Committed
    })
    .await;
    assert_eq!(a.product("p-1").unwrap().shown().stock, 40);
    assert_eq!(b.product("p-1").unwrap().shown().stock, 40);
    assert_eq!(state.catalog.get("p-1").unwrap().stock, 40);
}

#[tokio::test]
async fn test_last_arrival_wins_and_nobody_fails() {
    let state = start_state(vec![product("p-1", 50, 80)]);
    let a = open_session(&state, "a");
    let b = open_session(&state, "b");
    let mut a_notices = a.subscribe_notices();

    a.submit_edit("p-1", fields(json!({"price": 100}))).await.unwrap();
    b.submit_edit("p-1", fields(json!({"price": 120}))).await.unwrap();

    let first = next_notice(&mut a_notices).await;
    let second = next_notice(&mut a_notices).await;
    assert!(matches!(first, SyncNotice::Committed { own: true, .. }));
    assert!(matches!(second, SyncNotice::Committed { own: false, .. }));

    for session in [&a, &b] {
        eventually("price converges", || {
            let tracked = session.product("p-1").unwrap();
            tracked.shown().price == Decimal::from(120) && tracked.state() == SyncState::Committed
        })
        .await;
    }
    assert_eq!(state.catalog.get("p-1").unwrap().price, Decimal::from(120));
}

#[tokio::test]
async fn test_invalid_edit_notifies_only_originator() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let a = open_session(&state, "a");
    let b = open_session(&state, "b");
    let mut a_notices = a.subscribe_notices();
    let mut b_notices = b.subscribe_notices();

    // bypass local validation to exercise the server's
    a.client()
        .submit_edit(&SubmitEditPayload {
            request_id: "bad-1".into(),
            product_id: "p-1".into(),
            fields: fields(json!({"stock": "abc"})),
        })
        .await
        .unwrap();

    match next_notice(&mut a_notices).await {
        SyncNotice::Failed {
            request_id, code, ..
        } => {
            assert_eq!(request_id, "bad-1");
            assert_eq!(code, ErrorCode::ValidationFailed);
        }
        other => panic!("unexpected notice: {other:?}"),
    }
    assert_eq!(state.catalog.get("p-1").unwrap().stock, 50);
    assert_eq!(state.coordinator.current_version(), 0);

    // b's next notice is a later commit, never the failure
    a.submit_edit("p-1", fields(json!({"stock": 49}))).await.unwrap();
    assert!(matches!(
        next_notice(&mut b_notices).await,
        SyncNotice::Committed { .. }
    ));
}

#[tokio::test]
async fn test_unknown_product_fails_for_originator() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let a = open_session(&state, "a");
    let mut a_notices = a.subscribe_notices();

    a.client()
        .submit_edit(&SubmitEditPayload {
            request_id: "r-x".into(),
            product_id: "ghost".into(),
            fields: fields(json!({"stock": 1})),
        })
        .await
        .unwrap();

    match next_notice(&mut a_notices).await {
        SyncNotice::Failed { code, .. } => assert_eq!(code, ErrorCode::ProductNotFound),
        other => panic!("unexpected notice: {other:?}"),
    }
    assert!(state.catalog.get("ghost").is_none());
}

#[tokio::test]
async fn test_resubmitted_request_is_not_applied_twice() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let a = open_session(&state, "a");
    let mut observer = state.message_bus().subscribe();

    let first = SubmitEditPayload {
        request_id: "r1".into(),
        product_id: "p-1".into(),
        fields: fields(json!({"stock": 40})),
    };
    let second = SubmitEditPayload {
        request_id: "r2".into(),
        product_id: "p-1".into(),
        fields: fields(json!({"stock": 30})),
    };
    a.client().submit_edit(&first).await.unwrap();
    a.client().submit_edit(&second).await.unwrap();
    a.client().submit_edit(&first).await.unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let msg = tokio::time::timeout(Duration::from_secs(2), observer.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.event_type, EventType::Committed);
        let ChannelEvent::Committed(payload) = ChannelEvent::try_from(&msg).unwrap() else {
            unreachable!()
        };
        seen.push((payload.request_id, payload.version, msg.target));
    }

    assert_eq!(seen[0], ("r1".to_string(), 1, None));
    assert_eq!(seen[1], ("r2".to_string(), 2, None));
    // the replay carries the first outcome and goes to the originator only
    assert_eq!(seen[2], ("r1".to_string(), 1, Some("a".to_string())));

    assert_eq!(state.catalog.get("p-1").unwrap().stock, 30);
    assert_eq!(state.coordinator.current_version(), 2);
    eventually("a settles on the latest commit", || {
        a.product("p-1").unwrap().shown().stock == 30
    })
    .await;
}

#[tokio::test]
async fn test_forged_events_from_sessions_are_ignored() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let a = open_session(&state, "a");
    let mut observer = state.message_bus().subscribe();

    // A session pretending to be the server gets nowhere
    let forged = BusMessage::new(EventType::Committed, br#"{"bogus":true}"#.to_vec());
    a.client().send(&forged).await.unwrap();
    a.submit_edit("p-1", fields(json!({"stock": 7}))).await.unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(2), observer.recv())
        .await
        .unwrap()
        .unwrap();
    let ChannelEvent::Committed(payload) = ChannelEvent::try_from(&msg).unwrap() else {
        panic!("expected a committed event");
    };
    assert_eq!(payload.product.stock, 7);
}

#[tokio::test]
async fn test_concurrent_sessions_converge() {
    let ids = ["p-1", "p-2", "p-3"];
    let state = start_state(ids.iter().map(|id| product(id, 100, 10)).collect());
    let sessions: Vec<_> = (0..4)
        .map(|n| open_session(&state, &format!("s-{n}")))
        .collect();

    let mut rng = StdRng::seed_from_u64(7);
    let mut tasks = Vec::new();
    for session in &sessions {
        let edits: Vec<(&str, u32)> = (0..25)
            .map(|_| (ids[rng.gen_range(0..ids.len())], rng.gen_range(0..500)))
            .collect();
        let session = session.clone();
        tasks.push(tokio::spawn(async move {
            for (product_id, stock) in edits {
                session
                    .submit_edit(product_id, fields(json!({ "stock": stock })))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for finished in futures::future::join_all(tasks).await {
        finished.unwrap();
    }

    eventually("every session shows the server state", || {
        sessions.iter().all(|session| {
            ids.iter().all(|id| {
                let tracked = session.product(id).unwrap();
                tracked.pending_request().is_none()
                    && tracked.shown() == &state.catalog.get(id).unwrap()
            })
        })
    })
    .await;
    assert_eq!(state.coordinator.current_version(), 100);
}

#[tokio::test]
async fn test_catch_up_after_missed_commits() {
    let state = start_state(vec![product("p-1", 50, 100), product("p-2", 5, 20)]);
    let cursor = state.coordinator.current_version();

    let a = open_session(&state, "a");
    a.submit_edit("p-2", fields(json!({"stock": 0}))).await.unwrap();
    eventually("commit", || state.coordinator.current_version() == 1).await;

    let changes = state.coordinator.changes_since(cursor);
    assert!(!changes.full_refetch);
    assert_eq!(changes.version, 1);
    assert_eq!(changes.products.len(), 1);
    assert_eq!(changes.products[0].id, "p-2");

    assert!(state.coordinator.changes_since(99).full_refetch);
}
