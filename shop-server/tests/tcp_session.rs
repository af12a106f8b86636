//! Sessions over the TCP event channel

mod common;

use std::time::Duration;

use serde_json::json;
use shop_client::{
    ClientConfig, MessageClient, MessageClientConfig, MessageError, SyncAgent, SyncNotice,
    SyncSession, SyncState,
};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use common::{eventually, product, start_state, start_state_with};

async fn listen(state: &shop_server::ServerState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let bus = state.message_bus().clone();
    tokio::spawn(async move { bus.serve(listener).await });
    addr
}

#[tokio::test]
async fn test_handshake_assigns_session_ids() {
    let state = start_state(vec![]);
    let addr = listen(&state).await;

    let a = MessageClient::connect(&addr, "test-a").await.unwrap();
    let b = MessageClient::connect(&addr, "test-b").await.unwrap();
    assert_ne!(a.session_id(), b.session_id());

    eventually("both registered", || {
        state.message_bus().connected_sessions() == 2
    })
    .await;

    a.close().await.unwrap();
    eventually("a removed", || state.message_bus().connected_sessions() == 1).await;
}

#[tokio::test]
async fn test_silent_connection_is_closed_after_handshake_timeout() {
    let state = start_state_with(vec![], |config| config.handshake_timeout_ms = 100);
    let addr = listen(&state).await;

    let mut silent = TcpStream::connect(&addr).await.unwrap();
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(Duration::from_secs(2), silent.read(&mut buf))
        .await
        .expect("connection was left open");
    assert_eq!(read.unwrap(), 0);
    assert_eq!(state.message_bus().connected_sessions(), 0);

    // the listener keeps serving well-behaved clients
    let client = MessageClient::connect(&addr, "after-silent").await.unwrap();
    assert!(!client.session_id().is_empty());
}

#[tokio::test]
async fn test_requested_session_id_must_be_unique() {
    let state = start_state(vec![]);
    let addr = listen(&state).await;
    let config = ClientConfig::default()
        .with_message_tcp_addr(&addr)
        .with_client_id("till-1");

    let first = MessageClient::from_config(&config).await.unwrap();
    assert_eq!(first.session_id(), "till-1");

    let err = MessageClient::from_config(&config).await.unwrap_err();
    assert!(matches!(err, MessageError::Handshake(_)), "{err:?}");
}

#[tokio::test]
async fn test_edit_over_tcp_reaches_other_session() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let addr = listen(&state).await;
    let config = MessageClientConfig::default();

    let open = |name: &'static str| {
        let addr = addr.clone();
        let state = state.clone();
        let config = config.clone();
        async move {
            let client = MessageClient::connect(&addr, name).await.unwrap();
            let agent = SyncAgent::from_snapshot(state.coordinator.snapshot());
            SyncSession::start(client, agent, &config)
        }
    };
    let a = open("a").await;
    let b = open("b").await;
    let mut b_notices = b.subscribe_notices();

    a.submit_edit("p-1", json!({"stock": 40}).as_object().unwrap().clone())
        .await
        .unwrap();

    let notice = tokio::time::timeout(Duration::from_secs(2), b_notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(notice, SyncNotice::Committed { own: false, .. }));
    assert_eq!(b.product("p-1").unwrap().shown().stock, 40);

    eventually("a committed", || {
        a.product("p-1").unwrap().state() == SyncState::Committed
    })
    .await;
}

#[tokio::test]
async fn test_server_shutdown_marks_sessions_stale() {
    let state = start_state(vec![product("p-1", 50, 100)]);
    let addr = listen(&state).await;

    let client = MessageClient::connect(&addr, "a").await.unwrap();
    let agent = SyncAgent::from_snapshot(state.coordinator.snapshot());
    let session = SyncSession::start(client, agent, &MessageClientConfig::default());
    let mut notices = session.subscribe_notices();
    eventually("registered", || state.message_bus().connected_sessions() == 1).await;

    state.message_bus().shutdown();

    let notice = tokio::time::timeout(Duration::from_secs(2), notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notice, SyncNotice::Disconnected);
    assert!(session.has_stale());
}
