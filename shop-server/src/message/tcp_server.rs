//! TCP 会话接入
//!
//! 每个连接经历三个阶段：
//!
//! ```text
//! accept ──▶ handshake (版本检查 + 分配会话 ID + 登记)
//!              │
//!              ├──▶ downstream: server_tx ──(按 target 过滤)──▶ socket
//!              └──▶ upstream:   socket ──(只放行 SubmitEdit)──▶ client_tx
//! ```
//!
//! 任一方向结束后连接注销，未送达的事件不会补发。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use shared::error::ErrorCode;
use shared::message::{
    BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, ResponsePayload, ResyncPayload,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::bus::MessageBus;
use super::transport::{TcpTransport, Transport};
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// Grace period so a rejected client can read the reason before the socket closes
const REJECT_LINGER: Duration = Duration::from_millis(100);

impl MessageBus {
    /// Bind the configured address and accept sessions until shutdown
    pub async fn start_tcp_server(&self) -> AppResult<()> {
        let addr = self.config.tcp_listen_addr.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::internal(format!("Cannot bind event channel on {addr}: {e}")))?;
        tracing::info!(addr = %addr, "Event channel listening");
        self.serve(listener).await
    }

    /// Accept sessions on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> AppResult<()> {
        let shutdown = self.shutdown_token().clone();
        loop {
            let (stream, addr) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        continue;
                    }
                },
            };

            let conn = Connection::new(self.clone(), stream, addr);
            tokio::spawn(async move {
                if let Err(e) = conn.run().await {
                    tracing::debug!(addr = %addr, "Connection ended: {}", e);
                }
            });
        }

        tracing::info!("Event channel stopped accepting");
        Ok(())
    }
}

/// Removes the session from the registry when the connection task ends
struct Registration {
    bus: MessageBus,
    session_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.bus.clients.remove(&self.session_id);
        tracing::info!(session_id = %self.session_id, "Session deregistered");
    }
}

struct Connection {
    bus: MessageBus,
    transport: Arc<dyn Transport>,
    addr: SocketAddr,
}

impl Connection {
    fn new(bus: MessageBus, stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            bus,
            transport: Arc::new(TcpTransport::from_stream(stream)),
            addr,
        }
    }

    async fn run(self) -> AppResult<()> {
        // Subscribed before the handshake reply: the session's snapshot can
        // only be older than the first event it is forwarded
        let downstream = self.bus.subscribe();

        let registration = match self.handshake().await {
            Ok(registration) => registration,
            Err(e) => {
                let _ = self.transport.close().await;
                return Err(e);
            }
        };
        let session_id = registration.session_id.clone();
        tracing::info!(session_id = %session_id, addr = %self.addr, "Session registered");

        let gone = CancellationToken::new();
        let forwarder = tokio::spawn(forward_events(
            self.transport.clone(),
            downstream,
            session_id.clone(),
            self.bus.shutdown_token().clone(),
            gone.clone(),
        ));

        self.read_edits(&session_id).await;
        gone.cancel();

        let _ = forwarder.await;
        let _ = self.transport.close().await;
        drop(registration);
        Ok(())
    }

    /// Validate the first frame and register the session under its id
    async fn handshake(&self) -> AppResult<Registration> {
        let timeout = self.bus.config.handshake_timeout;
        let request = tokio::select! {
            _ = self.bus.shutdown_token().cancelled() => {
                return Err(AppError::internal("Event channel is shutting down"));
            }
            read = tokio::time::timeout(timeout, self.transport.read_message()) => match read {
                Ok(read) => read?,
                Err(_) => {
                    tracing::warn!(addr = %self.addr, ?timeout, "No handshake received, closing");
                    return Err(AppError::with_message(
                        ErrorCode::TimeoutError,
                        format!("No handshake within {timeout:?}"),
                    ));
                }
            },
        };

        if request.event_type != EventType::Handshake {
            let err = AppError::invalid(format!(
                "First message must be a handshake, got {}",
                request.event_type
            ));
            return Err(self.reject(&request, err).await);
        }

        let hello: HandshakePayload = match request.parse_payload() {
            Ok(hello) => hello,
            Err(e) => {
                let err = AppError::invalid(format!("Malformed handshake: {e}"));
                return Err(self.reject(&request, err).await);
            }
        };

        if hello.version != PROTOCOL_VERSION {
            let err = AppError::invalid(format!(
                "Protocol version {} is not supported (server speaks {}), please update the client",
                hello.version, PROTOCOL_VERSION
            ));
            return Err(self.reject(&request, err).await);
        }

        let session_id = hello
            .client_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Targeted events are routed by session id, so ids must be unique
        match self.bus.clients.entry(session_id.clone()) {
            Entry::Occupied(_) => {
                let err =
                    AppError::already_exists(format!("Session {session_id} is already connected"));
                return Err(self.reject(&request, err).await);
            }
            Entry::Vacant(slot) => {
                slot.insert(self.transport.clone());
            }
        }
        let registration = Registration {
            bus: self.bus.clone(),
            session_id,
        };

        tracing::debug!(
            session_id = %registration.session_id,
            client = ?hello.client_name,
            client_version = ?hello.client_version,
            "Handshake accepted"
        );

        let accepted = ResponsePayload::success(
            format!("Connected as session: {}", registration.session_id),
            Some(serde_json::json!({ "sessionId": registration.session_id })),
        );
        self.reply(&request, &accepted).await;

        Ok(registration)
    }

    /// Tell the client why it is refused, then hand the error back
    async fn reject(&self, request: &BusMessage, err: AppError) -> AppError {
        tracing::warn!(addr = %self.addr, code = %err.code, "Handshake refused: {}", err.message);
        self.reply(request, &ResponsePayload::error(err.message.clone(), err.code))
            .await;
        tokio::time::sleep(REJECT_LINGER).await;
        err
    }

    async fn reply(&self, request: &BusMessage, payload: &ResponsePayload) {
        let response = match BusMessage::response(payload) {
            Ok(msg) => msg.with_correlation_id(request.request_id),
            Err(e) => {
                tracing::error!(error = %e, "Cannot encode handshake reply");
                return;
            }
        };
        if let Err(e) = self.transport.write_message(&response).await {
            tracing::debug!(addr = %self.addr, "Handshake reply not delivered: {}", e);
        }
    }

    /// Pass the session's edits upstream until the socket or the server closes
    async fn read_edits(&self, session_id: &str) {
        let shutdown = self.bus.shutdown_token();
        loop {
            let read = tokio::select! {
                _ = shutdown.cancelled() => return,
                read = self.transport.read_message() => read,
            };

            let mut msg = match read {
                Ok(msg) => msg,
                Err(e) if e.code == ErrorCode::ClientDisconnected => {
                    tracing::debug!(session_id = %session_id, "Session closed the connection");
                    return;
                }
                Err(e) => {
                    tracing::debug!(session_id = %session_id, "Session read failed: {}", e);
                    return;
                }
            };

            if msg.event_type != EventType::SubmitEdit {
                security_log!(
                    "WARN",
                    "disallowed_event",
                    session_id = session_id,
                    client_addr = %self.addr,
                    event_type = %msg.event_type
                );
                continue;
            }

            // Identity comes from the connection, never from the frame
            msg.source = Some(session_id.to_string());
            msg.target = None;

            if let Err(e) = self.bus.send_to_server(msg) {
                tracing::warn!(session_id = %session_id, "Edit not handed to the handler: {}", e);
            }
        }
    }
}

/// Write every event meant for `session_id` to the socket
async fn forward_events(
    transport: Arc<dyn Transport>,
    mut downstream: broadcast::Receiver<BusMessage>,
    session_id: String,
    shutdown: CancellationToken,
    gone: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = gone.cancelled() => break,
            received = downstream.recv() => received,
        };

        let msg = match received {
            Ok(msg) if msg.is_for(&session_id) => msg,
            Ok(_) => continue,
            Err(RecvError::Lagged(dropped)) => {
                // Nothing is replayed; the session has to refetch
                tracing::warn!(session_id = %session_id, dropped, "Session fell behind the broadcast");
                match BusMessage::resync(&ResyncPayload::lagged(dropped)) {
                    Ok(msg) => msg.with_target(&session_id),
                    Err(e) => {
                        tracing::error!(error = %e, "Cannot encode resync");
                        continue;
                    }
                }
            }
            Err(RecvError::Closed) => break,
        };

        if let Err(e) = transport.write_message(&msg).await {
            tracing::debug!(session_id = %session_id, "Session write failed: {}", e);
            break;
        }
    }

    tracing::debug!(session_id = %session_id, "Forwarder stopped");
}
