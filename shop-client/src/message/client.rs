use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shared::message::{
    BusMessage, EventType, HandshakePayload, PROTOCOL_VERSION, ResponsePayload, SubmitEditPayload,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ClientConfig;
use crate::message::transport::{MemoryTransport, TcpTransport, Transport};
use crate::message::{MessageClientConfig, MessageError};

/// Message Client
///
/// One session on the event channel. A background task reads server events
/// and re-broadcasts them locally; any number of consumers can subscribe.
#[derive(Debug, Clone)]
pub struct MessageClient {
    session_id: String,
    transport: ClientTransport,
    event_tx: broadcast::Sender<BusMessage>,
    connected: Arc<AtomicBool>,
    /// Cancelled when the reader stops, for whatever reason
    closed: CancellationToken,
}

#[derive(Debug, Clone)]
enum ClientTransport {
    Tcp(TcpTransport),
    Memory(MemoryTransport),
}

impl ClientTransport {
    async fn read_message(&self) -> Result<BusMessage, MessageError> {
        match self {
            ClientTransport::Tcp(t) => t.read_message().await,
            ClientTransport::Memory(t) => t.read_message().await,
        }
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError> {
        match self {
            ClientTransport::Tcp(t) => t.write_message(msg).await,
            ClientTransport::Memory(t) => t.write_message(msg).await,
        }
    }

    async fn close(&self) -> Result<(), MessageError> {
        match self {
            ClientTransport::Tcp(t) => t.close().await,
            ClientTransport::Memory(t) => t.close().await,
        }
    }
}

impl MessageClient {
    /// Connect via TCP and perform the handshake
    pub async fn connect(addr: &str, client_name: &str) -> Result<Self, MessageError> {
        let config = ClientConfig::default()
            .with_message_tcp_addr(addr)
            .with_client_name(client_name);
        Self::from_config(&config).await
    }

    /// Create a message client from a ClientConfig
    pub async fn from_config(config: &ClientConfig) -> Result<Self, MessageError> {
        let addr = config.message_tcp_addr.as_deref().ok_or_else(|| {
            MessageError::Connection("Message client requires tcp_addr configuration".to_string())
        })?;

        let transport = TcpTransport::connect(addr).await?;

        let payload = HandshakePayload {
            version: PROTOCOL_VERSION,
            client_name: Some(config.client_name.clone()),
            client_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            client_id: config.client_id.clone(),
        };
        let session_id = match handshake(&transport, &payload, &config.message).await {
            Ok(id) => id,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };
        tracing::info!(session_id = %session_id, addr = %addr, "Connected to shop server");

        Ok(Self::new(
            session_id,
            ClientTransport::Tcp(transport),
            config.message.event_capacity,
        ))
    }

    /// Create in-memory client
    pub fn memory(
        server_broadcast_tx: &broadcast::Sender<BusMessage>,
        client_to_server_tx: &broadcast::Sender<BusMessage>,
        session_id: impl Into<String>,
    ) -> Self {
        let transport = MemoryTransport::new(server_broadcast_tx, client_to_server_tx, session_id);
        Self::new(
            transport.session_id().to_string(),
            ClientTransport::Memory(transport),
            MessageClientConfig::default().event_capacity,
        )
    }

    fn new(session_id: String, transport: ClientTransport, capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        let client = Self {
            session_id,
            transport: transport.clone(),
            event_tx: event_tx.clone(),
            connected: Arc::new(AtomicBool::new(true)),
            closed: CancellationToken::new(),
        };

        let connected = client.connected.clone();
        let closed = client.closed.clone();
        let session_id = client.session_id.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = closed.cancelled() => break,
                    result = transport.read_message() => match result {
                        Ok(msg) => {
                            if let Err(e) = event_tx.send(msg) {
                                tracing::debug!("No subscribers for event: {}", e);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(session_id = %session_id, "Transport read error: {}", e);
                            // 连接断开，客户端需重新 connect 并 refetch
                            break;
                        }
                    }
                }
            }
            connected.store(false, Ordering::Release);
            closed.cancel();
        });

        client
    }

    /// Session id assigned by the server
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Subscribe to server events
    ///
    /// Only events delivered after this call are seen.
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.event_tx.subscribe()
    }

    /// Token cancelled once the connection is gone
    pub fn closed(&self) -> &CancellationToken {
        &self.closed
    }

    /// Send a message (fire and forget)
    pub async fn send(&self, msg: &BusMessage) -> Result<(), MessageError> {
        if !self.is_connected() {
            return Err(MessageError::Connection("Not connected".to_string()));
        }
        self.transport.write_message(msg).await
    }

    /// Send a catalog edit; the outcome arrives as a `committed` or `failed` event
    pub async fn submit_edit(&self, payload: &SubmitEditPayload) -> Result<(), MessageError> {
        self.send(&BusMessage::submit_edit(payload)?).await
    }

    /// Close the client connection
    pub async fn close(&self) -> Result<(), MessageError> {
        self.closed.cancel();
        self.connected.store(false, Ordering::Release);
        self.transport.close().await
    }
}

/// Send the handshake and wait for the server's answer
async fn handshake(
    transport: &TcpTransport,
    payload: &HandshakePayload,
    config: &MessageClientConfig,
) -> Result<String, MessageError> {
    let request = BusMessage::handshake(payload)?;
    transport.write_message(&request).await?;

    let reply = tokio::time::timeout(config.handshake_timeout, transport.read_message())
        .await
        .map_err(|_| MessageError::Timeout("No handshake response".to_string()))??;

    if reply.event_type != EventType::Response || reply.correlation_id != Some(request.request_id)
    {
        return Err(MessageError::InvalidMessage(format!(
            "Expected handshake response, got {}",
            reply.event_type
        )));
    }

    let response: ResponsePayload = reply.parse_payload()?;
    if !response.success {
        return Err(MessageError::Handshake(response.message));
    }

    response
        .data
        .as_ref()
        .and_then(|d| d.get("sessionId"))
        .and_then(|id| id.as_str())
        .map(String::from)
        .ok_or_else(|| MessageError::InvalidMessage("Handshake response without sessionId".into()))
}
