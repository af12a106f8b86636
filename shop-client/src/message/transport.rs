use std::sync::Arc;

use async_trait::async_trait;
use shared::message::frame::{FrameHeader, HEADER_LEN};
use shared::message::{BusMessage, ResyncPayload};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, broadcast};

use crate::message::MessageError;

/// Transport abstraction for event channel communication
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, MessageError>;
    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError>;
    async fn close(&self) -> Result<(), MessageError>;
}

/// Client end of a TCP session
#[derive(Debug, Clone)]
pub struct TcpTransport {
    reader: Arc<Mutex<BufReader<OwnedReadHalf>>>,
    writer: Arc<Mutex<OwnedWriteHalf>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self, MessageError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| MessageError::Connection(format!("{addr}: {e}")))?;
        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: TcpStream) -> Self {
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Self {
            reader: Arc::new(Mutex::new(BufReader::new(reader))),
            writer: Arc::new(Mutex::new(writer)),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, MessageError> {
        let mut reader = self.reader.lock().await;

        let mut raw = [0u8; HEADER_LEN];
        reader.read_exact(&mut raw).await?;
        let header =
            FrameHeader::decode(&raw).map_err(|e| MessageError::InvalidMessage(e.to_string()))?;

        let mut payload = vec![0u8; header.payload_len];
        reader.read_exact(&mut payload).await?;
        Ok(header.into_message(payload))
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError> {
        let frame = msg
            .to_frame()
            .map_err(|e| MessageError::InvalidMessage(e.to_string()))?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), MessageError> {
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}

/// Memory Transport Implementation (for in-process sessions)
///
/// Talks to the server's bus channels directly. Does what the TCP server
/// does for network sessions: stamps the session id as the source of
/// outgoing messages, drops events targeted at other sessions and turns a
/// lagged receiver into a `Resync` event.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    session_id: String,
    /// Receiver for messages FROM server (broadcasts)
    rx: Arc<Mutex<broadcast::Receiver<BusMessage>>>,
    /// Sender for messages TO server
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryTransport {
    /// Create a new memory transport
    ///
    /// * `server_broadcast_tx` - the server's broadcast sender (to subscribe to updates)
    /// * `client_to_server_tx` - the channel to send messages TO the server
    pub fn new(
        server_broadcast_tx: &broadcast::Sender<BusMessage>,
        client_to_server_tx: &broadcast::Sender<BusMessage>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            rx: Arc::new(Mutex::new(server_broadcast_tx.subscribe())),
            tx: client_to_server_tx.clone(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_message(&self) -> Result<BusMessage, MessageError> {
        let mut rx = self.rx.lock().await;
        loop {
            match rx.recv().await {
                Ok(msg) if msg.is_for(&self.session_id) => return Ok(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(session_id = %self.session_id, dropped = n, "Memory session lagged");
                    return Ok(BusMessage::resync(&ResyncPayload::lagged(n))?
                        .with_target(&self.session_id));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(MessageError::Connection("Memory channel closed".to_string()));
                }
            }
        }
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), MessageError> {
        let mut msg = msg.clone();
        msg.source = Some(self.session_id.clone());
        msg.target = None;
        self.tx
            .send(msg)
            .map_err(|e| MessageError::Connection(format!("Failed to send to server: {}", e)))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), MessageError> {
        Ok(())
    }
}
