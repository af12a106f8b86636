use async_trait::async_trait;
use shared::message::BusMessage;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use super::{Transport, read_from_stream, write_to_stream};
use crate::utils::AppError;

/// 服务器侧的 TCP 会话连接
///
/// 读写分半各自一把锁：读循环阻塞在 read 上时 forwarder 仍可写入。
#[derive(Debug)]
pub struct TcpTransport {
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
    peer: Option<String>,
}

impl TcpTransport {
    pub fn from_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok().map(|a| a.to_string());
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
            peer,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn read_message(&self) -> Result<BusMessage, AppError> {
        read_from_stream(&mut *self.reader.lock().await).await
    }

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError> {
        write_to_stream(&mut *self.writer.lock().await, msg).await
    }

    async fn close(&self) -> Result<(), AppError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Socket shutdown failed: {e}")))
    }

    fn peer_addr(&self) -> Option<String> {
        self.peer.clone()
    }
}
