//! 会话连接抽象
//!
//! 帧格式见 [`shared::message::frame`]。

mod tcp;

pub use tcp::TcpTransport;

use async_trait::async_trait;
use shared::message::BusMessage;
use shared::message::frame::{FrameHeader, HEADER_LEN};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::utils::AppError;

/// 一条会话连接
///
/// 读和写可以被不同任务同时调用 (读循环与 forwarder)。
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    async fn read_message(&self) -> Result<BusMessage, AppError>;

    async fn write_message(&self, msg: &BusMessage) -> Result<(), AppError>;

    /// 关闭写方向，对端读到 EOF
    async fn close(&self) -> Result<(), AppError>;

    fn peer_addr(&self) -> Option<String> {
        None
    }
}

fn io_error(stage: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        AppError::client_disconnected()
    } else {
        AppError::internal(format!("Frame {stage} failed: {e}"))
    }
}

/// 读取一帧
///
/// 连接在帧边界或帧中间断开都视为 `ClientDisconnected`。
pub(crate) async fn read_from_stream<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<BusMessage, AppError> {
    let mut raw = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut raw)
        .await
        .map_err(|e| io_error("header read", e))?;
    let header = FrameHeader::decode(&raw).map_err(|e| AppError::invalid(e.to_string()))?;

    let mut payload = vec![0u8; header.payload_len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| io_error("payload read", e))?;

    Ok(header.into_message(payload))
}

pub(crate) async fn write_to_stream<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), AppError> {
    let frame = msg.to_frame().map_err(|e| AppError::invalid(e.to_string()))?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| io_error("write", e))?;
    writer.flush().await.map_err(|e| io_error("flush", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;
    use shared::message::EventType;

    #[tokio::test]
    async fn test_stream_round_trip() {
        let msg = BusMessage::new(EventType::SubmitEdit, br#"{"x":1}"#.to_vec())
            .with_target("s-1");

        let mut buf = Vec::new();
        write_to_stream(&mut buf, &msg).await.unwrap();
        write_to_stream(&mut buf, &msg).await.unwrap();

        let mut reader = buf.as_slice();
        for _ in 0..2 {
            let decoded = read_from_stream(&mut reader).await.unwrap();
            assert_eq!(decoded.request_id, msg.request_id);
            assert_eq!(decoded.payload, msg.payload);
            assert!(decoded.target.is_none());
        }
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn test_eof_is_disconnect() {
        let err = read_from_stream(&mut &[][..]).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ClientDisconnected);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_disconnect() {
        let mut buf = BusMessage::new(EventType::SubmitEdit, b"{}".to_vec())
            .to_frame()
            .unwrap();
        buf.truncate(HEADER_LEN + 1);

        let err = read_from_stream(&mut buf.as_slice()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ClientDisconnected);
    }

    #[tokio::test]
    async fn test_bad_header_is_invalid_request() {
        let mut frame = vec![EventType::SubmitEdit as u8];
        frame.extend_from_slice(&[0u8; 32]);
        frame.extend_from_slice(&u32::MAX.to_le_bytes());

        let err = read_from_stream(&mut frame.as_slice()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }
}
