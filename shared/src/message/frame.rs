//! TCP 帧编解码 (与 I/O 无关)
//!
//! ```text
//! ┌────────┬──────────────┬──────────────────┬──────────┬──────────────┐
//! │ type   │ request_id   │ correlation_id   │ len (LE) │ payload      │
//! │ 1 byte │ 16 bytes     │ 16 bytes (nil=无)│ 4 bytes  │ len bytes    │
//! └────────┴──────────────┴──────────────────┴──────────┴──────────────┘
//! ```
//!
//! `source` / `target` 不上线：source 由服务器按连接填写，target 只用于进程内路由。

use thiserror::Error;
use uuid::Uuid;

use super::{BusMessage, EventType};

pub const HEADER_LEN: usize = 1 + 16 + 16 + 4;

/// 单帧载荷上限
pub const MAX_PAYLOAD_LEN: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Unknown event type byte {0}")]
    UnknownEventType(u8),
    #[error("Frame payload of {0} bytes exceeds {MAX_PAYLOAD_LEN}")]
    PayloadTooLarge(usize),
}

/// Decoded fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub event_type: EventType,
    pub request_id: Uuid,
    pub correlation_id: Option<Uuid>,
    pub payload_len: usize,
}

impl FrameHeader {
    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, FrameError> {
        let event_type =
            EventType::try_from(bytes[0]).map_err(|_| FrameError::UnknownEventType(bytes[0]))?;

        let uuid_at = |offset: usize| {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&bytes[offset..offset + 16]);
            Uuid::from_bytes(raw)
        };

        let payload_len = u32::from_le_bytes([bytes[33], bytes[34], bytes[35], bytes[36]]) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(payload_len));
        }

        Ok(Self {
            event_type,
            request_id: uuid_at(1),
            correlation_id: Some(uuid_at(17)).filter(|id| !id.is_nil()),
            payload_len,
        })
    }

    /// Assemble the message once the payload has been read
    pub fn into_message(self, payload: Vec<u8>) -> BusMessage {
        BusMessage {
            request_id: self.request_id,
            event_type: self.event_type,
            source: None,
            correlation_id: self.correlation_id,
            target: None,
            payload,
        }
    }
}

impl BusMessage {
    /// Encode header and payload into one contiguous frame
    pub fn to_frame(&self) -> Result<Vec<u8>, FrameError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(self.payload.len()));
        }

        let mut frame = Vec::with_capacity(HEADER_LEN + self.payload.len());
        frame.push(self.event_type as u8);
        frame.extend_from_slice(self.request_id.as_bytes());
        frame.extend_from_slice(self.correlation_id.unwrap_or_else(Uuid::nil).as_bytes());
        frame.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }
}
