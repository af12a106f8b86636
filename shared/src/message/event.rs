//! Typed channel events
//!
//! [`BusMessage`] is what travels on the wire; [`ChannelEvent`] is what the
//! two ends actually act on. Decoding checks the payload schema for the
//! declared event kind, so a handler never sees an untyped payload.

use super::payload::*;
use super::{BusMessage, EventType};
use crate::error::{AppError, AppResult};

/// One decoded event, tagged by kind
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Handshake(HandshakePayload),
    SubmitEdit(SubmitEditPayload),
    Committed(CommittedPayload),
    Failed(FailedPayload),
    Response(ResponsePayload),
    Resync(ResyncPayload),
}

impl ChannelEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            ChannelEvent::Handshake(_) => EventType::Handshake,
            ChannelEvent::SubmitEdit(_) => EventType::SubmitEdit,
            ChannelEvent::Committed(_) => EventType::Committed,
            ChannelEvent::Failed(_) => EventType::Failed,
            ChannelEvent::Response(_) => EventType::Response,
            ChannelEvent::Resync(_) => EventType::Resync,
        }
    }

    /// Encode back into a wire message
    pub fn into_message(self) -> Result<BusMessage, serde_json::Error> {
        match self {
            ChannelEvent::Handshake(p) => BusMessage::handshake(&p),
            ChannelEvent::SubmitEdit(p) => BusMessage::submit_edit(&p),
            ChannelEvent::Committed(p) => BusMessage::committed(&p),
            ChannelEvent::Failed(p) => BusMessage::failed(&p),
            ChannelEvent::Response(p) => BusMessage::response(&p),
            ChannelEvent::Resync(p) => BusMessage::resync(&p),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(msg: &BusMessage) -> AppResult<T> {
    msg.parse_payload().map_err(|e| {
        AppError::invalid_request(format!("Malformed {} payload: {e}", msg.event_type))
    })
}

fn require_id(kind: EventType, name: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(
            AppError::invalid_request(format!("{kind} requires a non-empty {name}"))
                .with_detail("field", name),
        );
    }
    Ok(())
}

impl TryFrom<&BusMessage> for ChannelEvent {
    type Error = AppError;

    fn try_from(msg: &BusMessage) -> AppResult<Self> {
        let event = match msg.event_type {
            EventType::Handshake => ChannelEvent::Handshake(decode(msg)?),
            EventType::SubmitEdit => {
                let p: SubmitEditPayload = decode(msg)?;
                require_id(EventType::SubmitEdit, "requestId", &p.request_id)?;
                require_id(EventType::SubmitEdit, "productId", &p.product_id)?;
                ChannelEvent::SubmitEdit(p)
            }
            EventType::Committed => {
                let p: CommittedPayload = decode(msg)?;
                require_id(EventType::Committed, "product.id", &p.product.id)?;
                ChannelEvent::Committed(p)
            }
            EventType::Failed => ChannelEvent::Failed(decode(msg)?),
            EventType::Response => ChannelEvent::Response(decode(msg)?),
            EventType::Resync => ChannelEvent::Resync(decode(msg)?),
        };
        Ok(event)
    }
}
