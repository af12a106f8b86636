//! 消息总线消息类型定义
//!
//! 这些类型在 shop-server 和 shop-client 之间共享，用于
//! 进程内（内存）和网络（TCP）通信。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use uuid::Uuid;

mod event;
pub mod frame;
pub mod payload;

pub use event::ChannelEvent;
pub use frame::{FrameError, FrameHeader};
pub use payload::*;

/// 协议版本号
pub const PROTOCOL_VERSION: u16 = 1;

/// 事件类型 (封闭枚举，线上以单字节表示)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// 握手消息
    Handshake = 0,
    /// 客户端提交商品编辑
    SubmitEdit = 1,
    /// 编辑已提交 (广播)
    Committed = 2,
    /// 编辑失败 (仅发给发起方)
    Failed = 3,
    /// 请求响应
    Response = 4,
    /// 重新同步信号
    Resync = 5,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Handshake),
            1 => Ok(EventType::SubmitEdit),
            2 => Ok(EventType::Committed),
            3 => Ok(EventType::Failed),
            4 => Ok(EventType::Response),
            5 => Ok(EventType::Resync),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Handshake => write!(f, "handshake"),
            EventType::SubmitEdit => write!(f, "submitEdit"),
            EventType::Committed => write!(f, "committed"),
            EventType::Failed => write!(f, "failed"),
            EventType::Response => write!(f, "response"),
            EventType::Resync => write!(f, "resync"),
        }
    }
}

/// 消息总线消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub request_id: Uuid,
    pub event_type: EventType,
    /// 发送方会话 ID (服务端读取时填写，客户端填写的值会被覆盖)
    pub source: Option<String>,
    pub correlation_id: Option<Uuid>,
    /// 目标会话 ID，None 表示广播
    pub target: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            event_type,
            source: None,
            correlation_id: None,
            target: None,
            payload,
        }
    }

    fn encode<T: Serialize>(event_type: EventType, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(event_type, serde_json::to_vec(payload)?))
    }

    /// 设置目标会话
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// 设置关联 ID
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    /// 创建握手消息
    pub fn handshake(payload: &HandshakePayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Handshake, payload)
    }

    /// 创建编辑提交消息
    pub fn submit_edit(payload: &SubmitEditPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::SubmitEdit, payload)
    }

    /// 创建提交成功消息
    pub fn committed(payload: &CommittedPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Committed, payload)
    }

    /// 创建编辑失败消息
    pub fn failed(payload: &FailedPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Failed, payload)
    }

    /// 创建响应消息
    pub fn response(payload: &ResponsePayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Response, payload)
    }

    /// 创建重新同步消息
    pub fn resync(payload: &ResyncPayload) -> Result<Self, serde_json::Error> {
        Self::encode(EventType::Resync, payload)
    }

    /// 解析载荷为指定类型
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// 是否应投递给指定会话
    pub fn is_for(&self, session_id: &str) -> bool {
        self.target.as_deref().is_none_or(|t| t == session_id)
    }
}
