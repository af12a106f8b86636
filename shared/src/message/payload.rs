use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ErrorCode;
use crate::models::Product;

// ==================== Payloads ====================

/// 握手载荷 (客户端 -> 服务端)
///
/// 首帧必须是握手，服务端据此校验协议版本并分配会话 ID。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandshakePayload {
    /// 协议版本
    pub version: u16,
    /// 客户端名称
    pub client_name: Option<String>,
    /// 客户端版本
    pub client_version: Option<String>,
    /// 客户端希望使用的会话 ID，不填则由服务端生成
    pub client_id: Option<String>,
}

/// Catalog edit submission (client -> server)
///
/// `fields` stays untyped on the wire; the coordinator parses it into a
/// `ProductPatch` before touching the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEditPayload {
    /// Unique per submission, used for deduplication
    pub request_id: String,
    pub product_id: String,
    pub fields: Map<String, Value>,
}

/// Commit result (server -> every session)
///
/// Carries the full product state, never a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedPayload {
    pub request_id: String,
    pub message: String,
    pub product: Product,
    /// Per-product commit counter after this commit
    pub version: u64,
}

/// Rejected edit (server -> originating session only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedPayload {
    pub request_id: String,
    pub product_id: String,
    pub message: String,
    pub code: ErrorCode,
}

/// 通用响应载荷 (服务端 -> 客户端)
///
/// 用于握手确认及握手失败
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// 是否成功
    pub success: bool,
    /// 响应消息/错误描述
    pub message: String,
    /// 响应数据 (可选)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// 错误代码 (可选, 仅在失败时有用)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
}

/// 重新同步信号 (服务端 -> 单个客户端)
///
/// 连接转发落后于广播缓冲区时发送，客户端必须全量刷新。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResyncPayload {
    pub reason: String,
    /// 被丢弃的消息数
    pub dropped: u64,
}

// ==================== Convenience Constructors ====================

impl ResponsePayload {
    pub fn success(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error_code: Some(code),
        }
    }
}

impl ResyncPayload {
    pub fn lagged(dropped: u64) -> Self {
        Self {
            reason: format!("Connection fell behind by {dropped} messages, refetch required"),
            dropped,
        }
    }
}
