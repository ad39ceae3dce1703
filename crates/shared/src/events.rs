//! 实时推送事件定义
//!
//! 服务端通过 WebSocket 推送给客户端的 JSON 信封。业务服务构造事件，
//! 推送中继只负责按用户投递，不关心事件内容。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 事件类型
///
/// `_system` 只用于传递连接状态，客户端不会把它当作用户通知展示。
/// `auth` / `ping` / `pong` 是连接控制帧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayEventType {
    #[serde(rename = "collection_update")]
    CollectionUpdate,
    #[serde(rename = "new_collection")]
    NewCollection,
    #[serde(rename = "new_message")]
    NewMessage,
    #[serde(rename = "badge_awarded")]
    BadgeAwarded,
    #[serde(rename = "_system")]
    System,
    #[serde(rename = "auth")]
    Auth,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
}

impl RelayEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectionUpdate => "collection_update",
            Self::NewCollection => "new_collection",
            Self::NewMessage => "new_message",
            Self::BadgeAwarded => "badge_awarded",
            Self::System => "_system",
            Self::Auth => "auth",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }

    /// 是否为需要展示给用户的业务通知
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::CollectionUpdate | Self::NewCollection | Self::NewMessage | Self::BadgeAwarded
        )
    }
}

/// 系统事件名
pub mod system_event {
    pub const CONNECTED: &str = "connected";
    pub const AUTH_FAILED: &str = "auth_failed";
    pub const AUTH_TIMEOUT: &str = "auth_timeout";
}

/// 推送信封
///
/// 序列化后形如 `{"type":"collection_update","collectionId":7,"status":"in_progress",...}`，
/// 未设置的可选字段不会出现在 JSON 中。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayEvent {
    #[serde(rename = "type")]
    pub event_type: RelayEventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// 仅出现在客户端发送的 auth 帧中
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl RelayEvent {
    fn bare(event_type: RelayEventType) -> Self {
        Self {
            event_type,
            event: None,
            message: None,
            collection_id: None,
            status: None,
            sender_id: None,
            token: None,
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// 收集任务状态变化
    pub fn collection_update(
        collection_id: i64,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            collection_id: Some(collection_id),
            status: Some(status.into()),
            message: Some(message.into()),
            ..Self::bare(RelayEventType::CollectionUpdate)
        }
    }

    /// 新的收集任务（推送给收集员）
    pub fn new_collection(collection_id: i64, message: impl Into<String>) -> Self {
        Self {
            collection_id: Some(collection_id),
            status: Some("scheduled".to_string()),
            message: Some(message.into()),
            ..Self::bare(RelayEventType::NewCollection)
        }
    }

    /// 用户间聊天消息
    pub fn new_message(sender_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sender_id: Some(sender_id.into()),
            message: Some(message.into()),
            ..Self::bare(RelayEventType::NewMessage)
        }
    }

    /// 住户获得新徽章，`data.badges` 为徽章名称列表
    pub fn badge_awarded<S: AsRef<str>>(names: &[S]) -> Self {
        let names: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        Self {
            message: Some(format!("New badge earned: {}", names.join(", "))),
            data: Some(serde_json::json!({ "badges": names })),
            ..Self::bare(RelayEventType::BadgeAwarded)
        }
    }

    /// 连接状态事件
    pub fn system(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::bare(RelayEventType::System)
        }
    }

    /// 客户端鉴权帧
    pub fn auth(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::bare(RelayEventType::Auth)
        }
    }

    pub fn ping() -> Self {
        Self::bare(RelayEventType::Ping)
    }

    pub fn pong() -> Self {
        Self::bare(RelayEventType::Pong)
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn is_system(&self) -> bool {
        self.event_type == RelayEventType::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_update_wire_format() {
        let event = RelayEvent::collection_update(7, "in_progress", "Collector is on the way");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "collection_update");
        assert_eq!(json["collectionId"], 7);
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["message"], "Collector is on the way");
        // 未设置的字段不应序列化
        assert!(json.get("token").is_none());
        assert!(json.get("senderId").is_none());
    }

    #[test]
    fn test_system_event_is_not_user_facing() {
        let event = RelayEvent::system(system_event::CONNECTED);
        assert!(event.is_system());
        assert!(!event.event_type.is_user_facing());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "_system");
        assert_eq!(json["event"], "connected");
    }

    #[test]
    fn test_badge_awarded_is_user_facing() {
        let event = RelayEvent::badge_awarded(&["First Pickup", "Eco Starter"]);
        assert!(!event.is_system());
        assert!(event.event_type.is_user_facing());

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "badge_awarded");
        assert_eq!(json["data"]["badges"][1], "Eco Starter");
        assert_eq!(json["message"], "New badge earned: First Pickup, Eco Starter");
    }

    #[test]
    fn test_parse_minimal_client_frame() {
        // 客户端只发 type 和 token，timestamp 由服务端补全
        let event: RelayEvent = serde_json::from_str(r#"{"type":"auth","token":"abc"}"#).unwrap();
        assert_eq!(event.event_type, RelayEventType::Auth);
        assert_eq!(event.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<RelayEvent, _> = serde_json::from_str(r#"{"type":"bogus"}"#);
        assert!(result.is_err());
    }
}
