//! 实时通知中继
//!
//! 按用户推送收集状态变更、新预约和站内消息：
//! - `hub`: 内存中的用户 → 连接映射，尽力投递（至多一次）
//! - `server`: `/ws` WebSocket 端点，首帧认证
//! - `client`: 自动重连的客户端，维护本地通知列表

pub mod auth;
pub mod client;
pub mod error;
pub mod hub;
pub mod server;

pub use auth::{Authenticator, StaticTokenAuthenticator};
pub use client::{ClientConfig, ConnectionState, Notification, NotificationList, RelayClient};
pub use error::{RelayError, Result};
pub use hub::{ConnectionId, Hub, Subscription};
pub use server::{RelayState, ws_handler};

pub use wastelink_shared::events::{RelayEvent, RelayEventType};
