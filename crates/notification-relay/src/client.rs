//! 自动重连的中继客户端
//!
//! 状态机：Disconnected → Connecting → Connected → Disconnected。
//! 连接断开或建立失败后等待固定间隔重连，直到调用 `shutdown`。
//! 断线期间服务端推送的消息不会补发。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;
use wastelink_shared::events::{RelayEvent, RelayEventType, system_event};

use crate::error::{RelayError, Result};

/// 默认重连间隔
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// 本地通知列表上限
pub const DEFAULT_MAX_NOTIFICATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 形如 `ws://host:port/ws`
    pub url: String,
    pub token: String,
    pub reconnect_delay: Duration,
    pub max_notifications: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_notifications: DEFAULT_MAX_NOTIFICATIONS,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// 本地通知
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub event_type: RelayEventType,
    pub message: Option<String>,
    pub collection_id: Option<i64>,
    pub status: Option<String>,
    pub sender_id: Option<String>,
    /// 事件附带的结构化内容，如获得的徽章列表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    /// 只有业务事件才会成为通知
    pub fn from_event(event: RelayEvent) -> Option<Self> {
        if !event.event_type.is_user_facing() {
            return None;
        }

        Some(Self {
            id: Uuid::new_v4(),
            event_type: event.event_type,
            message: event.message,
            collection_id: event.collection_id,
            status: event.status,
            sender_id: event.sender_id,
            data: event.data,
            timestamp: event.timestamp,
            read: false,
        })
    }
}

/// 按时间倒序保存的有界通知列表
#[derive(Debug, Clone)]
pub struct NotificationList {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationList {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(DEFAULT_MAX_NOTIFICATIONS)),
            capacity: capacity.max(1),
        }
    }

    /// 新通知放在最前，超出上限时丢弃最旧的
    pub fn push(&mut self, notification: Notification) {
        self.items.push_front(notification);
        self.items.truncate(self.capacity);
    }

    pub fn items(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn mark_all_read(&mut self) {
        self.items.iter_mut().for_each(|n| n.read = true);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for NotificationList {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NOTIFICATIONS)
    }
}

/// 单个文本帧的处理结果
#[derive(Debug, PartialEq)]
enum FrameOutcome {
    Connected,
    AuthRejected(String),
    Notification(Notification),
    Ignored,
}

fn classify_frame(text: &str) -> FrameOutcome {
    let event: RelayEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed relay frame");
            return FrameOutcome::Ignored;
        }
    };

    if event.is_system() {
        return match event.event.as_deref() {
            Some(system_event::CONNECTED) => FrameOutcome::Connected,
            Some(other @ (system_event::AUTH_FAILED | system_event::AUTH_TIMEOUT)) => {
                FrameOutcome::AuthRejected(other.to_string())
            }
            _ => FrameOutcome::Ignored,
        };
    }

    Notification::from_event(event)
        .map(FrameOutcome::Notification)
        .unwrap_or(FrameOutcome::Ignored)
}

pub struct RelayClient {
    state: watch::Receiver<ConnectionState>,
    notifications: Arc<Mutex<NotificationList>>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RelayClient {
    /// 启动后台连接任务
    pub fn spawn(config: ClientConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let notifications = Arc::new(Mutex::new(NotificationList::new(config.max_notifications)));

        let task = tokio::spawn(run(config, state_tx, notifications.clone(), shutdown_rx));

        Self {
            state: state_rx,
            notifications,
            shutdown: shutdown_tx,
            task,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// 订阅连接状态变化
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().items()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.lock().unread_count()
    }

    pub fn mark_all_read(&self) {
        self.notifications.lock().mark_all_read();
    }

    pub fn clear(&self) {
        self.notifications.lock().clear();
    }

    /// 停止重连并等待后台任务退出
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Relay client task ended abnormally");
        }
    }
}

async fn run(
    config: ClientConfig,
    state_tx: watch::Sender<ConnectionState>,
    notifications: Arc<Mutex<NotificationList>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        state_tx.send_replace(ConnectionState::Connecting);

        let result = tokio::select! {
            result = session(&config, &state_tx, &notifications) => result,
            _ = stopped(&mut shutdown) => break,
        };

        state_tx.send_replace(ConnectionState::Disconnected);
        match result {
            Ok(()) => info!(url = %config.url, "Relay connection closed"),
            Err(e) => warn!(url = %config.url, error = %e, "Relay connection failed"),
        }

        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = stopped(&mut shutdown) => break,
        }
        debug!(url = %config.url, "Reconnecting to relay");
    }

    state_tx.send_replace(ConnectionState::Disconnected);
}

/// 收到停止信号或客户端句柄被丢弃时返回
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn session(
    config: &ClientConfig,
    state_tx: &watch::Sender<ConnectionState>,
    notifications: &Mutex<NotificationList>,
) -> Result<()> {
    let (stream, _) = tokio_tungstenite::connect_async(config.url.as_str()).await?;
    let (mut write, mut read) = stream.split();

    let auth = serde_json::to_string(&RelayEvent::auth(config.token.clone()))?;
    write.send(Message::text(auth)).await?;

    while let Some(frame) = read.next().await {
        match frame? {
            Message::Text(text) => match classify_frame(text.as_str()) {
                FrameOutcome::Connected => {
                    info!(url = %config.url, "Relay connected");
                    state_tx.send_replace(ConnectionState::Connected);
                }
                FrameOutcome::AuthRejected(reason) => {
                    return Err(RelayError::Unauthorized(reason));
                }
                FrameOutcome::Notification(notification) => {
                    notifications.lock().push(notification);
                }
                FrameOutcome::Ignored => {}
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}
