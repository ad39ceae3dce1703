//! 用户连接中心
//!
//! 每个用户可以同时有多个连接（多设备），每个连接对应一个有界队列。
//! 投递使用 `try_send`：队列满或已关闭时直接丢弃，推送方永不阻塞。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use wastelink_shared::events::RelayEvent;
use wastelink_shared::observability::metrics;

/// 连接标识
pub type ConnectionId = u64;

/// 默认的单连接队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

pub struct Hub {
    connections: DashMap<String, HashMap<ConnectionId, mpsc::Sender<RelayEvent>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Hub {
    pub fn new(queue_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        })
    }

    /// 注册一个连接
    ///
    /// 返回的 `Subscription` 被 drop 时自动注销。
    pub fn register(self: &Arc<Self>, user_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.connections
            .entry(user_id.to_string())
            .or_default()
            .insert(id, tx);

        debug!(user_id, connection_id = id, "Relay connection registered");
        metrics::set_relay_connections(self.connection_count());

        Subscription {
            hub: Arc::downgrade(self),
            user_id: user_id.to_string(),
            id,
            receiver: rx,
        }
    }

    fn unregister(&self, user_id: &str, id: ConnectionId) {
        if let Some(mut entry) = self.connections.get_mut(user_id) {
            entry.remove(&id);
        }
        self.connections.remove_if(user_id, |_, conns| conns.is_empty());

        debug!(user_id, connection_id = id, "Relay connection unregistered");
        metrics::set_relay_connections(self.connection_count());
    }

    /// 推送给某个用户的所有连接
    ///
    /// 返回成功入队的连接数；用户不在线时为 0。
    pub fn publish(&self, user_id: &str, event: RelayEvent) -> usize {
        let event_type = event.event_type.as_str();

        let delivered = match self.connections.get(user_id) {
            Some(conns) => conns
                .iter()
                .filter(|(id, tx)| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(user_id, connection_id = **id, "Relay queue full, message dropped");
                        false
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                })
                .count(),
            None => 0,
        };

        metrics::record_relay_publish(event_type, delivered);
        debug!(user_id, event_type, delivered, "Relay publish");
        delivered
    }

    /// 推送给多个用户，返回总投递连接数
    pub fn publish_many<'a, I>(&self, user_ids: I, event: &RelayEvent) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        user_ids
            .into_iter()
            .map(|user_id| self.publish(user_id, event.clone()))
            .sum()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.connections.contains_key(user_id)
    }

    pub fn connected_users(&self) -> Vec<String> {
        self.connections.iter().map(|e| e.key().clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|e| e.value().len()).sum()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// 单个连接的订阅
pub struct Subscription {
    hub: Weak<Hub>,
    user_id: String,
    id: ConnectionId,
    receiver: mpsc::Receiver<RelayEvent>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RelayEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(&self.user_id, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_to_registered_user() {
        let hub = Hub::new(8);
        let mut sub = hub.register("user-1");

        let delivered = hub.publish("user-1", RelayEvent::new_message("user-2", "hello"));
        assert_eq!(delivered, 1);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.message.as_deref(), Some("hello"));
        assert_eq!(event.sender_id.as_deref(), Some("user-2"));
    }

    #[test]
    fn test_publish_to_offline_user() {
        let hub = Hub::new(8);
        assert_eq!(hub.publish("nobody", RelayEvent::new_message("a", "b")), 0);
    }

    #[test]
    fn test_multiple_connections_per_user() {
        let hub = Hub::new(8);
        let mut a = hub.register("user-1");
        let mut b = hub.register("user-1");
        let _other = hub.register("user-2");

        assert_ne!(a.id(), b.id());
        assert_eq!(hub.connection_count(), 3);
        assert_eq!(hub.publish("user-1", RelayEvent::new_collection(7, "new")), 2);
        assert!(a.try_recv().is_some());
        assert!(b.try_recv().is_some());
    }

    #[test]
    fn test_drop_unregisters() {
        let hub = Hub::new(8);
        let a = hub.register("user-1");
        let b = hub.register("user-1");

        drop(a);
        assert!(hub.is_online("user-1"));
        assert_eq!(hub.connection_count(), 1);

        drop(b);
        assert!(!hub.is_online("user-1"));
        assert!(hub.connected_users().is_empty());
        assert_eq!(hub.publish("user-1", RelayEvent::new_message("a", "b")), 0);
    }

    #[test]
    fn test_full_queue_drops_message() {
        let hub = Hub::new(2);
        let mut sub = hub.register("user-1");

        assert_eq!(hub.publish("user-1", RelayEvent::new_message("a", "1")), 1);
        assert_eq!(hub.publish("user-1", RelayEvent::new_message("a", "2")), 1);
        assert_eq!(hub.publish("user-1", RelayEvent::new_message("a", "3")), 0);

        assert_eq!(sub.try_recv().unwrap().message.as_deref(), Some("1"));
        assert_eq!(sub.try_recv().unwrap().message.as_deref(), Some("2"));
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_publish_many() {
        let hub = Hub::new(8);
        let _a = hub.register("collector-1");
        let _b = hub.register("collector-2");

        let event = RelayEvent::new_collection(1, "新的收集预约");
        let delivered = hub.publish_many(["collector-1", "collector-2", "collector-3"], &event);
        assert_eq!(delivered, 2);
    }

    #[test]
    fn test_subscription_outliving_hub() {
        let hub = Hub::new(8);
        let sub = hub.register("user-1");
        drop(hub);
        // hub 已释放，drop 不应 panic
        drop(sub);
    }
}
