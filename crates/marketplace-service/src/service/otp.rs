//! 一次性验证码
//!
//! 规则：
//! - 验证码为 `code_length` 位数字，有效期 `ttl`
//! - 最多尝试 `max_attempts` 次，超过后作废；每次校验先在存储中原子地占用一次尝试，
//!   并发提交也无法突破上限
//! - 验证成功即删除，不可重复使用
//!
//! 手机号直接作为键，邮箱使用 `email:` 前缀，两者共用同一存储。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wastelink_shared::cache::{Cache, CacheKey};
use wastelink_shared::config::OtpConfig;
use wastelink_shared::observability::metrics;

use super::senders::OtpSender;
use crate::error::{ApiError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpEntry {
    pub code: String,
    pub attempts: u32,
    pub expires_at: DateTime<Utc>,
}

impl OtpEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// 验证码存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// 写入（覆盖旧验证码）
    async fn put(&self, key: &str, entry: &OtpEntry, ttl: Duration) -> Result<()>;
    /// 已过期的条目视为不存在
    async fn get(&self, key: &str) -> Result<Option<OtpEntry>>;
    /// 原子地将尝试次数加一并返回更新后的条目，不延长有效期
    ///
    /// 条目不存在或已过期时返回 None。
    async fn record_attempt(&self, key: &str) -> Result<Option<OtpEntry>>;
    /// 返回条目此前是否存在
    async fn remove(&self, key: &str) -> Result<bool>;
}

/// 进程内存储
///
/// 读取时惰性清理过期条目，另有后台任务定期清扫。
#[derive(Debug, Default)]
pub struct MemoryOtpStore {
    entries: DashMap<String, OtpEntry>,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 删除所有过期条目，返回删除数量
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 启动定期清扫任务
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let purged = self.purge_expired();
                if purged > 0 {
                    debug!(purged, "Expired OTP entries purged");
                }
            }
        })
    }
}

#[async_trait]
impl OtpStore for MemoryOtpStore {
    async fn put(&self, key: &str, entry: &OtpEntry, _ttl: Duration) -> Result<()> {
        self.entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<OtpEntry>> {
        let now = Utc::now();
        // 先释放读锁再删除
        let entry = self.entries.get(key).map(|e| e.value().clone());
        match entry {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove_if(key, |_, e| e.is_expired(now));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn record_attempt(&self, key: &str) -> Result<Option<OtpEntry>> {
        let now = Utc::now();
        {
            // 写锁内完成检查与自增
            let Some(mut entry) = self.entries.get_mut(key) else {
                return Ok(None);
            };
            if !entry.is_expired(now) {
                entry.attempts += 1;
                return Ok(Some(entry.value().clone()));
            }
        }
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        Ok(None)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}

/// Redis 存储，多实例部署时使用
#[derive(Clone)]
pub struct RedisOtpStore {
    cache: Arc<Cache>,
}

impl RedisOtpStore {
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl OtpStore for RedisOtpStore {
    async fn put(&self, key: &str, entry: &OtpEntry, ttl: Duration) -> Result<()> {
        self.cache.set_json(&CacheKey::otp(key), entry, ttl).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<OtpEntry>> {
        let entry: Option<OtpEntry> = self.cache.get_json(&CacheKey::otp(key)).await?;
        Ok(entry.filter(|e| !e.is_expired(Utc::now())))
    }

    async fn record_attempt(&self, key: &str) -> Result<Option<OtpEntry>> {
        let entry: Option<OtpEntry> = self
            .cache
            .increment_json_field(&CacheKey::otp(key), "attempts")
            .await?;
        Ok(entry.filter(|e| !e.is_expired(Utc::now())))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.cache.delete(&CacheKey::otp(key)).await?)
    }
}

/// 验证码接收方
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpTarget {
    /// 已规范化的手机号
    Phone(String),
    Email(String),
}

impl OtpTarget {
    pub fn email(address: &str) -> Self {
        Self::Email(address.trim().to_lowercase())
    }

    pub fn store_key(&self) -> String {
        match self {
            Self::Phone(phone) => phone.clone(),
            Self::Email(email) => format!("email:{email}"),
        }
    }

    pub fn address(&self) -> &str {
        match self {
            Self::Phone(v) | Self::Email(v) => v,
        }
    }
}

/// 发送结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpDispatch {
    pub message_id: String,
    pub expires_in_seconds: u64,
}

pub struct OtpService {
    store: Arc<dyn OtpStore>,
    sms: Arc<dyn OtpSender>,
    email: Arc<dyn OtpSender>,
    ttl: Duration,
    max_attempts: u32,
    code_length: usize,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        sms: Arc<dyn OtpSender>,
        email: Arc<dyn OtpSender>,
        config: &OtpConfig,
    ) -> Self {
        Self {
            store,
            sms,
            email,
            ttl: Duration::from_secs(config.ttl_seconds),
            max_attempts: config.max_attempts.max(1),
            code_length: config.code_length.clamp(4, 10),
        }
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::rng();
        (0..self.code_length)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect()
    }

    /// 生成并发送验证码，覆盖该接收方之前的验证码
    pub async fn send(&self, target: &OtpTarget) -> Result<OtpDispatch> {
        let code = self.generate_code();
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| ApiError::Internal(format!("无效的验证码有效期: {e}")))?;
        let entry = OtpEntry {
            code: code.clone(),
            attempts: 0,
            expires_at: Utc::now() + ttl,
        };

        let key = target.store_key();
        self.store.put(&key, &entry, self.ttl).await?;

        let sender = match target {
            OtpTarget::Phone(_) => &self.sms,
            OtpTarget::Email(_) => &self.email,
        };
        let message_id = match sender.send_code(target.address(), &code).await {
            Ok(id) => id,
            Err(e) => {
                // 未送达的验证码不能留在存储中
                if let Err(cleanup) = self.store.remove(&key).await {
                    warn!(error = %cleanup, "Failed to discard undelivered verification code");
                }
                return Err(e);
            }
        };
        metrics::record_otp_sent(sender.channel());

        info!(channel = sender.channel(), message_id = %message_id, "Verification code issued");

        Ok(OtpDispatch {
            message_id,
            expires_in_seconds: self.ttl.as_secs(),
        })
    }

    /// 校验验证码
    pub async fn verify(&self, target: &OtpTarget, code: &str) -> Result<()> {
        let key = target.store_key();
        let outcome = self.check(&key, code.trim()).await;

        let label = match &outcome {
            Ok(()) => "success",
            Err(ApiError::OtpInvalid) => "invalid",
            Err(ApiError::OtpExpired) => "expired",
            Err(ApiError::OtpAttemptsExceeded) => "locked",
            Err(_) => "error",
        };
        metrics::record_otp_verification(label);

        outcome
    }

    async fn check(&self, key: &str, code: &str) -> Result<()> {
        // 先占用一次尝试再比较，并发的猜测各自拿到不同的序号
        let Some(entry) = self.store.record_attempt(key).await? else {
            return Err(ApiError::OtpExpired);
        };

        if entry.is_expired(Utc::now()) {
            self.store.remove(key).await?;
            return Err(ApiError::OtpExpired);
        }

        // 并发请求在作废前占到的超额序号
        if entry.attempts > self.max_attempts {
            return Err(ApiError::OtpAttemptsExceeded);
        }

        if entry.code == code {
            // 并发提交同一正确验证码时只有一个能删除成功
            return if self.store.remove(key).await? {
                Ok(())
            } else {
                Err(ApiError::OtpExpired)
            };
        }

        if entry.attempts >= self.max_attempts {
            warn!("Verification code locked after too many attempts");
            self.store.remove(key).await?;
            return Err(ApiError::OtpAttemptsExceeded);
        }

        Err(ApiError::OtpInvalid)
    }
}
