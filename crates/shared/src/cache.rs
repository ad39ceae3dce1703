//! Redis 访问封装
//!
//! 值统一以 JSON 字符串存储。目前只有验证码使用 Redis（`otp.backend = "redis"`），
//! 就绪探针通过 `health_check` 判断 Redis 是否可达。

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::config::RedisConfig;
use crate::error::{Result, WasteError};

/// Redis 客户端，连接按需建立
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| WasteError::Internal(format!("缓存序列化失败: {e}")))
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| WasteError::Internal(format!("缓存反序列化失败: {e}")))
}

impl Cache {
    /// 只校验 URL，不立即连接
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        debug!(url = %config.url, "Redis client configured");
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        raw.as_deref().map(decode::<T>).transpose()
    }

    /// 写入并设置过期时间（秒级，至少 1 秒）
    #[instrument(skip(self, value))]
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let raw = encode(value)?;
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, raw, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    /// 原子地把 JSON 值中的整数字段加一，保留剩余 TTL，返回更新后的值
    ///
    /// key 不存在（通常是刚好过期）时返回 None，不会重新创建。
    #[instrument(skip(self))]
    pub async fn increment_json_field<T: DeserializeOwned>(
        &self,
        key: &str,
        field: &str,
    ) -> Result<Option<T>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::Script::new(INCREMENT_JSON_FIELD)
            .key(key)
            .arg(field)
            .invoke_async(&mut conn)
            .await?;
        raw.as_deref().map(decode::<T>).transpose()
    }

    /// 返回 key 此前是否存在
    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }
}

/// GET + 修改 + SET KEEPTTL 在同一脚本内执行，并发调用不会丢失计数
const INCREMENT_JSON_FIELD: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
    return false
end
local value = cjson.decode(raw)
value[ARGV[1]] = (tonumber(value[ARGV[1]]) or 0) + 1
local encoded = cjson.encode(value)
redis.call('SET', KEYS[1], encoded, 'KEEPTTL')
return encoded
"#;

/// Redis key 命名
pub struct CacheKey;

impl CacheKey {
    /// 验证码 key；手机号直接使用规范化后的号码，邮箱带 `email:` 前缀
    pub fn otp(target: &str) -> String {
        format!("otp:{target}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_keys() {
        assert_eq!(CacheKey::otp("254712345678"), "otp:254712345678");
        assert_eq!(CacheKey::otp("email:a@b.co"), "otp:email:a@b.co");
    }

    #[test]
    fn test_json_codec() {
        let raw = encode(&serde_json::json!({ "code": "123456", "attempts": 2 })).unwrap();
        let value: serde_json::Value = decode(&raw).unwrap();
        assert_eq!(value["attempts"], 2);

        assert!(decode::<serde_json::Value>("{not json").is_err());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = RedisConfig {
            url: "not a url".to_string(),
            ..RedisConfig::default()
        };
        assert!(Cache::new(&config).is_err());
    }
}
