//! 连接认证
//!
//! WebSocket 首帧携带的令牌通过 `Authenticator` 校验，具体实现由上层服务注入。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{RelayError, Result};

/// 令牌校验器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// 校验令牌，返回用户 ID
    async fn authenticate(&self, token: &str) -> Result<String>;
}

/// 固定令牌表校验器
///
/// 用于本地联调和测试。
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<String> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(|| RelayError::Unauthorized("unknown token".to_string()))
    }
}
