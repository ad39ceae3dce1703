//! 验证码发送渠道
//!
//! 短信和邮件均为模拟实现，只记录日志。

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpSender: Send + Sync {
    /// 渠道名（用于日志与指标）
    fn channel(&self) -> &'static str;

    /// 发送验证码，返回消息 ID
    async fn send_code(&self, target: &str, code: &str) -> Result<String>;
}

/// 模拟短信发送
#[derive(Debug, Clone, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    fn channel(&self) -> &'static str {
        "sms"
    }

    async fn send_code(&self, target: &str, code: &str) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        info!(
            phone = %target,
            message_id = %message_id,
            code_length = code.len(),
            "模拟发送短信验证码"
        );
        Ok(message_id)
    }
}

/// 模拟邮件发送
#[derive(Debug, Clone, Default)]
pub struct LogEmailSender;

#[async_trait]
impl OtpSender for LogEmailSender {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn send_code(&self, target: &str, code: &str) -> Result<String> {
        let message_id = Uuid::new_v4().to_string();
        info!(
            email = %target,
            message_id = %message_id,
            code_length = code.len(),
            "模拟发送邮件验证码"
        );
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_senders() {
        let sms = LogOtpSender;
        let email = LogEmailSender;

        assert_eq!(sms.channel(), "sms");
        assert_eq!(email.channel(), "email");
        assert!(!sms.send_code("254712345678", "123456").await.unwrap().is_empty());
        assert!(!email.send_code("a@example.com", "123456").await.unwrap().is_empty());
    }
}
