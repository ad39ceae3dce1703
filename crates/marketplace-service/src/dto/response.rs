//! 响应体

use serde::Serialize;

/// API 统一响应
///
/// `data` 始终输出，没有数据时为 null
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "操作成功")
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }

    /// 成功但没有数据
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

/// 站内消息投递结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelivery {
    pub recipient_id: String,
    /// 对方当前是否在线并收到
    pub delivered: bool,
    pub connections: usize,
}

/// 验证码校验结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub verified: bool,
    /// 已登录用户的资料是否同步更新
    pub profile_updated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub id: i64,
}
