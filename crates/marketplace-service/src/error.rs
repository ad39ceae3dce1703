//! 市场服务错误类型定义
//!
//! 错误到 HTTP 响应的映射集中在这里，处理器只返回 `ApiError`。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use wastelink_shared::error::WasteError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("手机号格式无效: {0}")]
    InvalidPhone(String),

    // 资源不存在
    #[error("用户不存在: {0}")]
    UserNotFound(String),
    #[error("收集任务不存在: {0}")]
    CollectionNotFound(i64),
    #[error("支付记录不存在: {0}")]
    PaymentNotFound(i64),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 业务冲突
    #[error("状态流转不合法: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },
    #[error("收集任务已被接单: {0}")]
    CollectionAlreadyAssigned(i64),
    #[error("该收集任务已评价: {0}")]
    AlreadyRated(i64),
    #[error("记录已存在: {0}")]
    AlreadyExists(String),

    // 验证码
    #[error("验证码错误")]
    OtpInvalid,
    #[error("验证码已过期或不存在")]
    OtpExpired,
    #[error("验证码尝试次数过多，请重新获取")]
    OtpAttemptsExceeded,

    // 外部服务
    #[error("支付网关错误: {0}")]
    PaymentGateway(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis错误: {0}")]
    Redis(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            Self::Validation(_) | Self::InvalidPhone(_) | Self::OtpInvalid | Self::OtpExpired => {
                StatusCode::BAD_REQUEST
            }

            Self::UserNotFound(_)
            | Self::CollectionNotFound(_)
            | Self::PaymentNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,

            Self::InvalidStatusTransition { .. }
            | Self::CollectionAlreadyAssigned(_)
            | Self::AlreadyRated(_)
            | Self::AlreadyExists(_) => StatusCode::CONFLICT,

            Self::OtpAttemptsExceeded => StatusCode::TOO_MANY_REQUESTS,

            Self::PaymentGateway(_) => StatusCode::BAD_GATEWAY,

            Self::Database(_) | Self::Redis(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidPhone(_) => "INVALID_PHONE",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::CollectionAlreadyAssigned(_) => "COLLECTION_ALREADY_ASSIGNED",
            Self::AlreadyRated(_) => "ALREADY_RATED",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::OtpInvalid => "OTP_INVALID",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::OtpAttemptsExceeded => "OTP_ATTEMPTS_EXCEEDED",
            Self::PaymentGateway(_) => "PAYMENT_GATEWAY_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Redis(e) => {
                tracing::error!(error = %e, "Redis 操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

impl From<WasteError> for ApiError {
    fn from(err: WasteError) -> Self {
        match err {
            WasteError::Database(e) => Self::Database(e),
            WasteError::Redis(e) => Self::Redis(e.to_string()),
            WasteError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            WasteError::AlreadyExists {
                entity,
                field,
                value,
            } => Self::AlreadyExists(format!("{entity} {field}={value}")),
            WasteError::InvalidStatusTransition { from, to, .. } => {
                Self::InvalidStatusTransition { from, to }
            }
            WasteError::Validation(msg) => Self::Validation(msg),
            WasteError::InvalidArgument { field, message } => {
                Self::Validation(format!("{field}: {message}"))
            }
            WasteError::Unauthorized => Self::Unauthorized("未授权访问".to_string()),
            WasteError::Forbidden { operation } => Self::Forbidden(operation),
            WasteError::ExternalService { service, message } => {
                Self::PaymentGateway(format!("{service}: {message}"))
            }
            WasteError::ExternalServiceTimeout { service } => {
                Self::PaymentGateway(format!("{service} 超时"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
