//! 中继错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("认证失败: {0}")]
    Unauthorized(String),

    #[error("认证超时")]
    AuthTimeout,

    #[error("首帧必须为认证消息")]
    AuthFrameExpected,

    #[error("连接已关闭")]
    Closed,

    #[error("消息序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("传输错误: {0}")]
    Transport(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for RelayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<axum::Error> for RelayError {
    fn from(err: axum::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RelayError::Unauthorized("token expired".to_string()).to_string(),
            "认证失败: token expired"
        );
        assert_eq!(RelayError::AuthTimeout.to_string(), "认证超时");
        assert_eq!(RelayError::AuthFrameExpected.to_string(), "首帧必须为认证消息");
        assert_eq!(
            RelayError::Transport("reset".to_string()).to_string(),
            "传输错误: reset"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err: RelayError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, RelayError::Serialization(_)));
    }
}
