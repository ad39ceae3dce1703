//! 日志、追踪与指标
//!
//! `marketplace-api` 启动时调用 [`init`]，返回的守卫需要保持到进程退出。

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub service_name: String,
    /// 未配置时不导出 span
    pub otlp_endpoint: Option<String>,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
    /// EnvFilter 语法，RUST_LOG 优先
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "marketplace-api".to_string(),
            otlp_endpoint: None,
            metrics_enabled: true,
            metrics_port: 9090,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }
}

/// 持有日志与指标资源，drop 时关闭 OTLP 导出并刷新剩余 span
pub struct ObservabilityGuard {
    _tracing: tracing::TracingGuard,
    _metrics: Option<metrics::MetricsHandle>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 先初始化日志，再按配置启动 Prometheus 端口
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    let tracing = tracing::init(config)?;

    let metrics = match config.metrics_enabled {
        true => Some(metrics::init(config).await?),
        false => None,
    };

    info!(
        service = %config.service_name,
        metrics_port = config.metrics_enabled.then_some(config.metrics_port),
        otlp = config.otlp_endpoint.is_some(),
        "Observability initialized"
    );

    Ok(ObservabilityGuard {
        _tracing: tracing,
        _metrics: metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
        assert!(config.metrics_enabled);
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("marketplace-api");
        assert_eq!(config.service_name, "marketplace-api");
    }
}
