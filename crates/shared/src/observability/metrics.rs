//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "relay_messages_total",
        "Relay publish attempts by event type and outcome"
    );
    metrics::describe_gauge!("relay_connections", "Live relay WebSocket connections");

    metrics::describe_counter!("routes_planned_total", "Total number of planned routes");
    metrics::describe_histogram!("route_distance_km", "Planned route distance in kilometres");

    metrics::describe_counter!("otp_codes_sent_total", "Verification codes issued");
    metrics::describe_counter!("otp_verifications_total", "Verification attempts by outcome");

    metrics::describe_counter!("payments_total", "Payments by final status");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次推送（delivered 为实际投递到的连接数）
#[inline]
pub fn record_relay_publish(event_type: &str, delivered: usize) {
    let outcome = if delivered > 0 { "delivered" } else { "dropped" };
    metrics::counter!(
        "relay_messages_total",
        "type" => event_type.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 更新在线连接数
#[inline]
pub fn set_relay_connections(count: usize) {
    metrics::gauge!("relay_connections").set(count as f64);
}

/// 记录路线规划
#[inline]
pub fn record_route_planned(mode: &str, stops: usize, distance_km: f64) {
    metrics::counter!(
        "routes_planned_total",
        "mode" => mode.to_string()
    )
    .increment(1);

    metrics::histogram!("route_distance_km", "mode" => mode.to_string()).record(distance_km);
    metrics::histogram!("route_stops").record(stops as f64);
}

/// 记录验证码发送
#[inline]
pub fn record_otp_sent(channel: &str) {
    metrics::counter!("otp_codes_sent_total", "channel" => channel.to_string()).increment(1);
}

/// 记录验证码校验结果
#[inline]
pub fn record_otp_verification(outcome: &str) {
    metrics::counter!("otp_verifications_total", "outcome" => outcome.to_string()).increment(1);
}

/// 记录支付状态
#[inline]
pub fn record_payment(status: &str) {
    metrics::counter!("payments_total", "status" => status.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        record_http_request("GET", "/api/v1/collections", 200, 0.1);
        record_relay_publish("collection_update", 1);
        record_relay_publish("new_message", 0);
        set_relay_connections(3);
        record_route_planned("optimal", 4, 12.5);
        record_otp_sent("sms");
        record_otp_verification("success");
        record_payment("success");
    }
}
