//! 存活与就绪探针

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

use crate::state::AppState;

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "marketplace-api"
    }))
}

/// 就绪探针：检查数据库与 Redis
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Readiness: database unavailable");
            false
        }
    };

    let redis = match state.cache.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Readiness: redis unavailable");
            false
        }
    };

    // 内存验证码存储时 Redis 不影响就绪
    let redis_required = state.memory_otp_store.is_none();
    let ready = database && (redis || !redis_required);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "database": database,
                "redis": redis,
            },
            "relayConnections": state.hub.connection_count(),
        })),
    )
}
