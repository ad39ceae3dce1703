//! 路由配置模块

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};
use notification_relay::ws_handler;
use wastelink_shared::observability::middleware as obs_middleware;

use crate::{handlers, middleware::auth_middleware, state::AppState};

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/me",
            get(handlers::users::get_me)
                .post(handlers::users::upsert_me)
                .put(handlers::users::update_me),
        )
        .route("/users/collectors", get(handlers::users::list_collectors))
        .route("/users/{id}/ratings", get(handlers::users::user_ratings))
}

fn collection_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections",
            get(handlers::collections::list_collections)
                .post(handlers::collections::create_collection),
        )
        // 静态段优先于 {id}
        .route("/collections/route", get(handlers::collections::plan_route))
        .route("/collections/{id}", get(handlers::collections::get_collection))
        .route(
            "/collections/{id}/accept",
            post(handlers::collections::accept_collection),
        )
        .route(
            "/collections/{id}/status",
            patch(handlers::collections::update_status),
        )
        .route(
            "/collections/{id}/rating",
            post(handlers::collections::rate_collection),
        )
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(handlers::payments::initiate_payment))
        .route("/payments/callback", post(handlers::payments::payment_callback))
        .route("/payments/{id}", get(handlers::payments::get_payment))
        .route("/payments/{id}/cancel", post(handlers::payments::cancel_payment))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/otp/send", post(handlers::otp::send_otp))
        .route("/auth/otp/verify", post(handlers::otp::verify_otp))
        .route("/auth/email-code/send", post(handlers::otp::send_email_code))
        .route("/auth/email-code/verify", post(handlers::otp::verify_email_code))
}

fn engagement_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(handlers::messages::send_message))
        .route(
            "/material-interests",
            get(handlers::engagement::list_material_interests)
                .post(handlers::engagement::create_material_interest),
        )
        .route(
            "/material-interests/{id}",
            delete(handlers::engagement::delete_material_interest),
        )
        .route(
            "/feedback",
            get(handlers::engagement::list_feedback).post(handlers::engagement::create_feedback),
        )
        .route(
            "/eco-tips",
            get(handlers::engagement::list_eco_tips).post(handlers::engagement::create_eco_tip),
        )
        .route("/badges", get(handlers::badges::list_badges))
        .route("/badges/mine", get(handlers::badges::my_badges))
}

/// `/api/v1` 下的全部路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(user_routes())
        .merge(collection_routes())
        .merge(payment_routes())
        .merge(auth_routes())
        .merge(engagement_routes())
}

/// 完整应用（不含 CORS 与安全头，由启动入口添加）
///
/// 认证中间件挂在最外层路由上，看到的是完整路径
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/ws", get(ws_handler))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
