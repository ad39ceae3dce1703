//! 支付 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::{
    dto::{ApiResponse, InitiatePaymentRequest},
    error::Result,
    middleware::AuthUser,
    models::Payment,
    service::PaymentCallback,
    state::AppState,
};

/// 发起 STK Push
///
/// POST /api/v1/payments
pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<Json<ApiResponse<Payment>>> {
    req.validate()?;

    let payment = state
        .payments
        .initiate(user.id(), req.collection_id, &req.phone, req.amount)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        payment,
        "请在手机上确认支付",
    )))
}

/// 轮询支付状态
///
/// GET /api/v1/payments/{id}
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Payment>>> {
    let payment = state.payments.get(user.id(), id).await?;
    Ok(Json(ApiResponse::success(payment)))
}

/// 网关回调（公开路由）
///
/// POST /api/v1/payments/callback
pub async fn payment_callback(
    State(state): State<AppState>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Json<ApiResponse<Payment>>> {
    let payment = state.payments.handle_callback(&callback).await?;
    Ok(Json(ApiResponse::success(payment)))
}

/// POST /api/v1/payments/{id}/cancel
pub async fn cancel_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Payment>>> {
    let payment = state.payments.cancel(user.id(), id).await?;
    Ok(Json(ApiResponse::success(payment)))
}
