//! 手机与邮箱验证码 API 处理器（公开路由）

use axum::{Json, extract::State};
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, SendEmailCodeRequest, SendOtpRequest, VerificationResult,
        VerifyEmailCodeRequest, VerifyOtpRequest,
    },
    error::Result,
    middleware::AuthUser,
    repository::UserRepositoryTrait,
    service::{OtpDispatch, OtpTarget, normalize_kenyan_phone},
    state::AppState,
};

/// POST /api/v1/auth/otp/send
pub async fn send_otp(
    State(state): State<AppState>,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<ApiResponse<OtpDispatch>>> {
    req.validate()?;

    let target = OtpTarget::Phone(normalize_kenyan_phone(&req.phone)?);
    let dispatch = state.otp.send(&target).await?;
    Ok(Json(ApiResponse::success_with_message(dispatch, "验证码已发送")))
}

/// 校验成功且已登录时，把该手机号记为当前用户的已验证手机号
///
/// POST /api/v1/auth/otp/verify
pub async fn verify_otp(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<VerificationResult>>> {
    req.validate()?;

    let phone = normalize_kenyan_phone(&req.phone)?;
    state
        .otp
        .verify(&OtpTarget::Phone(phone.clone()), &req.code)
        .await?;

    let profile_updated = match &user {
        Some(user) => state.users.mark_phone_verified(user.id(), &phone).await?,
        None => false,
    };
    if profile_updated {
        info!("Phone number verified for current user");
    }

    Ok(Json(ApiResponse::success(VerificationResult {
        verified: true,
        profile_updated,
    })))
}

/// POST /api/v1/auth/email-code/send
pub async fn send_email_code(
    State(state): State<AppState>,
    Json(req): Json<SendEmailCodeRequest>,
) -> Result<Json<ApiResponse<OtpDispatch>>> {
    req.validate()?;

    let dispatch = state.otp.send(&OtpTarget::email(&req.email)).await?;
    Ok(Json(ApiResponse::success_with_message(dispatch, "验证码已发送")))
}

/// POST /api/v1/auth/email-code/verify
pub async fn verify_email_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailCodeRequest>,
) -> Result<Json<ApiResponse<VerificationResult>>> {
    req.validate()?;

    state
        .otp
        .verify(&OtpTarget::email(&req.email), &req.code)
        .await?;

    Ok(Json(ApiResponse::success(VerificationResult {
        verified: true,
        profile_updated: false,
    })))
}
