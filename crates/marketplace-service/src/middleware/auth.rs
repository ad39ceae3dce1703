//! JWT 认证中间件
//!
//! 验证 Bearer Token 并将 Claims 注入请求扩展。公开路由不强制认证，
//! 但携带了有效令牌时同样注入，便于验证码接口关联当前用户。

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::Claims;
use crate::error::ApiError;
use crate::state::AppState;

/// 公开路由前缀（不需要认证）
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/ready",
    "/ws",
    "/api/v1/auth/otp/",
    "/api/v1/auth/email-code/",
    "/api/v1/payments/callback",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path.starts_with(p))
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let public = is_public_path(request.uri().path());

    let verified = bearer_token(&request).map(|token| state.jwt.verify_token(token));

    match verified {
        Some(Ok(claims)) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        // 公开路由上的无效令牌按匿名处理
        _ if public => next.run(request).await,
        Some(Err(e)) => e.into_response(),
        None => ApiError::Unauthorized("缺少认证 Token".to_string()).into_response(),
    }
}

/// 当前登录用户
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.sub
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("缺少认证 Token".to_string()))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Claims>().cloned().map(AuthUser))
    }
}
