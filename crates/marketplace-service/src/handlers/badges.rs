//! 环保徽章 API 处理器

use axum::{Json, extract::State};

use crate::{
    dto::ApiResponse,
    error::Result,
    middleware::AuthUser,
    models::{Badge, UserBadge},
    state::AppState,
};

/// GET /api/v1/badges
pub async fn list_badges(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Badge>>>> {
    let badges = state.badges.list().await?;
    Ok(Json(ApiResponse::success(badges)))
}

/// GET /api/v1/badges/mine
pub async fn my_badges(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserBadge>>>> {
    let badges = state.badges.mine(user.id()).await?;
    Ok(Json(ApiResponse::success(badges)))
}
