//! 用户资料 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, UpdateProfileRequest, UpsertProfileRequest},
    error::{ApiError, Result},
    middleware::AuthUser,
    models::{NewUser, RatingSummary, User, UserUpdate},
    repository::UserRepositoryTrait,
    service::normalize_kenyan_phone,
    state::AppState,
};

fn normalize_optional_phone(phone: Option<&str>) -> Result<Option<String>> {
    phone
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(normalize_kenyan_phone)
        .transpose()
}

/// 创建或覆盖个人资料
///
/// POST /api/v1/users/me
pub async fn upsert_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpsertProfileRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;

    let profile = NewUser {
        id: user.id().to_string(),
        role: req.role,
        display_name: req.display_name.trim().to_string(),
        email: req.email.clone().or_else(|| user.0.email.clone()),
        phone: normalize_optional_phone(req.phone.as_deref())?,
        location: req.location()?,
    };

    let saved = state.users.upsert(&profile).await?;
    info!(user_id = %saved.id, role = %saved.role, "Profile saved");

    Ok(Json(ApiResponse::success(saved)))
}

/// GET /api/v1/users/me
pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> Result<Json<ApiResponse<User>>> {
    let profile = state
        .users
        .get(user.id())
        .await?
        .ok_or_else(|| ApiError::UserNotFound(user.id().to_string()))?;

    Ok(Json(ApiResponse::success(profile)))
}

/// 部分更新个人资料
///
/// PUT /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<User>>> {
    req.validate()?;

    let changes = UserUpdate {
        display_name: req.display_name.as_deref().map(|n| n.trim().to_string()),
        email: req.email.clone(),
        phone: normalize_optional_phone(req.phone.as_deref())?,
        location: req.location()?,
    };

    let updated = state
        .users
        .update(user.id(), &changes)
        .await?
        .ok_or_else(|| ApiError::UserNotFound(user.id().to_string()))?;

    Ok(Json(ApiResponse::success(updated)))
}

/// GET /api/v1/users/collectors
pub async fn list_collectors(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    let collectors = state.users.list_collectors().await?;
    Ok(Json(ApiResponse::success(collectors)))
}

/// 用户收到的评价及平均分
///
/// GET /api/v1/users/{id}/ratings
pub async fn user_ratings(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RatingSummary>>> {
    let summary = state.ratings.summary(&id).await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_phone_normalization() {
        assert_eq!(normalize_optional_phone(None).unwrap(), None);
        assert_eq!(normalize_optional_phone(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_optional_phone(Some("0712 345 678")).unwrap().as_deref(),
            Some("254712345678")
        );
        assert!(matches!(
            normalize_optional_phone(Some("12345")),
            Err(ApiError::InvalidPhone(_))
        ));
    }
}
