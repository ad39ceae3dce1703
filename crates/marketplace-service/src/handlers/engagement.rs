//! 回收意向、用户反馈与环保贴士
//!
//! 纯 CRUD，直接在处理器中访问数据库

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, CreateEcoTipRequest, CreateFeedbackRequest, CreateMaterialInterestRequest,
        DeletedResponse, EcoTipQuery,
    },
    error::{ApiError, Result},
    middleware::AuthUser,
    models::{EcoTip, Feedback, MaterialInterest, User, UserRole},
    repository::UserRepositoryTrait,
    state::AppState,
};

async fn require_role(state: &AppState, user: &AuthUser, role: UserRole) -> Result<User> {
    let profile = state
        .users
        .get(user.id())
        .await?
        .ok_or_else(|| ApiError::UserNotFound(user.id().to_string()))?;

    if !profile.is(role) {
        return Err(ApiError::Forbidden(format!("仅限 {role} 角色操作")));
    }
    Ok(profile)
}

// ==================== 回收意向 ====================

/// POST /api/v1/material-interests
pub async fn create_material_interest(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateMaterialInterestRequest>,
) -> Result<Json<ApiResponse<MaterialInterest>>> {
    req.validate()?;
    require_role(&state, &user, UserRole::Recycler).await?;

    let row = sqlx::query_as::<_, MaterialInterest>(
        r#"
        INSERT INTO material_interests (recycler_id, waste_type, min_quantity_kg)
        VALUES ($1, $2, $3)
        ON CONFLICT (recycler_id, waste_type) DO NOTHING
        RETURNING id, recycler_id, waste_type, min_quantity_kg, created_at
        "#,
    )
    .bind(user.id())
    .bind(req.waste_type)
    .bind(req.min_quantity_kg.unwrap_or(0.0))
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::AlreadyExists(format!("material interest {}", req.waste_type)))?;

    info!(interest_id = row.id, waste_type = %row.waste_type, "Material interest registered");

    Ok(Json(ApiResponse::success(row)))
}

/// GET /api/v1/material-interests
pub async fn list_material_interests(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<MaterialInterest>>>> {
    let rows = sqlx::query_as::<_, MaterialInterest>(
        r#"
        SELECT id, recycler_id, waste_type, min_quantity_kg, created_at
        FROM material_interests
        WHERE recycler_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.id())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(rows)))
}

/// DELETE /api/v1/material-interests/{id}
pub async fn delete_material_interest(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    let result = sqlx::query("DELETE FROM material_interests WHERE id = $1 AND recycler_id = $2")
        .bind(id)
        .bind(user.id())
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!("material interest {id}")));
    }

    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

// ==================== 用户反馈 ====================

/// POST /api/v1/feedback
pub async fn create_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateFeedbackRequest>,
) -> Result<Json<ApiResponse<Feedback>>> {
    req.validate()?;

    let row = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (user_id, subject, message)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, subject, message, created_at
        "#,
    )
    .bind(user.id())
    .bind(req.subject.trim())
    .bind(req.message.trim())
    .fetch_one(&state.pool)
    .await?;

    info!(feedback_id = row.id, "Feedback submitted");

    Ok(Json(ApiResponse::success_with_message(row, "感谢您的反馈")))
}

/// GET /api/v1/feedback
pub async fn list_feedback(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Feedback>>>> {
    let rows = sqlx::query_as::<_, Feedback>(
        r#"
        SELECT id, user_id, subject, message, created_at
        FROM feedback
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.id())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(rows)))
}

// ==================== 环保贴士 ====================

/// GET /api/v1/eco-tips?wasteType=
pub async fn list_eco_tips(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<EcoTipQuery>,
) -> Result<Json<ApiResponse<Vec<EcoTip>>>> {
    let rows = sqlx::query_as::<_, EcoTip>(
        r#"
        SELECT id, author_id, title, content, waste_type, created_at
        FROM eco_tips
        WHERE $1::varchar IS NULL OR waste_type = $1
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(query.waste_type)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(rows)))
}

/// 机构发布环保贴士
///
/// POST /api/v1/eco-tips
pub async fn create_eco_tip(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateEcoTipRequest>,
) -> Result<Json<ApiResponse<EcoTip>>> {
    req.validate()?;
    require_role(&state, &user, UserRole::Organization).await?;

    let row = sqlx::query_as::<_, EcoTip>(
        r#"
        INSERT INTO eco_tips (author_id, title, content, waste_type)
        VALUES ($1, $2, $3, $4)
        RETURNING id, author_id, title, content, waste_type, created_at
        "#,
    )
    .bind(user.id())
    .bind(req.title.trim())
    .bind(req.content.trim())
    .bind(req.waste_type)
    .fetch_one(&state.pool)
    .await?;

    info!(tip_id = row.id, "Eco tip published");

    Ok(Json(ApiResponse::success(row)))
}
