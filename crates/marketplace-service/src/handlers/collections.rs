//! 收集任务 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
};
use route_planner::PlannedRoute;
use validator::Validate;

use crate::{
    dto::{
        ApiResponse, CollectionListQuery, CreateCollectionRequest, RateCollectionRequest,
        RouteParams, UpdateStatusRequest,
    },
    error::Result,
    middleware::AuthUser,
    models::{Collection, NewCollection, Rating},
    service::RouteQuery,
    state::AppState,
};

/// 住户预约收集
///
/// POST /api/v1/collections
pub async fn create_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<Json<ApiResponse<Collection>>> {
    req.validate()?;

    let new = NewCollection {
        household_id: user.id().to_string(),
        waste_type: req.waste_type,
        quantity_kg: req.quantity_kg,
        address: req.address.trim().to_string(),
        location: req.location()?,
        scheduled_for: req.scheduled_for,
        notes: req.notes.clone().filter(|n| !n.trim().is_empty()),
    };

    let collection = state.collections.create(new).await?;
    Ok(Json(ApiResponse::success(collection)))
}

/// GET /api/v1/collections?status=
pub async fn list_collections(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CollectionListQuery>,
) -> Result<Json<ApiResponse<Vec<Collection>>>> {
    let collections = state.collections.list(user.id(), query.status).await?;
    Ok(Json(ApiResponse::success(collections)))
}

/// GET /api/v1/collections/{id}
pub async fn get_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Collection>>> {
    let collection = state.collections.get(user.id(), id).await?;
    Ok(Json(ApiResponse::success(collection)))
}

/// 收集员接单
///
/// POST /api/v1/collections/{id}/accept
pub async fn accept_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Collection>>> {
    let collection = state.collections.accept(user.id(), id).await?;
    Ok(Json(ApiResponse::success(collection)))
}

/// PATCH /api/v1/collections/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Collection>>> {
    let collection = state
        .collections
        .update_status(user.id(), id, req.status)
        .await?;
    Ok(Json(ApiResponse::success(collection)))
}

/// 收集员路线规划
///
/// GET /api/v1/collections/route?mode=optimal|by_type&wasteType=&depotLat=&depotLng=
pub async fn plan_route(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<RouteParams>,
) -> Result<Json<ApiResponse<PlannedRoute>>> {
    let query = RouteQuery::try_from(params)?;

    let response = match state.collections.plan_route(user.id(), query).await? {
        Some(route) => ApiResponse::success(route),
        None => ApiResponse::empty("no active collections"),
    };
    Ok(Json(response))
}

/// 住户评价收集员
///
/// POST /api/v1/collections/{id}/rating
pub async fn rate_collection(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<RateCollectionRequest>,
) -> Result<Json<ApiResponse<Rating>>> {
    req.validate()?;

    let rating = state
        .ratings
        .rate(user.id(), id, req.score, req.comment)
        .await?;
    Ok(Json(ApiResponse::success(rating)))
}
