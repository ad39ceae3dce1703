//! 站内消息
//!
//! 消息不落库，只通过推送中继实时投递

use axum::{Json, extract::State};
use notification_relay::RelayEvent;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, MessageDelivery, SendMessageRequest},
    error::{ApiError, Result},
    middleware::AuthUser,
    repository::UserRepositoryTrait,
    state::AppState,
};

/// POST /api/v1/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<MessageDelivery>>> {
    req.validate()?;

    if req.recipient_id == user.id() {
        return Err(ApiError::Validation("不能给自己发送消息".to_string()));
    }
    if state.users.get(&req.recipient_id).await?.is_none() {
        return Err(ApiError::UserNotFound(req.recipient_id));
    }

    let connections = state.hub.publish(
        &req.recipient_id,
        RelayEvent::new_message(user.id(), req.content.as_str()),
    );
    info!(recipient_id = %req.recipient_id, connections, "Message relayed");

    let delivered = connections > 0;
    let message = if delivered {
        "消息已送达"
    } else {
        "对方当前不在线，消息未送达"
    };

    Ok(Json(ApiResponse::success_with_message(
        MessageDelivery {
            recipient_id: req.recipient_id,
            delivered,
            connections,
        },
        message,
    )))
}
