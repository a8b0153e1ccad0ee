use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use agora_types::api::{Claims, ReplyMessageRequest, SendMessageRequest};
use agora_types::events::Notification;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::publish;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let message = state
        .store
        .send_direct_message(&claims.sub, &req.to_user, &req.content)?;

    // Only the recipient's sessions see a direct message
    publish(
        &state.hub,
        Notification::DirectMessage {
            message: message.clone(),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.inbox(&claims.sub)?))
}

pub async fn reply_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReplyMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("message must not be empty"));
    }

    let message = state
        .store
        .reply_to_direct_message(id, &claims.sub, &req.content)?;
    publish(
        &state.hub,
        Notification::DirectMessage {
            message: message.clone(),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.mark_read(&claims.sub, id)?))
}
