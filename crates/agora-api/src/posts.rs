use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use agora_types::api::{Claims, CreateCommentRequest, CreatePostRequest, RepostRequest, VoteRequest};
use agora_types::events::Notification;
use agora_types::models::VoteOutcome;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::publish;

// -- Posts --

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .store
        .create_post(&req.subreddit, &claims.sub, &req.title, &req.content)?;
    publish(&state.hub, Notification::PostCreate { post: post.clone() }).await;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.post(id)?))
}

pub async fn repost(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RepostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state.store.repost(id, &claims.sub, &req.subreddit)?;
    publish(&state.hub, Notification::PostCreate { post: post.clone() }).await;
    Ok((StatusCode::CREATED, Json(post)))
}

// -- Votes --

pub async fn vote_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // A comment id on the post route is a 404, not a comment vote
    state.store.post(id)?;
    cast_vote(state, id, claims, req).await
}

pub async fn vote_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.comment(id)?;
    cast_vote(state, id, claims, req).await
}

async fn cast_vote(
    state: AppState,
    id: Uuid,
    claims: Claims,
    req: VoteRequest,
) -> Result<Json<VoteOutcome>, ApiError> {
    let outcome = state.store.vote(&claims.sub, id, req.is_upvote)?;
    publish(
        &state.hub,
        Notification::VoteUpdate {
            outcome: outcome.clone(),
        },
    )
    .await;
    Ok(Json(outcome))
}

// -- Comments --

pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("comment must not be empty"));
    }
    let comment = state
        .store
        .create_comment(post_id, &claims.sub, &req.content, req.parent_id)?;
    publish(
        &state.hub,
        Notification::CommentCreate {
            comment: comment.clone(),
        },
    )
    .await;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.comment_tree(post_id)?))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.comment(id)?))
}
