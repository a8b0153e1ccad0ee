use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use agora_types::api::{Claims, CreateSubredditRequest};
use agora_types::events::Notification;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::publish;

// -- Users --

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.user(&username)?))
}

pub async fn get_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.user_posts(&username)?))
}

// -- Subreddits --

pub async fn create_subreddit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSubredditRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let subreddit = state
        .store
        .create_subreddit(&req.name, &req.description, &claims.sub)?;

    publish(
        &state.hub,
        Notification::SubredditCreate {
            name: subreddit.name.clone(),
            creator: claims.sub,
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(subreddit)))
}

pub async fn get_subreddit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.subreddit(&name)?))
}

pub async fn join_subreddit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.join_subreddit(&claims.sub, &name)?;
    publish(
        &state.hub,
        Notification::MembershipUpdate {
            subreddit: name.clone(),
            username: claims.sub,
            joined: true,
        },
    )
    .await;
    Ok(Json(state.store.subreddit(&name)?))
}

pub async fn leave_subreddit(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.leave_subreddit(&claims.sub, &name)?;
    publish(
        &state.hub,
        Notification::MembershipUpdate {
            subreddit: name.clone(),
            username: claims.sub,
            joined: false,
        },
    )
    .await;
    Ok(Json(state.store.subreddit(&name)?))
}
