use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use agora_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Posts from the caller's subreddits, newest first. A `limit` of zero or
/// less returns everything.
pub async fn get_feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = usize::try_from(query.limit).unwrap_or(0);
    Ok(Json(state.store.user_feed(&claims.sub, limit)))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.q.trim().is_empty() {
        return Err(ApiError::bad_request("search query must not be empty"));
    }
    Ok(Json(state.store.search(&query.q)))
}

pub async fn popular_subreddits(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.popular_subreddits())
}
