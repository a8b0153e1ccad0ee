//! REST shell over the social graph store. Handlers translate requests into
//! store calls and publish the resulting notifications through the hub.

pub mod auth;
pub mod communities;
pub mod error;
pub mod feed;
pub mod messages;
pub mod middleware;
pub mod posts;
pub mod realtime;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tracing::{debug, warn};

use agora_gateway::Hub;
use agora_types::events::Notification;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// All `/api` routes plus the `/ws` handshake. Everything except register/login
/// requires a bearer token; `/ws` takes it as a `token` query parameter.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/users/{username}", get(communities::get_user))
        .route("/users/{username}/posts", get(communities::get_user_posts))
        .route(
            "/subreddits",
            get(feed::popular_subreddits).post(communities::create_subreddit),
        )
        .route("/subreddits/{name}", get(communities::get_subreddit))
        .route("/subreddits/{name}/join", post(communities::join_subreddit))
        .route("/subreddits/{name}/leave", post(communities::leave_subreddit))
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}/vote", post(posts::vote_post))
        .route("/posts/{id}/repost", post(posts::repost))
        .route(
            "/posts/{id}/comments",
            get(posts::get_comments).post(posts::create_comment),
        )
        .route("/comments/{id}", get(posts::get_comment))
        .route("/comments/{id}/vote", post(posts::vote_comment))
        .route("/feed", get(feed::get_feed))
        .route("/search", get(feed::search))
        .route(
            "/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/messages/{id}/reply", post(messages::reply_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .route("/ws", get(realtime::ws_upgrade))
        .with_state(state)
}

/// Push a notification to connected sessions: targeted when it has a
/// recipient, broadcast otherwise.
pub async fn publish(hub: &Hub, notification: Notification) {
    let payload = match notification.to_json() {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to encode notification: {}", e);
            return;
        }
    };
    debug!(
        "Publishing notification about {:?} to {}",
        notification.entity_id(),
        notification.recipient().unwrap_or("everyone")
    );
    match notification.recipient() {
        Some(identity) => hub.send_to(identity, payload).await,
        None => hub.broadcast(payload).await,
    }
}
