use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use serde::Deserialize;

use agora_gateway::connection;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::verify_token;

#[derive(Debug, Deserialize)]
pub struct Handshake {
    pub token: Option<String>,
}

/// Upgrade to a hub session. The session identity is the username carried by
/// the `token` query parameter, so targeted notifications only reach their
/// owner. The user counts as connected while any of their sockets is open.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(handshake): Query<Handshake>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = handshake.token.ok_or_else(ApiError::unauthorized)?;
    let username = verify_token(&state.jwt_secret, &token)?.sub;

    Ok(ws.on_upgrade(move |socket| async move {
        state.store.connect(&username);
        connection::handle_connection(socket, state.hub.clone(), username.clone()).await;
        state.store.disconnect(&username);
    }))
}
