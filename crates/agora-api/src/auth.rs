use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use agora_gateway::Hub;
use agora_store::Store;
use agora_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub hub: Hub,
    pub jwt_secret: String,
    pub credentials: Credentials,
}

impl AppStateInner {
    pub fn new(store: Store, hub: Hub, jwt_secret: impl Into<String>) -> AppState {
        Arc::new(Self {
            store,
            hub,
            jwt_secret: jwt_secret.into(),
            credentials: Credentials::default(),
        })
    }
}

/// Password hashes by username. Kept beside the store rather than in it:
/// the social graph has no notion of secrets.
#[derive(Default)]
pub struct Credentials {
    hashes: RwLock<HashMap<String, String>>,
}

impl Credentials {
    fn insert(&self, username: &str, hash: String) {
        let mut hashes = self.hashes.write().unwrap_or_else(|e| e.into_inner());
        hashes.insert(username.to_string(), hash);
    }

    fn get(&self, username: &str) -> Option<String> {
        let hashes = self.hashes.read().unwrap_or_else(|e| e.into_inner());
        hashes.get(username).cloned()
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::bad_request("username must be 3-32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(ApiError::internal)?
        .to_string();

    state.store.register_user(&req.username)?;
    state.credentials.insert(&req.username, password_hash);

    let token = create_token(&state.jwt_secret, &req.username).map_err(ApiError::internal)?;
    info!("Registered {}", req.username);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            username: req.username,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state
        .credentials
        .get(&req.username)
        .ok_or_else(ApiError::unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&stored).map_err(ApiError::internal)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized())?;

    let token = create_token(&state.jwt_secret, &req.username).map_err(ApiError::internal)?;

    Ok(Json(AuthResponse {
        username: req.username,
        token,
    }))
}

pub fn create_token(secret: &str, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
