use axum::{
    extract::{FromRef, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    jwt::{JwtKeys, TokenKind},
    password::verify_password,
};
use crate::{error::ApiError, state::AppState, users::repo as users_repo};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    fn issue(keys: &JwtKeys, user_id: Uuid) -> Result<Self, ApiError> {
        Ok(Self {
            access_token: keys.sign_access(user_id)?,
            refresh_token: keys.sign_refresh(user_id)?,
        })
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token/login", post(login))
        .route("/auth/token/refresh", post(refresh))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = users_repo::find_by_email(&state.db, &email).await?;

    let user = match user {
        Some(u) if verify_password(&payload.password, &u.password_hash)? => u,
        _ => {
            warn!(%email, "login rejected");
            return Err(ApiError::BadRequest(
                "Unable to log in with provided credentials.".into(),
            ));
        }
    };

    let pair = TokenPair::issue(&JwtKeys::from_ref(&state), user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(pair))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|_| ApiError::Unauthorized("Token is invalid or expired".into()))?;

    if !users_repo::exists(&state.db, claims.sub).await? {
        return Err(ApiError::Unauthorized("User not found".into()));
    }
    Ok(Json(TokenPair::issue(&keys, claims.sub)?))
}
