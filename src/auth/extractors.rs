use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::{JwtKeys, TokenKind};
use crate::error::ApiError;

/// Authenticated caller; rejects the request with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Caller identity when a token is present; anonymous requests pass through.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header".into()))?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(Some)
        .ok_or_else(|| ApiError::Unauthorized("Invalid auth scheme".into()))
}

fn user_from_token(keys: &JwtKeys, token: &str) -> Result<Uuid, ApiError> {
    let claims = keys.verify(token, TokenKind::Access).map_err(|e| {
        warn!(error = %e, "bearer token rejected");
        ApiError::Unauthorized("Invalid or expired token".into())
    })?;
    Ok(claims.sub)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided".into())
        })?;
        let keys = JwtKeys::from_ref(state);
        user_from_token(&keys, token).map(AuthUser)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => {
                let keys = JwtKeys::from_ref(state);
                user_from_token(&keys, token).map(|id| MaybeAuthUser(Some(id)))
            }
            None => Ok(MaybeAuthUser(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = auth {
            builder = builder.header(AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_anonymous_or_401() {
        let state = AppState::fake();

        let mut parts = parts_with(None);
        let maybe = MaybeAuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert!(maybe.0.is_none());

        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn access_token_is_accepted() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(&state).sign_access(user_id).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        let AuthUser(id) = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(id, user_id);
    }

    #[tokio::test]
    async fn refresh_token_is_rejected() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        assert!(AuthUser::from_request_parts(&mut parts, &state).await.is_err());

        let mut parts = parts_with(Some(&format!("Bearer {}", token)));
        assert!(MaybeAuthUser::from_request_parts(&mut parts, &state).await.is_err());
    }

    #[tokio::test]
    async fn wrong_scheme_is_rejected() {
        let state = AppState::fake();
        let mut parts = parts_with(Some("Token abc"));
        let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
