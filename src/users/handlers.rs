use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{Profile, RecipesLimitQuery, RegisterRequest, SetPasswordRequest, SubscriptionRead, UserCreated},
    repo, services,
};
use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    memberships::{self, MembershipKind, MembershipStore},
    pagination::{Page, PageParams},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(register))
        .route("/users/me", get(me))
        .route("/users/set_password", post(set_password))
        .route("/users/subscriptions", get(subscriptions))
        .route("/users/:id", get(get_user))
        .route("/users/:id/subscribe", post(subscribe).delete(unsubscribe))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserCreated>), ApiError> {
    let created = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Page<Profile>>, ApiError> {
    Ok(Json(services::list_users(&state, viewer, page).await?))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, ApiError> {
    let profile = services::profile(&state, Some(user_id), user_id)
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::Unauthorized("User not found".into()),
            other => other,
        })?;
    Ok(Json(profile))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(services::profile(&state, viewer, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    services::set_password(&state, user_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(page): Query<PageParams>,
    Query(limit): Query<RecipesLimitQuery>,
) -> Result<Json<Page<SubscriptionRead>>, ApiError> {
    let recipes_limit = limit.parse()?;
    Ok(Json(
        services::subscriptions(&state, user_id, page, recipes_limit).await?,
    ))
}

#[instrument(skip(state))]
pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
    Query(limit): Query<RecipesLimitQuery>,
) -> Result<(StatusCode, Json<SubscriptionRead>), ApiError> {
    if author_id == user_id {
        return Err(ApiError::field("author", "You cannot subscribe to yourself"));
    }
    let recipes_limit = limit.parse()?;
    let Some(author) = repo::get_profile(&state.db, Some(user_id), author_id).await? else {
        return Err(ApiError::NotFound("User not found".into()));
    };
    let store: &dyn MembershipStore = &state.db;
    memberships::add(store, MembershipKind::Subscription, user_id, author_id).await?;

    let author = repo::ProfileRow {
        is_subscribed: true,
        ..author
    };
    let read = services::subscription_read(&state, author, recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(read)))
}

#[instrument(skip(state))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::exists(&state.db, author_id).await? {
        return Err(ApiError::NotFound("User not found".into()));
    }
    let store: &dyn MembershipStore = &state.db;
    memberships::remove(store, MembershipKind::Subscription, user_id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
