use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::Query;
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{RecipeListQuery, RecipeRead, RecipeShort, RecipeWrite},
    repo, services,
};
use crate::{
    auth::{AuthUser, MaybeAuthUser},
    error::ApiError,
    memberships::{self, MembershipKind, MembershipStore},
    pagination::Page,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/recipes/:id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

#[instrument(skip(state, q))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(q): Query<RecipeListQuery>,
) -> Result<Json<Page<RecipeRead>>, ApiError> {
    Ok(Json(services::list_recipes(&state, viewer, &q).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeRead>, ApiError> {
    Ok(Json(services::get_recipe(&state, viewer, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipeWrite>,
) -> Result<(StatusCode, Json<RecipeRead>), ApiError> {
    let recipe = payload.validate_create()?;
    let id = services::create_recipe(&state, user_id, recipe).await?;
    let read = services::get_recipe(&state, Some(user_id), id).await?;
    Ok((StatusCode::CREATED, Json(read)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecipeWrite>,
) -> Result<Json<RecipeRead>, ApiError> {
    let changes = payload.validate_update()?;
    services::update_recipe(&state, user_id, id, changes).await?;
    Ok(Json(services::get_recipe(&state, Some(user_id), id).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::delete_recipe(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_membership(
    state: &AppState,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    let Some(row) = repo::short(&state.db, recipe_id).await? else {
        return Err(ApiError::field("recipe", "Recipe does not exist."));
    };
    let store: &dyn MembershipStore = &state.db;
    memberships::add(store, kind, user_id, recipe_id).await?;
    let short = services::to_short(state, row).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

async fn remove_membership(
    state: &AppState,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<StatusCode, ApiError> {
    if repo::owner(&state.db, recipe_id).await?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".into()));
    }
    let store: &dyn MembershipStore = &state.db;
    memberships::remove(store, kind, user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_membership(&state, MembershipKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    remove_membership(&state, MembershipKind::Favorite, user_id, id).await
}

#[instrument(skip(state))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_membership(&state, MembershipKind::ShoppingCart, user_id, id).await
}

#[instrument(skip(state))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    remove_membership(&state, MembershipKind::ShoppingCart, user_id, id).await
}
