use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use super::repo::{self, Ingredient};
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    Ok(Json(repo::search(&state.db, q.name.as_deref()).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ingredient>, ApiError> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Ingredient not found".into()))
}
