pub mod dto;
pub mod handlers;
pub mod images;
pub mod repo;
pub mod services;

use axum::{extract::DefaultBodyLimit, Router};

use crate::state::AppState;

/// Recipe bodies carry a base64 image inline.
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    handlers::routes().layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
