//! Bearer-token authentication.

pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use extractors::{AuthUser, MaybeAuthUser};
pub use jwt::JwtKeys;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
