use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{Profile, RegisterRequest, SetPasswordRequest, SubscriptionRead, UserCreated},
    repo::{self, NewUser, ProfileRow},
};
use crate::{
    auth::password::{hash_password, is_strong_enough, verify_password},
    error::ApiError,
    pagination::{Page, PageParams},
    recipes::{repo as recipes_repo, services::to_short},
    state::AppState,
};

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<UserCreated, ApiError> {
    let req = req.normalize_and_validate()?;
    let password_hash = hash_password(&req.password)?;
    let user = repo::create(
        &state.db,
        NewUser {
            email: &req.email,
            username: &req.username,
            first_name: &req.first_name,
            last_name: &req.last_name,
            password_hash: &password_hash,
        },
    )
    .await
    .map_err(|e| {
        if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
            warn!(email = %req.email, username = %req.username, "duplicate registration");
            ApiError::Conflict("A user with that email or username already exists".into())
        } else {
            ApiError::from(e)
        }
    })?;
    info!(user_id = %user.id, "user registered");
    Ok(user.into())
}

pub async fn set_password(
    state: &AppState,
    user_id: Uuid,
    req: SetPasswordRequest,
) -> Result<(), ApiError> {
    let user = repo::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::field("current_password", "Wrong password."));
    }
    if !is_strong_enough(&req.new_password) {
        return Err(ApiError::field("new_password", "Password too short."));
    }
    let hash = hash_password(&req.new_password)?;
    repo::set_password_hash(&state.db, user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(())
}

pub async fn profile(
    state: &AppState,
    viewer: Option<Uuid>,
    id: Uuid,
) -> Result<Profile, ApiError> {
    repo::get_profile(&state.db, viewer, id)
        .await?
        .map(Profile::from)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

pub async fn list_users(
    state: &AppState,
    viewer: Option<Uuid>,
    page: PageParams,
) -> Result<Page<Profile>, ApiError> {
    let (count, rows) =
        repo::list_profiles(&state.db, viewer, page.limit(), page.offset()).await?;
    Ok(Page {
        count,
        results: rows.into_iter().map(Profile::from).collect(),
    })
}

/// An author's profile with up to `recipes_limit` of their newest recipes.
pub async fn subscription_read(
    state: &AppState,
    author: ProfileRow,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionRead, ApiError> {
    let rows = recipes_repo::short_by_author(&state.db, author.id, recipes_limit).await?;
    let mut recipes = Vec::with_capacity(rows.len());
    for row in rows {
        recipes.push(to_short(state, row).await?);
    }
    let recipes_count = recipes_repo::count_by_author(&state.db, author.id).await?;
    Ok(SubscriptionRead {
        author: author.into(),
        recipes,
        recipes_count,
    })
}

pub async fn subscriptions(
    state: &AppState,
    user_id: Uuid,
    page: PageParams,
    recipes_limit: Option<i64>,
) -> Result<Page<SubscriptionRead>, ApiError> {
    let (count, authors) =
        repo::list_subscribed_authors(&state.db, user_id, page.limit(), page.offset()).await?;
    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(subscription_read(state, author, recipes_limit).await?);
    }
    Ok(Page { count, results })
}
