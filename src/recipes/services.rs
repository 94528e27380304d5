use std::collections::HashMap;

use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{
        IngredientLineRead, LineInput, NewRecipe, RecipeChanges, RecipeListQuery, RecipeRead,
        RecipeShort,
    },
    images,
    repo::{self, RecipeOwner, RecipeRow, ShortRow},
};
use crate::{
    error::{ApiError, FieldErrors},
    ingredients::repo as ingredients_repo,
    pagination::Page,
    state::AppState,
    tags::repo::{self as tags_repo, Tag},
    users::{dto::Profile, repo as users_repo},
};

async fn image_url(state: &AppState, key: &str) -> anyhow::Result<String> {
    images::presign(state.storage.as_ref(), key, state.config.s3.url_ttl_secs).await
}

pub async fn to_short(state: &AppState, row: ShortRow) -> anyhow::Result<RecipeShort> {
    Ok(RecipeShort {
        image: image_url(state, &row.image_key).await?,
        id: row.id,
        name: row.name,
        cooking_time: row.cooking_time,
    })
}

/// Attaches tags, ingredient lines, authors and image URLs to bare rows.
async fn hydrate(
    state: &AppState,
    viewer: Option<Uuid>,
    rows: Vec<RecipeRow>,
) -> anyhow::Result<Vec<RecipeRead>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let mut author_ids: Vec<Uuid> = rows.iter().map(|r| r.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut lines: HashMap<Uuid, Vec<IngredientLineRead>> = HashMap::new();
    for l in repo::lines_for(&state.db, &ids).await? {
        lines.entry(l.recipe_id).or_default().push(IngredientLineRead {
            id: l.id,
            name: l.name,
            measurement_unit: l.measurement_unit,
            amount: l.amount,
        });
    }

    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for t in repo::tags_for(&state.db, &ids).await? {
        tags.entry(t.recipe_id).or_default().push(Tag {
            id: t.id,
            name: t.name,
            color: t.color,
            slug: t.slug,
        });
    }

    let authors: HashMap<Uuid, Profile> = users_repo::profiles_by_ids(&state.db, viewer, &author_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, Profile::from(p)))
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let author = authors
            .get(&row.author_id)
            .cloned()
            .with_context(|| format!("author {} of recipe {} not found", row.author_id, row.id))?;
        out.push(RecipeRead {
            image: image_url(state, &row.image_key).await?,
            tags: tags.remove(&row.id).unwrap_or_default(),
            ingredients: lines.remove(&row.id).unwrap_or_default(),
            author,
            id: row.id,
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            name: row.name,
            text: row.text,
            cooking_time: row.cooking_time,
            pub_date: row.created_at,
        });
    }
    Ok(out)
}

pub async fn get_recipe(
    state: &AppState,
    viewer: Option<Uuid>,
    id: Uuid,
) -> Result<RecipeRead, ApiError> {
    let row = repo::get(&state.db, viewer, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    hydrate(state, viewer, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))
}

pub async fn list_recipes(
    state: &AppState,
    viewer: Option<Uuid>,
    query: &RecipeListQuery,
) -> Result<Page<RecipeRead>, ApiError> {
    let filter = query.filter(viewer);
    let page = query.page();
    let (count, rows) =
        repo::list(&state.db, viewer, &filter, page.limit(), page.offset()).await?;
    Ok(Page {
        count,
        results: hydrate(state, viewer, rows).await?,
    })
}

/// Store-side checks: every referenced ingredient and tag must exist.
async fn ensure_references(
    state: &AppState,
    lines: &[LineInput],
    tag_ids: &[Uuid],
) -> Result<(), ApiError> {
    let ingredient_ids: Vec<Uuid> = lines.iter().map(|l| l.ingredient_id).collect();
    let mut errors = FieldErrors::new();
    for id in ingredients_repo::missing(&state.db, &ingredient_ids).await? {
        errors.add("ingredients", format!("Ingredient {} does not exist.", id));
    }
    for id in tags_repo::missing(&state.db, tag_ids).await? {
        errors.add("tags", format!("Tag {} does not exist.", id));
    }
    errors.into_result()
}

async fn discard_image(state: &AppState, key: &str) {
    if let Err(e) = state.storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete recipe image");
    }
}

pub async fn create_recipe(
    state: &AppState,
    author_id: Uuid,
    recipe: NewRecipe,
) -> Result<Uuid, ApiError> {
    ensure_references(state, &recipe.ingredients, &recipe.tags).await?;

    let image_key = images::upload(state.storage.as_ref(), author_id, &recipe.image).await?;

    let result: anyhow::Result<Uuid> = async {
        let mut tx = state.db.begin().await.context("begin tx")?;
        let id = repo::insert_tx(
            &mut tx,
            author_id,
            &recipe.name,
            &recipe.text,
            recipe.cooking_time,
            &image_key,
        )
        .await?;
        repo::replace_lines_tx(&mut tx, id, &recipe.ingredients).await?;
        repo::replace_tags_tx(&mut tx, id, &recipe.tags).await?;
        tx.commit().await.context("commit tx")?;
        Ok(id)
    }
    .await;

    match result {
        Ok(id) => {
            info!(recipe_id = %id, %author_id, "recipe created");
            Ok(id)
        }
        Err(e) => {
            discard_image(state, &image_key).await;
            Err(e.into())
        }
    }
}

async fn owned_by(state: &AppState, user_id: Uuid, id: Uuid) -> Result<RecipeOwner, ApiError> {
    let owner = repo::owner(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipe not found".into()))?;
    if owner.author_id != user_id {
        warn!(%user_id, recipe_id = %id, "recipe mutation by non-author");
        return Err(ApiError::Forbidden(
            "You do not have permission to perform this action".into(),
        ));
    }
    Ok(owner)
}

/// Field update, ingredient-line replacement and tag replacement commit
/// together or not at all.
pub async fn update_recipe(
    state: &AppState,
    user_id: Uuid,
    id: Uuid,
    changes: RecipeChanges,
) -> Result<(), ApiError> {
    let owner = owned_by(state, user_id, id).await?;
    ensure_references(state, &changes.ingredients, &changes.tags).await?;

    let new_key = match &changes.image {
        Some(img) => Some(images::upload(state.storage.as_ref(), user_id, img).await?),
        None => None,
    };

    let result: anyhow::Result<bool> = async {
        let mut tx = state.db.begin().await.context("begin tx")?;
        let found = repo::update_fields_tx(
            &mut tx,
            id,
            changes.name.as_deref(),
            changes.text.as_deref(),
            changes.cooking_time,
            new_key.as_deref(),
        )
        .await?;
        if !found {
            return Ok(false);
        }
        repo::replace_lines_tx(&mut tx, id, &changes.ingredients).await?;
        repo::replace_tags_tx(&mut tx, id, &changes.tags).await?;
        tx.commit().await.context("commit tx")?;
        Ok(true)
    }
    .await;

    match (result, new_key) {
        (Ok(true), Some(_)) => {
            discard_image(state, &owner.image_key).await;
        }
        (Ok(true), None) => {}
        (Ok(false), key) => {
            if let Some(key) = key {
                discard_image(state, &key).await;
            }
            warn!(recipe_id = %id, "recipe deleted during update");
            return Err(ApiError::NotFound("Recipe not found".into()));
        }
        (Err(e), key) => {
            if let Some(key) = key {
                discard_image(state, &key).await;
            }
            return Err(e.into());
        }
    }
    info!(recipe_id = %id, %user_id, "recipe updated");
    Ok(())
}

pub async fn delete_recipe(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    let owner = owned_by(state, user_id, id).await?;
    if repo::delete(&state.db, id).await? {
        discard_image(state, &owner.image_key).await;
        info!(recipe_id = %id, %user_id, "recipe deleted");
    }
    Ok(())
}
