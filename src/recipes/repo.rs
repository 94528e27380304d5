use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{LineInput, RecipeFilter};

/// A recipe row plus the viewer's favorite/cart flags.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image_key: String,
    pub created_at: OffsetDateTime,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeOwner {
    pub author_id: Uuid,
    pub image_key: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ShortRow {
    pub id: Uuid,
    pub name: String,
    pub image_key: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct LineRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

fn select_recipes(viewer: Option<Uuid>) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.text, r.cooking_time, r.image_key, r.created_at, \
         EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    qb.push_bind(viewer);
    qb.push(
        ") AS is_favorited, \
         EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    qb.push_bind(viewer);
    qb.push(") AS is_in_shopping_cart FROM recipes r");
    qb
}

/// Appends the WHERE clause for `filter`. Tag slugs match any-of.
pub(crate) fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &RecipeFilter) {
    qb.push(" WHERE TRUE");
    if !filter.tags.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        qb.push_bind(filter.tags.clone());
        qb.push("))");
    }
    if let Some(author) = filter.author {
        qb.push(" AND r.author_id = ");
        qb.push_bind(author);
    }
    if let Some(user) = filter.favorited_by {
        qb.push(" AND EXISTS (SELECT 1 FROM favorites f2 WHERE f2.recipe_id = r.id AND f2.user_id = ");
        qb.push_bind(user);
        qb.push(")");
    }
    if let Some(user) = filter.in_cart_of {
        qb.push(
            " AND EXISTS (SELECT 1 FROM shopping_cart c2 WHERE c2.recipe_id = r.id AND c2.user_id = ",
        );
        qb.push_bind(user);
        qb.push(")");
    }
}

pub async fn list(
    db: &PgPool,
    viewer: Option<Uuid>,
    filter: &RecipeFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(i64, Vec<RecipeRow>)> {
    let mut count_q = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
    push_filters(&mut count_q, filter);
    let count: i64 = count_q
        .build_query_scalar()
        .fetch_one(db)
        .await
        .context("count recipes")?;

    let mut qb = select_recipes(viewer);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY r.created_at DESC, r.id LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    let rows = qb
        .build_query_as::<RecipeRow>()
        .fetch_all(db)
        .await
        .context("list recipes")?;
    Ok((count, rows))
}

pub async fn get(db: &PgPool, viewer: Option<Uuid>, id: Uuid) -> anyhow::Result<Option<RecipeRow>> {
    let mut qb = select_recipes(viewer);
    qb.push(" WHERE r.id = ");
    qb.push_bind(id);
    let row = qb
        .build_query_as::<RecipeRow>()
        .fetch_optional(db)
        .await
        .context("get recipe")?;
    Ok(row)
}

pub async fn owner(db: &PgPool, id: Uuid) -> anyhow::Result<Option<RecipeOwner>> {
    let row = sqlx::query_as::<_, RecipeOwner>(
        "SELECT author_id, image_key FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get recipe owner")?;
    Ok(row)
}

pub async fn short(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ShortRow>> {
    let row = sqlx::query_as::<_, ShortRow>(
        "SELECT id, name, image_key, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get short recipe")?;
    Ok(row)
}

/// Newest first; `limit = None` returns all of the author's recipes.
pub async fn short_by_author(
    db: &PgPool,
    author_id: Uuid,
    limit: Option<i64>,
) -> anyhow::Result<Vec<ShortRow>> {
    let rows = sqlx::query_as::<_, ShortRow>(
        r#"
        SELECT id, name, image_key, cooking_time
          FROM recipes
         WHERE author_id = $1
         ORDER BY created_at DESC, id
         LIMIT $2
        "#,
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(db)
    .await
    .context("list recipes by author")?;
    Ok(rows)
}

pub async fn count_by_author(db: &PgPool, author_id: Uuid) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(db)
        .await
        .context("count recipes by author")?;
    Ok(count)
}

pub async fn lines_for(db: &PgPool, recipe_ids: &[Uuid]) -> anyhow::Result<Vec<LineRow>> {
    let rows = sqlx::query_as::<_, LineRow>(
        r#"
        SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = ANY($1)
         ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("list ingredient lines")?;
    Ok(rows)
}

pub async fn tags_for(db: &PgPool, recipe_ids: &[Uuid]) -> anyhow::Result<Vec<RecipeTagRow>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY t.name
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
    .context("list recipe tags")?;
    Ok(rows)
}

// ---- writes (inside a transaction) ----

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    author_id: Uuid,
    name: &str,
    text: &str,
    cooking_time: i32,
    image_key: &str,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO recipes (author_id, name, text, cooking_time, image_key)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(author_id)
    .bind(name)
    .bind(text)
    .bind(cooking_time)
    .bind(image_key)
    .fetch_one(&mut **tx)
    .await
    .context("insert recipe")?;
    Ok(id)
}

/// `None` keeps the stored value. `false` when the recipe row is gone.
pub async fn update_fields_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    name: Option<&str>,
    text: Option<&str>,
    cooking_time: Option<i32>,
    image_key: Option<&str>,
) -> anyhow::Result<bool> {
    let done = sqlx::query(
        r#"
        UPDATE recipes
           SET name = COALESCE($2, name),
               text = COALESCE($3, text),
               cooking_time = COALESCE($4, cooking_time),
               image_key = COALESCE($5, image_key)
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(text)
    .bind(cooking_time)
    .bind(image_key)
    .execute(&mut **tx)
    .await
    .context("update recipe")?;
    Ok(done.rows_affected() > 0)
}

/// Deletes every line of the recipe, then inserts `lines`.
pub async fn replace_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    lines: &[LineInput],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear ingredient lines")?;

    let (ids, amounts): (Vec<Uuid>, Vec<i32>) =
        lines.iter().map(|l| (l.ingredient_id, l.amount)).unzip();
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, x.ingredient_id, x.amount
          FROM UNNEST($2::uuid[], $3::int4[]) AS x(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(&ids)
    .bind(&amounts)
    .execute(&mut **tx)
    .await
    .context("insert ingredient lines")?;
    Ok(())
}

pub async fn replace_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
    tag_ids: &[Uuid],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe tags")?;
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, x.tag_id FROM UNNEST($2::uuid[]) AS x(tag_id)
        "#,
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await
    .context("insert recipe tags")?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete recipe")?;
    Ok(done.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_adds_no_conditions() {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        push_filters(&mut qb, &RecipeFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM recipes r WHERE TRUE");
    }

    #[test]
    fn every_filter_binds_its_own_parameter() {
        let filter = RecipeFilter {
            tags: vec!["lunch".into(), "dinner".into()],
            author: Some(Uuid::new_v4()),
            favorited_by: Some(Uuid::new_v4()),
            in_cart_of: Some(Uuid::new_v4()),
        };
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        push_filters(&mut qb, &filter);
        let sql = qb.sql();
        assert!(sql.contains("t.slug = ANY($1)"));
        assert!(sql.contains("r.author_id = $2"));
        assert!(sql.contains("f2.user_id = $3"));
        assert!(sql.contains("c2.user_id = $4"));
    }

    #[test]
    fn select_binds_viewer_twice() {
        let mut qb = select_recipes(None);
        qb.push(" WHERE r.id = ");
        qb.push_bind(Uuid::nil());
        let sql = qb.sql();
        assert!(sql.contains("f.user_id = $1"));
        assert!(sql.contains("c.user_id = $2"));
        assert!(sql.ends_with("r.id = $3"));
    }
}
