use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(db)
        .await
        .context("list tags")?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Tag>> {
    let row = sqlx::query_as::<_, Tag>("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get tag")?;
    Ok(row)
}

/// Ids from `ids` that have no tag row.
pub async fn missing(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT x.id
          FROM UNNEST($1::uuid[]) AS x(id)
         WHERE NOT EXISTS (SELECT 1 FROM tags t WHERE t.id = x.id)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .context("check tag ids")?;
    Ok(rows)
}
