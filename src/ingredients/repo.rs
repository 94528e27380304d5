use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Escapes LIKE metacharacters so user input matches literally.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Case-insensitive search: names starting with `query` first, then names
/// containing it; each group by name. No query lists everything by name.
pub async fn search(db: &PgPool, query: Option<&str>) -> anyhow::Result<Vec<Ingredient>> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(escape_like);
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
          FROM ingredients
         WHERE $1::text IS NULL
            OR name ILIKE '%' || $1 || '%' ESCAPE '\'
         ORDER BY CASE WHEN name ILIKE $1 || '%' ESCAPE '\' THEN 0 ELSE 1 END,
                  name,
                  measurement_unit
        "#,
    )
    .bind(pattern)
    .fetch_all(db)
    .await
    .context("search ingredients")?;
    Ok(rows)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Ingredient>> {
    let row = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("get ingredient")?;
    Ok(row)
}

/// Ids from `ids` that have no ingredient row.
pub async fn missing(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT x.id
          FROM UNNEST($1::uuid[]) AS x(id)
         WHERE NOT EXISTS (SELECT 1 FROM ingredients i WHERE i.id = x.id)
        "#,
    )
    .bind(ids)
    .fetch_all(db)
    .await
    .context("check ingredient ids")?;
    Ok(rows)
}

/// Inserts `(name, unit)` pairs, skipping ones already stored. Returns the
/// number of new rows.
pub async fn insert_many(db: &PgPool, rows: &[(String, String)]) -> anyhow::Result<u64> {
    let (names, units): (Vec<&str>, Vec<&str>) = rows
        .iter()
        .map(|(n, u)| (n.as_str(), u.as_str()))
        .unzip();
    let done = sqlx::query(
        r#"
        INSERT INTO ingredients (name, measurement_unit)
        SELECT * FROM UNNEST($1::text[], $2::text[])
        ON CONFLICT ON CONSTRAINT unique_name_measurement_unit DO NOTHING
        "#,
    )
    .bind(&names)
    .bind(&units)
    .execute(db)
    .await
    .context("bulk insert ingredients")?;
    Ok(done.rows_affected())
}
