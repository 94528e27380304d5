use anyhow::Context;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One ingredient line of one recipe in the cart.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

pub async fn cart_lines(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
          FROM shopping_cart c
          JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE c.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("load shopping cart lines")?;
    Ok(rows)
}
