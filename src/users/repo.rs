use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String, // argon2, never serialized
    pub created_at: OffsetDateTime,
}

/// Public profile as seen by `viewer`.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password_hash: &'a str,
}

const PROFILE_COLUMNS: &str = r#"
    u.id, u.email, u.username, u.first_name, u.last_name,
    EXISTS (
        SELECT 1 FROM subscriptions s
         WHERE s.user_id = $1 AND s.author_id = u.id
    ) AS is_subscribed
"#;

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, first_name, last_name, password_hash, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await
    .context("find user by email")?;
    Ok(user)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, first_name, last_name, password_hash, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find user by id")?;
    Ok(user)
}

pub async fn exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await
        .context("check user exists")?;
    Ok(found)
}

/// Unique violations surface as `sqlx::Error` so callers can report a conflict.
pub async fn create(db: &PgPool, new: NewUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, username, first_name, last_name, password_hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, email, username, first_name, last_name, password_hash, created_at
        "#,
    )
    .bind(new.email)
    .bind(new.username)
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.password_hash)
    .fetch_one(db)
    .await
}

pub async fn set_password_hash(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await
        .context("update password hash")?;
    Ok(())
}

pub async fn get_profile(
    db: &PgPool,
    viewer: Option<Uuid>,
    id: Uuid,
) -> anyhow::Result<Option<ProfileRow>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = $2");
    let row = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(viewer)
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get profile")?;
    Ok(row)
}

pub async fn profiles_by_ids(
    db: &PgPool,
    viewer: Option<Uuid>,
    ids: &[Uuid],
) -> anyhow::Result<Vec<ProfileRow>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM users u WHERE u.id = ANY($2)");
    let rows = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(viewer)
        .bind(ids)
        .fetch_all(db)
        .await
        .context("profiles by ids")?;
    Ok(rows)
}

pub async fn list_profiles(
    db: &PgPool,
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(i64, Vec<ProfileRow>)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db)
        .await
        .context("count users")?;
    let sql = format!(
        "SELECT {PROFILE_COLUMNS} FROM users u ORDER BY u.username LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list profiles")?;
    Ok((count, rows))
}

/// Authors `user_id` follows, as seen by that same user.
pub async fn list_subscribed_authors(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<(i64, Vec<ProfileRow>)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
        .context("count subscriptions")?;
    let sql = format!(
        r#"
        SELECT {PROFILE_COLUMNS}
          FROM subscriptions sub
          JOIN users u ON u.id = sub.author_id
         WHERE sub.user_id = $1
         ORDER BY u.username
         LIMIT $2 OFFSET $3
        "#
    );
    let rows = sqlx::query_as::<_, ProfileRow>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list subscribed authors")?;
    Ok((count, rows))
}
