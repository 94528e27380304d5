use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::MembershipKind;

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// `false` when the pair was already present.
    async fn insert(&self, kind: MembershipKind, user_id: Uuid, target_id: Uuid)
        -> anyhow::Result<bool>;
    /// `false` when the pair was absent.
    async fn delete(&self, kind: MembershipKind, user_id: Uuid, target_id: Uuid)
        -> anyhow::Result<bool>;
    async fn contains(&self, kind: MembershipKind, user_id: Uuid, target_id: Uuid)
        -> anyhow::Result<bool>;
}

#[async_trait]
impl MembershipStore for PgPool {
    async fn insert(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table(),
            kind.target_column()
        );
        let done = sqlx::query(&sql)
            .bind(user_id)
            .bind(target_id)
            .execute(self)
            .await
            .with_context(|| format!("insert into {}", kind.table()))?;
        Ok(done.rows_affected() == 1)
    }

    async fn delete(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.target_column()
        );
        let done = sqlx::query(&sql)
            .bind(user_id)
            .bind(target_id)
            .execute(self)
            .await
            .with_context(|| format!("delete from {}", kind.table()))?;
        Ok(done.rows_affected() > 0)
    }

    async fn contains(
        &self,
        kind: MembershipKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> anyhow::Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
            kind.table(),
            kind.target_column()
        );
        let found: bool = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(target_id)
            .fetch_one(self)
            .await
            .with_context(|| format!("lookup in {}", kind.table()))?;
        Ok(found)
    }
}
