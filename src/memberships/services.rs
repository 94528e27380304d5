use tracing::{debug, warn};
use uuid::Uuid;

use super::{MembershipKind, MembershipStore};
use crate::error::ApiError;

/// absent -> present. A second add for the same pair is a conflict.
pub async fn add(
    store: &dyn MembershipStore,
    kind: MembershipKind,
    user_id: Uuid,
    target_id: Uuid,
) -> Result<(), ApiError> {
    if kind == MembershipKind::Subscription && user_id == target_id {
        return Err(ApiError::field("author", "You cannot subscribe to yourself"));
    }
    if !store.insert(kind, user_id, target_id).await? {
        warn!(?kind, %user_id, %target_id, "duplicate membership");
        return Err(ApiError::Conflict(kind.duplicate_message().into()));
    }
    debug!(?kind, %user_id, %target_id, "membership added");
    Ok(())
}

/// present -> absent. Removing an absent pair is rejected.
pub async fn remove(
    store: &dyn MembershipStore,
    kind: MembershipKind,
    user_id: Uuid,
    target_id: Uuid,
) -> Result<(), ApiError> {
    if !store.delete(kind, user_id, target_id).await? {
        return Err(ApiError::BadRequest(kind.missing_message().into()));
    }
    debug!(?kind, %user_id, %target_id, "membership removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        pairs: Mutex<HashSet<(MembershipKind, Uuid, Uuid)>>,
    }

    #[async_trait]
    impl MembershipStore for MemoryStore {
        async fn insert(&self, kind: MembershipKind, u: Uuid, t: Uuid) -> anyhow::Result<bool> {
            Ok(self.pairs.lock().unwrap().insert((kind, u, t)))
        }
        async fn delete(&self, kind: MembershipKind, u: Uuid, t: Uuid) -> anyhow::Result<bool> {
            Ok(self.pairs.lock().unwrap().remove(&(kind, u, t)))
        }
        async fn contains(&self, kind: MembershipKind, u: Uuid, t: Uuid) -> anyhow::Result<bool> {
            Ok(self.pairs.lock().unwrap().contains(&(kind, u, t)))
        }
    }

    const KINDS: [MembershipKind; 3] = [
        MembershipKind::Favorite,
        MembershipKind::ShoppingCart,
        MembershipKind::Subscription,
    ];

    #[tokio::test]
    async fn toggle_round_trips() {
        let store = MemoryStore::default();
        let (user, target) = (Uuid::new_v4(), Uuid::new_v4());
        for kind in KINDS {
            add(&store, kind, user, target).await.unwrap();
            assert!(store.contains(kind, user, target).await.unwrap());
            remove(&store, kind, user, target).await.unwrap();
            assert!(!store.contains(kind, user, target).await.unwrap());
            add(&store, kind, user, target).await.unwrap();
            assert!(store.contains(kind, user, target).await.unwrap());
        }
    }

    #[tokio::test]
    async fn second_add_is_conflict_and_state_stays_present() {
        let store = MemoryStore::default();
        let (user, recipe) = (Uuid::new_v4(), Uuid::new_v4());
        add(&store, MembershipKind::Favorite, user, recipe).await.unwrap();

        let err = add(&store, MembershipKind::Favorite, user, recipe).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(store.contains(MembershipKind::Favorite, user, recipe).await.unwrap());
    }

    #[tokio::test]
    async fn kinds_are_separate_namespaces() {
        let store = MemoryStore::default();
        let (user, recipe) = (Uuid::new_v4(), Uuid::new_v4());
        add(&store, MembershipKind::Favorite, user, recipe).await.unwrap();
        assert!(!store.contains(MembershipKind::ShoppingCart, user, recipe).await.unwrap());
        add(&store, MembershipKind::ShoppingCart, user, recipe).await.unwrap();
    }

    #[tokio::test]
    async fn removing_absent_pair_is_rejected() {
        let store = MemoryStore::default();
        let err = remove(&store, MembershipKind::ShoppingCart, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn self_subscription_is_rejected_in_any_state() {
        let store = MemoryStore::default();
        let me = Uuid::new_v4();
        let err = add(&store, MembershipKind::Subscription, me, me).await.unwrap_err();
        let ApiError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains("author"));
        assert!(!store.contains(MembershipKind::Subscription, me, me).await.unwrap());
    }
}
