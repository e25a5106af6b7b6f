//! Effective-role resolution
//!
//! The resolver combines the persisted base role with the live Mantle check.
//! It is pure given the current time and store contents, and is re-evaluated
//! on every request — Mantle activity is time-dependent, so the result must
//! never be cached or baked into a token.

use crate::error::CoreResult;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use citadel_types::{EffectiveRole, Role, UserId};

/// Resolve the effective role for an identity at `now`.
///
/// Returns `None` (no role, fails closed) for an unauthenticated identity or
/// an id with no provisioned account. A HEIR holding a currently active
/// Mantle resolves to acting PROTECTOR.
pub async fn effective_role_at(
    storage: &dyn Storage,
    identity: Option<&UserId>,
    now: DateTime<Utc>,
) -> CoreResult<Option<EffectiveRole>> {
    let Some(id) = identity else {
        return Ok(None);
    };

    let Some(account) = storage.get_account(id).await? else {
        return Ok(None);
    };

    if account.role == Role::Heir {
        if let Some(mantle) = storage.get_mantle(id).await? {
            if mantle.is_currently_active(now) {
                return Ok(Some(EffectiveRole::acting_protector()));
            }
        }
    }

    Ok(Some(EffectiveRole::base(account.role)))
}

/// Resolve the effective role at the current instant.
pub async fn effective_role(
    storage: &dyn Storage,
    identity: Option<&UserId>,
) -> CoreResult<Option<EffectiveRole>> {
    effective_role_at(storage, identity, Utc::now()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{IdentityStorage, MantleStorage, MemoryStorage};
    use chrono::Duration;
    use citadel_types::{Mantle, UserAccount};

    async fn seed_user(storage: &MemoryStorage, role: Role) -> UserId {
        let mut account = UserAccount::new(format!("user-{}", UserId::generate()), "");
        account.role = role;
        let id = account.id;
        storage.insert_account(account).await.unwrap();
        id
    }

    #[tokio::test]
    async fn unauthenticated_identity_has_no_role() {
        let storage = MemoryStorage::new();
        let resolved = effective_role(&storage, None).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn unprovisioned_account_has_no_role() {
        let storage = MemoryStorage::new();
        let ghost = UserId::generate();
        let resolved = effective_role(&storage, Some(&ghost)).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn heir_without_mantle_stays_heir() {
        let storage = MemoryStorage::new();
        let heir = seed_user(&storage, Role::Heir).await;
        let resolved = effective_role(&storage, Some(&heir)).await.unwrap();
        assert_eq!(resolved, Some(EffectiveRole::base(Role::Heir)));
    }

    #[tokio::test]
    async fn heir_with_active_mantle_is_acting_protector() {
        let storage = MemoryStorage::new();
        let heir = seed_user(&storage, Role::Heir).await;
        let protector = seed_user(&storage, Role::Protector).await;
        let t0 = Utc::now();
        storage
            .upsert_mantle(Mantle {
                holder: heir,
                granted_by: protector,
                start_time: t0,
                end_time: t0 + Duration::hours(1),
                is_active: true,
            })
            .await
            .unwrap();

        // at T0+30min: acting protector
        let mid = effective_role_at(&storage, Some(&heir), t0 + Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(mid, Some(EffectiveRole::acting_protector()));

        // at T0+61min: back to heir, no sweep needed
        let late = effective_role_at(&storage, Some(&heir), t0 + Duration::minutes(61))
            .await
            .unwrap();
        assert_eq!(late, Some(EffectiveRole::base(Role::Heir)));
    }

    #[tokio::test]
    async fn mantle_on_non_heir_does_not_elevate() {
        // a stale mantle record left on an account whose role was changed
        let storage = MemoryStorage::new();
        let observer = seed_user(&storage, Role::Observer).await;
        let protector = seed_user(&storage, Role::Protector).await;
        let t0 = Utc::now();
        storage
            .upsert_mantle(Mantle {
                holder: observer,
                granted_by: protector,
                start_time: t0,
                end_time: t0 + Duration::hours(1),
                is_active: true,
            })
            .await
            .unwrap();

        let resolved = effective_role(&storage, Some(&observer)).await.unwrap();
        assert_eq!(resolved, Some(EffectiveRole::base(Role::Observer)));
    }

    #[tokio::test]
    async fn resolver_is_idempotent_without_state_change() {
        let storage = MemoryStorage::new();
        let hq = seed_user(&storage, Role::Hq).await;
        let now = Utc::now();
        let first = effective_role_at(&storage, Some(&hq), now).await.unwrap();
        let second = effective_role_at(&storage, Some(&hq), now).await.unwrap();
        assert_eq!(first, second);
    }
}
