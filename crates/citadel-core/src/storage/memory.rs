//! In-memory storage implementation
//!
//! All tables live behind a single `RwLock`, so each trait method — including
//! the compound ones (Mantle upsert/revoke, shutdown plus alert bulk-resolve)
//! — is atomic with respect to concurrent readers.

use super::traits::*;
use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use citadel_types::{
    AlertId, AuditRecord, Mantle, Notification, NotificationId, PanicAlert, Role, SiteState,
    UserAccount, UserId,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<UserId, UserAccount>,
    mantles: HashMap<UserId, Mantle>,
    site: Option<SiteState>,
    alerts: Vec<PanicAlert>,
    notifications: Vec<Notification>,
    audit: Vec<AuditRecord>,
}

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStorage for MemoryStorage {
    async fn get_account(&self, id: &UserId) -> StorageResult<Option<UserAccount>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(id).cloned())
    }

    async fn get_account_by_username(&self, username: &str) -> StorageResult<Option<UserAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn list_accounts(&self) -> StorageResult<Vec<UserAccount>> {
        let tables = self.tables.read().await;
        let mut accounts: Vec<_> = tables.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(accounts)
    }

    async fn list_accounts_with_roles(&self, roles: &[Role]) -> StorageResult<Vec<UserAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .filter(|a| roles.contains(&a.role))
            .cloned()
            .collect())
    }

    async fn insert_account(&self, account: UserAccount) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .accounts
            .values()
            .any(|a| a.username == account.username)
        {
            return Err(StorageError::Conflict(format!(
                "username {} already exists",
                account.username
            )));
        }
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    async fn upsert_account(&self, account: UserAccount) -> StorageResult<UserAccount> {
        let mut tables = self.tables.write().await;
        let existing_id = tables
            .accounts
            .values()
            .find(|a| a.username == account.username)
            .map(|a| a.id);

        let stored = match existing_id {
            Some(id) => {
                let entry = tables
                    .accounts
                    .get_mut(&id)
                    .ok_or_else(|| StorageError::NotFound(format!("account {}", id)))?;
                entry.role = account.role;
                entry.display_name = account.display_name;
                if !account.password_hash.is_empty() {
                    entry.password_hash = account.password_hash;
                }
                entry.clone()
            }
            None => {
                tables.accounts.insert(account.id, account.clone());
                account
            }
        };
        Ok(stored)
    }

    async fn set_role(&self, id: &UserId, role: Role) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(id) {
            Some(account) => {
                account.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl MantleStorage for MemoryStorage {
    async fn get_mantle(&self, holder: &UserId) -> StorageResult<Option<Mantle>> {
        let tables = self.tables.read().await;
        Ok(tables.mantles.get(holder).cloned())
    }

    async fn upsert_mantle(&self, mantle: Mantle) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.mantles.insert(mantle.holder, mantle);
        Ok(())
    }

    async fn revoke_mantle(
        &self,
        holder: &UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Mantle>> {
        let mut tables = self.tables.write().await;
        match tables.mantles.get_mut(holder) {
            Some(mantle) => {
                mantle.is_active = false;
                mantle.end_time = now;
                Ok(Some(mantle.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_active_mantles(&self) -> StorageResult<Vec<Mantle>> {
        let tables = self.tables.read().await;
        let mut mantles: Vec<_> = tables
            .mantles
            .values()
            .filter(|m| m.is_active)
            .cloned()
            .collect();
        mantles.sort_by_key(|m| m.end_time);
        Ok(mantles)
    }

    async fn sweep_expired_mantles(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut tables = self.tables.write().await;
        let mut count = 0;
        for mantle in tables.mantles.values_mut() {
            if mantle.is_active && mantle.end_time < now {
                mantle.is_active = false;
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl SiteStorage for MemoryStorage {
    async fn get_site_state(&self) -> StorageResult<SiteState> {
        {
            let tables = self.tables.read().await;
            if let Some(state) = &tables.site {
                return Ok(state.clone());
            }
        }
        let mut tables = self.tables.write().await;
        Ok(tables.site.get_or_insert_with(SiteState::online).clone())
    }

    async fn shutdown_site(
        &self,
        resolver: &UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<(SiteState, usize)> {
        let mut tables = self.tables.write().await;
        let state = SiteState {
            is_shutdown: true,
            updated_at: now,
        };
        tables.site = Some(state.clone());

        let mut resolved = 0;
        for alert in tables.alerts.iter_mut().filter(|a| !a.is_resolved()) {
            alert.resolved_at = Some(now);
            alert.resolver = Some(*resolver);
            resolved += 1;
        }
        Ok((state, resolved))
    }

    async fn bring_site_online(&self, now: DateTime<Utc>) -> StorageResult<SiteState> {
        let mut tables = self.tables.write().await;
        let state = SiteState {
            is_shutdown: false,
            updated_at: now,
        };
        tables.site = Some(state.clone());
        Ok(state)
    }
}

#[async_trait]
impl PanicStorage for MemoryStorage {
    async fn insert_alert(&self, alert: PanicAlert) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.alerts.push(alert);
        Ok(())
    }

    async fn get_alert(&self, id: &AlertId) -> StorageResult<Option<PanicAlert>> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.iter().find(|a| a.id == *id).cloned())
    }

    async fn resolve_alert(
        &self,
        id: &AlertId,
        resolver: &UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<PanicAlert>> {
        let mut tables = self.tables.write().await;
        match tables.alerts.iter_mut().find(|a| a.id == *id) {
            Some(alert) => {
                if !alert.is_resolved() {
                    alert.resolved_at = Some(now);
                    alert.resolver = Some(*resolver);
                }
                Ok(Some(alert.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_unresolved_alerts(&self) -> StorageResult<Vec<PanicAlert>> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<_> = tables
            .alerts
            .iter()
            .filter(|a| !a.is_resolved())
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }
}

#[async_trait]
impl NotificationStorage for MemoryStorage {
    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.notifications.extend(notifications);
        Ok(())
    }

    async fn list_notifications_for(
        &self,
        recipient: &UserId,
    ) -> StorageResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<_> = tables
            .notifications
            .iter()
            .filter(|n| n.recipient == *recipient)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(
        &self,
        id: &NotificationId,
        recipient: &UserId,
    ) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == *id && n.recipient == *recipient)
        {
            Some(notification) => {
                notification.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn insert_audit(&self, record: AuditRecord) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables.audit.push(record);
        Ok(())
    }

    async fn list_audit(&self) -> StorageResult<Vec<AuditRecord>> {
        let tables = self.tables.read().await;
        let mut records = tables.audit.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}

#[async_trait]
impl Storage for MemoryStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn heir_account(username: &str) -> UserAccount {
        let mut account = UserAccount::new(username, "");
        account.role = Role::Heir;
        account
    }

    #[tokio::test]
    async fn insert_account_rejects_duplicate_username() {
        let storage = MemoryStorage::new();
        storage.insert_account(heir_account("kestrel")).await.unwrap();
        let err = storage
            .insert_account(heir_account("kestrel"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn site_state_is_lazily_created_online() {
        let storage = MemoryStorage::new();
        let state = storage.get_site_state().await.unwrap();
        assert!(!state.is_shutdown);
    }

    #[tokio::test]
    async fn shutdown_resolves_open_alerts_in_one_step() {
        let storage = MemoryStorage::new();
        let raiser = UserId::generate();
        let hq = UserId::generate();
        storage
            .insert_alert(PanicAlert::new(raiser, "breach"))
            .await
            .unwrap();
        storage
            .insert_alert(PanicAlert::new(raiser, "second breach"))
            .await
            .unwrap();

        let (state, resolved) = storage.shutdown_site(&hq, Utc::now()).await.unwrap();
        assert!(state.is_shutdown);
        assert_eq!(resolved, 2);
        assert!(storage.list_unresolved_alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sweep_marks_only_time_expired_active_mantles() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        let expired = Mantle {
            holder: UserId::generate(),
            granted_by: UserId::generate(),
            start_time: now - Duration::hours(2),
            end_time: now - Duration::hours(1),
            is_active: true,
        };
        let live = Mantle {
            holder: UserId::generate(),
            granted_by: UserId::generate(),
            start_time: now,
            end_time: now + Duration::hours(1),
            is_active: true,
        };
        storage.upsert_mantle(expired).await.unwrap();
        storage.upsert_mantle(live.clone()).await.unwrap();

        assert_eq!(storage.sweep_expired_mantles(now).await.unwrap(), 1);
        // second sweep is a no-op
        assert_eq!(storage.sweep_expired_mantles(now).await.unwrap(), 0);
        let active = storage.list_active_mantles().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].holder, live.holder);
    }

    #[tokio::test]
    async fn resolve_alert_is_noop_when_already_resolved() {
        let storage = MemoryStorage::new();
        let raiser = UserId::generate();
        let resolver = UserId::generate();
        let alert = PanicAlert::new(raiser, "breach");
        let id = alert.id;
        storage.insert_alert(alert).await.unwrap();

        let first = storage
            .resolve_alert(&id, &resolver, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let first_resolved_at = first.resolved_at;

        let second = storage
            .resolve_alert(&id, &resolver, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.resolved_at, first_resolved_at);
    }
}
