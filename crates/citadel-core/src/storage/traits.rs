//! Storage trait definitions
//!
//! Multi-step writes the spec requires to be atomic (Mantle upsert/revoke,
//! shutdown plus alert bulk-resolve) are single trait methods, so every
//! implementation can make them transactional.

use crate::error::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use citadel_types::{
    AlertId, AuditRecord, Mantle, Notification, NotificationId, PanicAlert, Role, SiteState,
    UserAccount, UserId,
};

/// Combined storage trait
#[async_trait]
pub trait Storage:
    IdentityStorage
    + MantleStorage
    + SiteStorage
    + PanicStorage
    + NotificationStorage
    + AuditStorage
    + Send
    + Sync
{
}

/// Storage for user accounts (the identity store)
#[async_trait]
pub trait IdentityStorage: Send + Sync {
    /// Get an account by ID
    async fn get_account(&self, id: &UserId) -> StorageResult<Option<UserAccount>>;

    /// Get an account by username
    async fn get_account_by_username(&self, username: &str) -> StorageResult<Option<UserAccount>>;

    /// List all accounts
    async fn list_accounts(&self) -> StorageResult<Vec<UserAccount>>;

    /// List accounts whose base role is one of `roles`
    async fn list_accounts_with_roles(&self, roles: &[Role]) -> StorageResult<Vec<UserAccount>>;

    /// Insert a new account. Fails with `Conflict` if the username is taken.
    async fn insert_account(&self, account: UserAccount) -> StorageResult<()>;

    /// Create or update an account keyed by username, returning the stored
    /// record. Used by HQ bootstrap.
    async fn upsert_account(&self, account: UserAccount) -> StorageResult<UserAccount>;

    /// Set the base role of an existing account. Returns false if absent.
    async fn set_role(&self, id: &UserId, role: Role) -> StorageResult<bool>;
}

/// Storage for the Mantle ledger
#[async_trait]
pub trait MantleStorage: Send + Sync {
    /// Get the holder's Mantle, if any
    async fn get_mantle(&self, holder: &UserId) -> StorageResult<Option<Mantle>>;

    /// Create or replace the holder's Mantle in one step
    async fn upsert_mantle(&self, mantle: Mantle) -> StorageResult<()>;

    /// Mark the holder's Mantle revoked (`is_active = false`,
    /// `end_time = now`). Returns the updated record, or None if the holder
    /// has no Mantle.
    async fn revoke_mantle(
        &self,
        holder: &UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Mantle>>;

    /// List Mantles with `is_active = true`, ordered by end time
    async fn list_active_mantles(&self) -> StorageResult<Vec<Mantle>>;

    /// Mark every time-expired Mantle inactive; returns count affected
    async fn sweep_expired_mantles(&self, now: DateTime<Utc>) -> StorageResult<usize>;
}

/// Storage for the global site state
#[async_trait]
pub trait SiteStorage: Send + Sync {
    /// Read the site state, lazily creating it ONLINE if absent
    async fn get_site_state(&self) -> StorageResult<SiteState>;

    /// Flip to SHUTDOWN and bulk-resolve all open panic alerts in the same
    /// step. Returns the new state and the number of alerts resolved.
    async fn shutdown_site(
        &self,
        resolver: &UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<(SiteState, usize)>;

    /// Flip back to ONLINE
    async fn bring_site_online(&self, now: DateTime<Utc>) -> StorageResult<SiteState>;
}

/// Storage for the panic ledger
#[async_trait]
pub trait PanicStorage: Send + Sync {
    /// Append a panic alert
    async fn insert_alert(&self, alert: PanicAlert) -> StorageResult<()>;

    /// Get an alert by ID
    async fn get_alert(&self, id: &AlertId) -> StorageResult<Option<PanicAlert>>;

    /// Mark one alert resolved. Returns the updated record, or None if the
    /// id is unknown. Resolving an already-resolved alert is a no-op that
    /// returns the record unchanged.
    async fn resolve_alert(
        &self,
        id: &AlertId,
        resolver: &UserId,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<PanicAlert>>;

    /// List unresolved alerts, newest first
    async fn list_unresolved_alerts(&self) -> StorageResult<Vec<PanicAlert>>;
}

/// Storage for persisted notifications
#[async_trait]
pub trait NotificationStorage: Send + Sync {
    /// Append notifications (bulk fan-out friendly)
    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StorageResult<()>;

    /// List a recipient's notifications, newest first
    async fn list_notifications_for(&self, recipient: &UserId)
        -> StorageResult<Vec<Notification>>;

    /// Mark one of the recipient's notifications read. Returns false if the
    /// notification does not exist or belongs to someone else.
    async fn mark_notification_read(
        &self,
        id: &NotificationId,
        recipient: &UserId,
    ) -> StorageResult<bool>;
}

/// Storage for the append-only audit log
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Append an audit record
    async fn insert_audit(&self, record: AuditRecord) -> StorageResult<()>;

    /// List audit records, newest first
    async fn list_audit(&self) -> StorageResult<Vec<AuditRecord>>;
}
