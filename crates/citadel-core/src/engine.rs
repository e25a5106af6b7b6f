//! The authority engine
//!
//! One engine instance owns the storage handle and exposes every operation
//! the REST surface maps to. Each operation resolves the actor's role
//! per call, enforces its predicate, performs the mutation, then records
//! notifications and audit entries best-effort — a failed side call is
//! logged and never rolls back the primary operation.

use crate::authz;
use crate::error::{CoreError, CoreResult};
use crate::resolver;
use crate::storage::Storage;
use chrono::{DateTime, Duration, Utc};
use citadel_types::{
    AlertId, AuditRecord, AuditRecordId, EffectiveRole, Mantle, Notification,
    NotificationCategory, NotificationId, PanicAlert, Role, SiteState, UserAccount, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Caller-facing Mantle status for the holder's own lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MantleStatus {
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

/// A Mantle joined with holder and grantor usernames for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MantleView {
    pub holder_id: UserId,
    pub holder_username: String,
    pub granted_by_id: UserId,
    pub granted_by_username: Option<String>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
}

/// An unresolved alert joined with the raiser's username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertView {
    pub id: AlertId,
    pub raiser_username: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Result of raising a panic.
#[derive(Debug, Clone, Serialize)]
pub struct PanicOutcome {
    pub alert: PanicAlert,
    /// True when the raiser's effective role triggered an immediate shutdown
    pub shutdown: bool,
}

/// Result of resolving a panic alert.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    pub alert: PanicAlert,
    pub already_resolved: bool,
}

/// The authority engine: role resolution, Mantle ledger, site gate, panic
/// ledger, plus the notification and audit side channels.
pub struct AuthorityEngine {
    storage: Arc<dyn Storage>,
}

impl AuthorityEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    // --- Identity ---

    /// Create a new account with the default OBSERVER role. The profile is
    /// provisioned here, synchronously, not by an event hook.
    pub async fn register_account(
        &self,
        username: &str,
        display_name: &str,
        password_hash: String,
    ) -> CoreResult<UserAccount> {
        let username = username.trim();
        if username.is_empty() {
            return Err(CoreError::Validation("username is required".to_string()));
        }
        let mut account = UserAccount::new(username, display_name.trim());
        account.password_hash = password_hash;

        self.storage.insert_account(account.clone()).await.map_err(|e| match e {
            crate::error::StorageError::Conflict(_) => {
                CoreError::Validation(format!("username {} is already taken", username))
            }
            other => CoreError::Storage(other),
        })?;
        Ok(account)
    }

    /// Ensure an HQ account exists with the given credentials, creating or
    /// updating it. Used at daemon startup.
    pub async fn ensure_hq_account(
        &self,
        username: &str,
        password_hash: String,
    ) -> CoreResult<UserAccount> {
        let mut account = UserAccount::new(username, "");
        account.role = Role::Hq;
        account.password_hash = password_hash;
        let stored = self.storage.upsert_account(account).await?;
        if stored.role != Role::Hq {
            self.storage.set_role(&stored.id, Role::Hq).await?;
        }
        Ok(stored)
    }

    pub async fn account(&self, id: &UserId) -> CoreResult<UserAccount> {
        self.storage
            .get_account(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("account {}", id)))
    }

    pub async fn account_by_username(&self, username: &str) -> CoreResult<Option<UserAccount>> {
        Ok(self.storage.get_account_by_username(username).await?)
    }

    /// List all accounts. Requires a genuine Protector.
    pub async fn list_accounts(&self, actor: &UserId) -> CoreResult<Vec<UserAccount>> {
        let (account, _) = self.require_actor(actor).await?;
        if !authz::true_protector(account.role) {
            return Err(CoreError::Forbidden(
                "listing accounts requires a genuine Protector".to_string(),
            ));
        }
        Ok(self.storage.list_accounts().await?)
    }

    /// Change a user's base role. HQ only, by base role.
    pub async fn set_role(
        &self,
        actor: &UserId,
        target: &UserId,
        role: Role,
    ) -> CoreResult<UserAccount> {
        let (account, effective) = self.require_actor(actor).await?;
        if !authz::hq_base_role(account.role) {
            return Err(CoreError::Forbidden(
                "only HQ may change base roles".to_string(),
            ));
        }
        if !self.storage.set_role(target, role).await? {
            return Err(CoreError::NotFound(format!("account {}", target)));
        }
        let updated = self.account(target).await?;
        self.audit(
            Some(*actor),
            effective.audit_label(),
            format!("Set base role of {} to {}", updated.username, role),
            Some(target.to_string()),
            None,
        )
        .await;
        Ok(updated)
    }

    // --- Role resolution ---

    /// Effective role for an identity, at the current instant.
    pub async fn effective_role_for(
        &self,
        identity: Option<&UserId>,
    ) -> CoreResult<Option<EffectiveRole>> {
        resolver::effective_role(self.storage.as_ref(), identity).await
    }

    /// Effective role at an explicit instant (time-boundary tests).
    pub async fn effective_role_at(
        &self,
        identity: Option<&UserId>,
        now: DateTime<Utc>,
    ) -> CoreResult<Option<EffectiveRole>> {
        resolver::effective_role_at(self.storage.as_ref(), identity, now).await
    }

    // --- Mantle ledger ---

    /// Grant (or re-grant) the Protector's Mantle to a HEIR for
    /// `duration_hours`. Requires a genuine Protector. Re-granting replaces
    /// the previous Mantle and re-notifies the holder.
    pub async fn grant_mantle(
        &self,
        actor: &UserId,
        holder: &UserId,
        duration_hours: i64,
    ) -> CoreResult<Mantle> {
        self.grant_mantle_at(actor, holder, duration_hours, Utc::now())
            .await
    }

    pub async fn grant_mantle_at(
        &self,
        actor: &UserId,
        holder: &UserId,
        duration_hours: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<Mantle> {
        let (account, effective) = self.require_actor(actor).await?;
        if !authz::true_protector(account.role) {
            return Err(CoreError::Forbidden(
                "granting a Mantle requires a genuine Protector".to_string(),
            ));
        }
        if duration_hours <= 0 {
            return Err(CoreError::Validation(
                "duration must be greater than zero hours".to_string(),
            ));
        }
        let end_time = Duration::try_hours(duration_hours)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                CoreError::Validation("duration is too large".to_string())
            })?;

        let heir = self
            .storage
            .get_account(holder)
            .await?
            .filter(|a| a.role == Role::Heir)
            .ok_or_else(|| CoreError::NotFound("heir not found or not an HEIR".to_string()))?;

        let mantle = Mantle {
            holder: *holder,
            granted_by: *actor,
            start_time: now,
            end_time,
            is_active: true,
        };
        self.storage.upsert_mantle(mantle.clone()).await?;

        self.notify(vec![Notification::new(
            *holder,
            NotificationCategory::Mantle,
            "Protector's Mantle granted",
            serde_json::json!({
                "heir_id": holder.to_string(),
                "end_time": mantle.end_time,
                "action": "granted",
            }),
        )])
        .await;
        self.audit(
            Some(*actor),
            effective.audit_label(),
            format!("Granted Mantle to {} until {}", heir.username, mantle.end_time),
            Some(holder.to_string()),
            None,
        )
        .await;

        Ok(mantle)
    }

    /// Revoke a holder's Mantle. Requires a genuine Protector. Revoking an
    /// already-inactive Mantle still updates its timestamps.
    pub async fn revoke_mantle(&self, actor: &UserId, holder: &UserId) -> CoreResult<Mantle> {
        let (account, effective) = self.require_actor(actor).await?;
        if !authz::true_protector(account.role) {
            return Err(CoreError::Forbidden(
                "revoking a Mantle requires a genuine Protector".to_string(),
            ));
        }

        let heir = self
            .storage
            .get_account(holder)
            .await?
            .ok_or_else(|| CoreError::NotFound("heir not found".to_string()))?;

        let mantle = self
            .storage
            .revoke_mantle(holder, Utc::now())
            .await?
            .ok_or_else(|| CoreError::NotFound("mantle not found for this heir".to_string()))?;

        self.notify(vec![Notification::new(
            *holder,
            NotificationCategory::Mantle,
            "Protector's Mantle revoked",
            serde_json::json!({
                "heir_id": holder.to_string(),
                "action": "revoked",
            }),
        )])
        .await;
        self.audit(
            Some(*actor),
            effective.audit_label(),
            format!("Revoked Mantle of {}", heir.username),
            Some(holder.to_string()),
            None,
        )
        .await;

        Ok(mantle)
    }

    /// Whether the holder's Mantle is currently active (live check).
    pub async fn mantle_is_active(&self, holder: &UserId) -> CoreResult<bool> {
        self.mantle_is_active_at(holder, Utc::now()).await
    }

    pub async fn mantle_is_active_at(
        &self,
        holder: &UserId,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        Ok(self
            .storage
            .get_mantle(holder)
            .await?
            .map(|m| m.is_currently_active(now))
            .unwrap_or(false))
    }

    /// The caller's own Mantle status.
    pub async fn mantle_status(&self, holder: &UserId) -> CoreResult<MantleStatus> {
        let now = Utc::now();
        Ok(match self.storage.get_mantle(holder).await? {
            Some(m) if m.is_currently_active(now) => MantleStatus {
                is_active: true,
                end_time: Some(m.end_time),
            },
            _ => MantleStatus {
                is_active: false,
                end_time: None,
            },
        })
    }

    /// List active Mantles with usernames, ordered by end time. Requires a
    /// genuine Protector.
    pub async fn list_mantles(&self, actor: &UserId) -> CoreResult<Vec<MantleView>> {
        let (account, _) = self.require_actor(actor).await?;
        if !authz::true_protector(account.role) {
            return Err(CoreError::Forbidden(
                "listing Mantles requires a genuine Protector".to_string(),
            ));
        }

        let mantles = self.storage.list_active_mantles().await?;
        let mut views = Vec::with_capacity(mantles.len());
        for mantle in mantles {
            let holder = self.storage.get_account(&mantle.holder).await?;
            let grantor = self.storage.get_account(&mantle.granted_by).await?;
            views.push(MantleView {
                holder_id: mantle.holder,
                holder_username: holder.map(|a| a.username).unwrap_or_default(),
                granted_by_id: mantle.granted_by,
                granted_by_username: grantor.map(|a| a.username),
                end_time: mantle.end_time,
                is_active: mantle.is_active,
            });
        }
        Ok(views)
    }

    /// Mark time-expired Mantles inactive, returning the count affected.
    /// Bookkeeping only — `mantle_is_active` stays correct without it.
    pub async fn sweep_expired(&self) -> CoreResult<usize> {
        Ok(self.storage.sweep_expired_mantles(Utc::now()).await?)
    }

    // --- Site state gate ---

    pub async fn site_status(&self) -> CoreResult<SiteState> {
        Ok(self.storage.get_site_state().await?)
    }

    /// ONLINE → SHUTDOWN. Protector-or-above (acting counts). All open
    /// panic alerts are resolved in the same transition.
    pub async fn shutdown(&self, actor: &UserId) -> CoreResult<SiteState> {
        let (_, effective) = self.require_actor(actor).await?;
        if !authz::protector_or_above(effective) {
            return Err(CoreError::Forbidden(
                "shutdown requires Protector or above".to_string(),
            ));
        }
        let (state, resolved) = self.storage.shutdown_site(actor, Utc::now()).await?;
        self.audit(
            Some(*actor),
            effective.audit_label(),
            format!("Initiated site shutdown ({} open alerts resolved)", resolved),
            None,
            None,
        )
        .await;
        Ok(state)
    }

    /// SHUTDOWN → ONLINE. Strictly base role HQ; an acting Protector (or a
    /// genuine one) is rejected.
    pub async fn bring_online(&self, actor: &UserId) -> CoreResult<SiteState> {
        let (account, effective) = self.require_actor(actor).await?;
        if !authz::hq_base_role(account.role) {
            return Err(CoreError::Forbidden(
                "only HQ may bring the site back online".to_string(),
            ));
        }
        let state = self.storage.bring_site_online(Utc::now()).await?;
        self.audit(
            Some(*actor),
            effective.audit_label(),
            "Brought site back online".to_string(),
            None,
            None,
        )
        .await;
        Ok(state)
    }

    // --- Panic ledger ---

    /// Record a panic alert. Always succeeds for any authenticated user.
    /// Leadership (base role PROTECTOR or HQ) is notified; if the raiser's
    /// effective role is Protector-or-above the site shuts down immediately.
    pub async fn raise_panic(&self, actor: &UserId, message: &str) -> CoreResult<PanicOutcome> {
        let (_, effective) = self.require_actor(actor).await?;
        let now = Utc::now();

        let alert = PanicAlert::new(*actor, message);
        self.storage.insert_alert(alert.clone()).await?;

        let recipients = self
            .storage
            .list_accounts_with_roles(&[Role::Protector, Role::Hq])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to list panic recipients");
                Vec::new()
            });
        let notifications = recipients
            .into_iter()
            .map(|recipient| {
                Notification::new(
                    recipient.id,
                    NotificationCategory::Panic,
                    format!("{} initiated a panic alert", effective.audit_label()),
                    serde_json::json!({
                        "alert_id": alert.id.to_string(),
                        "message": message,
                    }),
                )
            })
            .collect();
        self.notify(notifications).await;

        let shutdown = authz::protector_or_above(effective);
        if shutdown {
            self.storage.shutdown_site(actor, now).await?;
        }

        self.audit(
            Some(*actor),
            effective.audit_label(),
            "Raised panic alert".to_string(),
            Some(alert.id.to_string()),
            Some(serde_json::json!({ "shutdown": shutdown })),
        )
        .await;

        Ok(PanicOutcome { alert, shutdown })
    }

    /// Resolve one alert. Protector-or-above. Already-resolved alerts are a
    /// successful no-op.
    pub async fn resolve_panic(
        &self,
        actor: &UserId,
        alert_id: &AlertId,
    ) -> CoreResult<ResolveOutcome> {
        let (_, effective) = self.require_actor(actor).await?;
        if !authz::protector_or_above(effective) {
            return Err(CoreError::Forbidden(
                "resolving alerts requires Protector or above".to_string(),
            ));
        }

        let already_resolved = self
            .storage
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{}", alert_id)))?
            .is_resolved();

        let alert = self
            .storage
            .resolve_alert(alert_id, actor, Utc::now())
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("{}", alert_id)))?;

        if !already_resolved {
            self.audit(
                Some(*actor),
                effective.audit_label(),
                "Resolved panic alert".to_string(),
                Some(alert_id.to_string()),
                None,
            )
            .await;
        }

        Ok(ResolveOutcome {
            alert,
            already_resolved,
        })
    }

    /// Unresolved alerts, newest first. Protector-or-above.
    pub async fn list_unresolved(&self, actor: &UserId) -> CoreResult<Vec<AlertView>> {
        let (_, effective) = self.require_actor(actor).await?;
        if !authz::protector_or_above(effective) {
            return Err(CoreError::Forbidden(
                "listing alerts requires Protector or above".to_string(),
            ));
        }

        let alerts = self.storage.list_unresolved_alerts().await?;
        let mut views = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let raiser = self.storage.get_account(&alert.raiser).await?;
            views.push(AlertView {
                id: alert.id,
                raiser_username: raiser.map(|a| a.username),
                message: alert.message,
                created_at: alert.created_at,
            });
        }
        Ok(views)
    }

    // --- Notifications & audit ---

    pub async fn notifications_for(&self, user: &UserId) -> CoreResult<Vec<Notification>> {
        Ok(self.storage.list_notifications_for(user).await?)
    }

    pub async fn mark_notification_read(
        &self,
        user: &UserId,
        id: &NotificationId,
    ) -> CoreResult<()> {
        if !self.storage.mark_notification_read(id, user).await? {
            return Err(CoreError::NotFound(format!("{}", id)));
        }
        Ok(())
    }

    /// The audit log, newest first. Requires a genuine Protector.
    pub async fn audit_log(&self, actor: &UserId) -> CoreResult<Vec<AuditRecord>> {
        let (account, _) = self.require_actor(actor).await?;
        if !authz::true_protector(account.role) {
            return Err(CoreError::Forbidden(
                "reading the audit log requires a genuine Protector".to_string(),
            ));
        }
        Ok(self.storage.list_audit().await?)
    }

    // --- Internals ---

    /// Load the actor's account and effective role, failing closed when the
    /// account is missing.
    async fn require_actor(&self, actor: &UserId) -> CoreResult<(UserAccount, EffectiveRole)> {
        let account = self
            .storage
            .get_account(actor)
            .await?
            .ok_or_else(|| CoreError::Forbidden("no provisioned role".to_string()))?;
        let effective = resolver::effective_role(self.storage.as_ref(), Some(actor))
            .await?
            .ok_or_else(|| CoreError::Forbidden("no provisioned role".to_string()))?;
        Ok((account, effective))
    }

    async fn notify(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        if let Err(e) = self.storage.insert_notifications(notifications).await {
            tracing::warn!(error = %e, "failed to persist notifications");
        }
    }

    async fn audit(
        &self,
        actor: Option<UserId>,
        role: String,
        action: String,
        target: Option<String>,
        details: Option<serde_json::Value>,
    ) {
        let record = AuditRecord {
            id: AuditRecordId::generate(),
            actor,
            role,
            action,
            target,
            details,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.storage.insert_audit(record).await {
            tracing::warn!(error = %e, "failed to persist audit record");
        }
    }
}
