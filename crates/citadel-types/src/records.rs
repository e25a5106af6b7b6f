//! Persistent records operated on by the authority engine

use crate::ids::{AlertId, AuditRecordId, NotificationId, UserId};
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account with its persistent base role.
///
/// Accounts are never deleted; audit history references them forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub username: String,
    /// Public-facing name shown to other users; keeps username private
    pub display_name: String,
    pub role: Role,
    /// PHC-formatted argon2 hash; never serialized to API responses
    #[serde(skip_serializing)]
    #[serde(default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        let username = username.into();
        let display_name = display_name.into();
        Self {
            id: UserId::generate(),
            display_name: if display_name.is_empty() {
                username.clone()
            } else {
                display_name
            },
            username,
            role: Role::Observer,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Temporary delegation of Protector authority to a Heir.
///
/// At most one Mantle exists per holder; granting again replaces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mantle {
    pub holder: UserId,
    pub granted_by: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Explicit flag, independent of time, so a Mantle can be revoked early
    pub is_active: bool,
}

impl Mantle {
    /// The single source of truth for Mantle activity. A stale
    /// `is_active = true` past `end_time` never counts as active.
    pub fn is_currently_active(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_time > now
    }
}

/// Global site availability record. One row, lazily created ONLINE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteState {
    pub is_shutdown: bool,
    pub updated_at: DateTime<Utc>,
}

impl SiteState {
    pub fn online() -> Self {
        Self {
            is_shutdown: false,
            updated_at: Utc::now(),
        }
    }
}

/// Append-only record of a panic raised by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanicAlert {
    pub id: AlertId,
    pub raiser: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolver: Option<UserId>,
}

impl PanicAlert {
    pub fn new(raiser: UserId, message: impl Into<String>) -> Self {
        Self {
            id: AlertId::generate(),
            raiser,
            message: message.into(),
            created_at: Utc::now(),
            resolved_at: None,
            resolver: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }
}

/// Category of a persisted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationCategory {
    Mantle,
    Panic,
}

/// A notification persisted for a single recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    pub category: NotificationCategory,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl Notification {
    pub fn new(
        recipient: UserId,
        category: NotificationCategory,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            recipient,
            category,
            message: message.into(),
            metadata,
            created_at: Utc::now(),
            read: false,
        }
    }
}

/// Append-only audit entry for a state-changing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub actor: Option<UserId>,
    /// Effective-role label at the time of the action, e.g.
    /// "PROTECTOR (acting Heir)"
    pub role: String,
    pub action: String,
    pub target: Option<String>,
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn mantle_activity_is_live_not_flag_trusting() {
        let now = Utc::now();
        let mantle = Mantle {
            holder: UserId::generate(),
            granted_by: UserId::generate(),
            start_time: now,
            end_time: now + Duration::hours(1),
            is_active: true,
        };

        assert!(mantle.is_currently_active(now));
        assert!(mantle.is_currently_active(now + Duration::minutes(59)));
        // exactly at end_time: no longer active
        assert!(!mantle.is_currently_active(now + Duration::hours(1)));
        // stale flag past expiry never counts
        assert!(!mantle.is_currently_active(now + Duration::hours(2)));
    }

    #[test]
    fn revoked_mantle_is_inactive_regardless_of_time() {
        let now = Utc::now();
        let mantle = Mantle {
            holder: UserId::generate(),
            granted_by: UserId::generate(),
            start_time: now,
            end_time: now + Duration::hours(1),
            is_active: false,
        };
        assert!(!mantle.is_currently_active(now));
    }

    #[test]
    fn display_name_defaults_to_username() {
        let account = UserAccount::new("kestrel", "");
        assert_eq!(account.display_name, "kestrel");
        assert_eq!(account.role, Role::Observer);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let mut account = UserAccount::new("kestrel", "Kestrel");
        account.password_hash = "$argon2id$secret".to_string();
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }
}
