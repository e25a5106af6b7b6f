//! Role enumeration and effective-role representation
//!
//! Roles form a closed, ordered set: OBSERVER < HEIR < PROTECTOR < HQ.
//! The deprecated `OVERLOOKER` name is accepted wherever roles are read
//! (deserialization, `from_str_lenient`) and normalized to `OBSERVER`;
//! write paths go through [`Role::from_canonical`], which rejects it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Persistent base role of a user account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Read-only membership tier
    #[default]
    #[serde(alias = "OVERLOOKER")]
    Observer,
    /// Successor tier; may hold a Mantle
    Heir,
    /// Operational leadership tier
    Protector,
    /// Headquarters; superuser for this domain
    #[serde(rename = "HQ")]
    Hq,
}

/// Error returned when a role name cannot be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl Role {
    /// Parse a canonical role name. Rejects the deprecated `OVERLOOKER`
    /// alias; use this on every write path.
    pub fn from_canonical(s: &str) -> Result<Self, RoleParseError> {
        match s {
            "PROTECTOR" => Ok(Role::Protector),
            "HEIR" => Ok(Role::Heir),
            "OBSERVER" => Ok(Role::Observer),
            "HQ" => Ok(Role::Hq),
            other => Err(RoleParseError(other.to_string())),
        }
    }

    /// Parse a role name, accepting the deprecated alias. Read paths only.
    pub fn from_str_lenient(s: &str) -> Result<Self, RoleParseError> {
        match s {
            "OVERLOOKER" => Ok(Role::Observer),
            other => Self::from_canonical(other),
        }
    }

    /// Canonical name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Protector => "PROTECTOR",
            Role::Heir => "HEIR",
            Role::Observer => "OBSERVER",
            Role::Hq => "HQ",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role used for authorization decisions after Mantle elevation.
///
/// `acting` is true only for a HEIR elevated to PROTECTOR by a currently
/// active Mantle. It never changes the outcome of a permission check; it
/// only alters how the role is rendered in audit messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRole {
    pub role: Role,
    pub acting: bool,
}

impl EffectiveRole {
    /// An effective role equal to the base role.
    pub fn base(role: Role) -> Self {
        Self {
            role,
            acting: false,
        }
    }

    /// PROTECTOR authority held via an active Mantle.
    pub fn acting_protector() -> Self {
        Self {
            role: Role::Protector,
            acting: true,
        }
    }

    /// Role string for audit records, marking Mantle elevation.
    pub fn audit_label(&self) -> String {
        if self.acting {
            "PROTECTOR (acting Heir)".to_string()
        } else {
            self.role.as_str().to_string()
        }
    }
}

impl fmt::Display for EffectiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.audit_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ordering() {
        assert!(Role::Hq > Role::Protector);
        assert!(Role::Protector > Role::Heir);
        assert!(Role::Heir > Role::Observer);
    }

    #[test]
    fn canonical_parse_rejects_legacy_alias() {
        assert_eq!(Role::from_canonical("OBSERVER"), Ok(Role::Observer));
        assert!(Role::from_canonical("OVERLOOKER").is_err());
    }

    #[test]
    fn lenient_parse_normalizes_legacy_alias() {
        assert_eq!(Role::from_str_lenient("OVERLOOKER"), Ok(Role::Observer));
        assert_eq!(Role::from_str_lenient("HQ"), Ok(Role::Hq));
        assert!(Role::from_str_lenient("WARDEN").is_err());
    }

    #[test]
    fn serde_accepts_alias_on_deserialize_only() {
        let role: Role = serde_json::from_str("\"OVERLOOKER\"").unwrap();
        assert_eq!(role, Role::Observer);
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"OBSERVER\"");
    }

    #[test]
    fn acting_protector_compares_equal_to_protector_in_checks() {
        let acting = EffectiveRole::acting_protector();
        assert_eq!(acting.role, Role::Protector);
        assert_eq!(acting.audit_label(), "PROTECTOR (acting Heir)");
        assert_eq!(
            EffectiveRole::base(Role::Protector).audit_label(),
            "PROTECTOR"
        );
    }
}
