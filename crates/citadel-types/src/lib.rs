//! Citadel domain types
//!
//! Strongly-typed identifiers, the closed role enumeration, and the
//! persistent records the authority engine operates on.

pub mod ids;
pub mod records;
pub mod role;

pub use ids::{AlertId, AuditRecordId, NotificationId, UserId};
pub use records::{
    AuditRecord, Mantle, Notification, NotificationCategory, PanicAlert, SiteState, UserAccount,
};
pub use role::{EffectiveRole, Role, RoleParseError};
