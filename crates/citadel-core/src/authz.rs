//! Named authorization predicates
//!
//! Each predicate is a boolean function of the role a request resolved to.
//! HQ passes every predicate except where a check is explicitly about the
//! persisted base role (`true_protector`, `hq_base_role`) — those ignore
//! Mantle elevation so an acting Protector cannot manage delegation itself
//! or bring the site back online.

use citadel_types::{EffectiveRole, Role};

/// PROTECTOR or HQ; an acting Protector (Mantle-elevated HEIR) counts.
pub fn protector_or_above(effective: EffectiveRole) -> bool {
    effective.role >= Role::Protector
}

/// HEIR, PROTECTOR, or HQ.
pub fn heir_or_above(effective: EffectiveRole) -> bool {
    effective.role >= Role::Heir
}

/// Any resolved role.
pub fn observer_or_above(effective: EffectiveRole) -> bool {
    effective.role >= Role::Observer
}

/// Base role PROTECTOR or HQ, ignoring Mantle elevation. Gates the
/// delegation machinery itself (grant, revoke, mantle/audit listings).
pub fn true_protector(base: Role) -> bool {
    matches!(base, Role::Protector | Role::Hq)
}

/// Base role HQ exactly. Gates the SHUTDOWN → ONLINE transition.
pub fn hq_base_role(base: Role) -> bool {
    base == Role::Hq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hq_passes_every_inclusive_tier() {
        let hq = EffectiveRole::base(Role::Hq);
        assert!(protector_or_above(hq));
        assert!(heir_or_above(hq));
        assert!(observer_or_above(hq));
        assert!(true_protector(Role::Hq));
        assert!(hq_base_role(Role::Hq));
    }

    #[test]
    fn plain_heir_is_not_protector_or_above() {
        let heir = EffectiveRole::base(Role::Heir);
        assert!(!protector_or_above(heir));
        assert!(heir_or_above(heir));
        assert!(observer_or_above(heir));
    }

    #[test]
    fn acting_protector_passes_operational_checks_only() {
        let acting = EffectiveRole::acting_protector();
        assert!(protector_or_above(acting));
        // the underlying base role is still HEIR for delegation management
        assert!(!true_protector(Role::Heir));
        assert!(!hq_base_role(Role::Heir));
    }

    #[test]
    fn true_protector_ignores_elevation_but_admits_base_protector() {
        assert!(true_protector(Role::Protector));
        assert!(!true_protector(Role::Observer));
    }

    #[test]
    fn bring_online_tier_rejects_base_protector() {
        assert!(!hq_base_role(Role::Protector));
    }
}
