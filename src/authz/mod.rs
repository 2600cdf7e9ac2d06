// Authorization: who is acting, and whether they may perform an operation.
//
// `authorize` is pure. Everything it needs (owning accounts, role flags of a
// target account) is gathered beforehand by the pipeline's resolve ring, so a
// denial can never leave partial state behind.

pub mod chain;

use serde::{Deserialize, Serialize};

use crate::schema::EntityKind;
use crate::types::{EntityId, Operation};

/// Authenticated actor issuing a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: EntityId,
    pub username: String,
    pub is_superuser: bool,
    pub is_staff: bool,
}

/// Per-request authentication context, resolved by the auth middleware
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl AuthContext {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthContext::Anonymous => None,
            AuthContext::Authenticated(principal) => Some(principal),
        }
    }
}

/// Role flags of an Account that is the target of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roles {
    pub is_superuser: bool,
    pub is_staff: bool,
}

/// Facts about one mutation that the predicate decides on
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRequest {
    pub operation: Operation,
    pub kind: EntityKind,
    /// Owning account at the root of every ownership chain involved: the stored
    /// record's, plus the new one when a create or update (re)assigns a parent.
    /// `None` marks a chain that ends without an owner.
    pub owners: Vec<Option<EntityId>>,
    /// Set when the target is an existing Account
    pub target_roles: Option<Roles>,
    /// The mutation sets or changes `is_staff` / `is_superuser`
    pub changes_roles: bool,
}

/// Which tier granted access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Superuser,
    Staff,
    Owner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(Tier),
    Denied,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

/// The authorization predicate. First matching tier wins.
pub fn authorize(principal: &Principal, request: &AccessRequest) -> Decision {
    if principal.is_superuser {
        return Decision::Allowed(Tier::Superuser);
    }

    // Role flags are a superuser prerogative, including one's own
    if request.changes_roles {
        return Decision::Denied;
    }

    if principal.is_staff {
        return if staff_restricted(principal, request) {
            Decision::Denied
        } else {
            Decision::Allowed(Tier::Staff)
        };
    }

    // Accounts are provisioned by staff or the identity provider
    if request.kind == EntityKind::Account && request.operation == Operation::Create {
        return Decision::Denied;
    }

    if is_owner(principal, request) {
        Decision::Allowed(Tier::Owner)
    } else {
        Decision::Denied
    }
}

fn staff_restricted(principal: &Principal, request: &AccessRequest) -> bool {
    let Some(target) = request.target_roles else {
        return false;
    };
    if target.is_superuser {
        return true;
    }
    let is_self = request.owners.iter().all(|owner| *owner == Some(principal.id));
    request.operation == Operation::Delete && target.is_staff && !is_self
}

fn is_owner(principal: &Principal, request: &AccessRequest) -> bool {
    !request.owners.is_empty() && request.owners.iter().all(|owner| *owner == Some(principal.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(id: EntityId, is_superuser: bool, is_staff: bool) -> Principal {
        Principal { id, username: format!("user{}", id), is_superuser, is_staff }
    }

    fn request(kind: EntityKind, operation: Operation, owners: Vec<Option<EntityId>>) -> AccessRequest {
        AccessRequest { operation, kind, owners, target_roles: None, changes_roles: false }
    }

    #[test]
    fn superuser_is_always_allowed() {
        let admin = principal(1, true, false);
        let mut req = request(EntityKind::Account, Operation::Delete, vec![Some(2)]);
        req.target_roles = Some(Roles { is_superuser: true, is_staff: true });
        req.changes_roles = true;
        assert_eq!(authorize(&admin, &req), Decision::Allowed(Tier::Superuser));
    }

    #[test]
    fn owner_may_touch_own_tree_only() {
        let bob = principal(2, false, false);
        let own = request(EntityKind::Task, Operation::Update, vec![Some(2)]);
        let other = request(EntityKind::Task, Operation::Update, vec![Some(3)]);
        let unowned = request(EntityKind::Project, Operation::Update, vec![None]);
        assert_eq!(authorize(&bob, &own), Decision::Allowed(Tier::Owner));
        assert_eq!(authorize(&bob, &other), Decision::Denied);
        assert_eq!(authorize(&bob, &unowned), Decision::Denied);
    }

    #[test]
    fn moving_a_record_requires_owning_both_sides() {
        let bob = principal(2, false, false);
        let req = request(EntityKind::Project, Operation::Update, vec![Some(2), Some(3)]);
        assert_eq!(authorize(&bob, &req), Decision::Denied);
    }

    #[test]
    fn plain_users_cannot_create_accounts_or_change_roles() {
        let bob = principal(2, false, false);
        let create = request(EntityKind::Account, Operation::Create, vec![]);
        assert_eq!(authorize(&bob, &create), Decision::Denied);

        let mut escalate = request(EntityKind::Account, Operation::Update, vec![Some(2)]);
        escalate.target_roles = Some(Roles::default());
        assert!(authorize(&bob, &escalate).is_allowed());
        escalate.changes_roles = true;
        assert_eq!(authorize(&bob, &escalate), Decision::Denied);
    }

    #[test]
    fn staff_restrictions() {
        let staff = principal(5, false, true);

        let mut delete_staff = request(EntityKind::Account, Operation::Delete, vec![Some(6)]);
        delete_staff.target_roles = Some(Roles { is_superuser: false, is_staff: true });
        assert_eq!(authorize(&staff, &delete_staff), Decision::Denied);

        let mut update_staff = delete_staff.clone();
        update_staff.operation = Operation::Update;
        assert_eq!(authorize(&staff, &update_staff), Decision::Allowed(Tier::Staff));

        let mut update_root = request(EntityKind::Account, Operation::Update, vec![Some(1)]);
        update_root.target_roles = Some(Roles { is_superuser: true, is_staff: false });
        assert_eq!(authorize(&staff, &update_root), Decision::Denied);

        let mut promote = request(EntityKind::Account, Operation::Update, vec![Some(5)]);
        promote.target_roles = Some(Roles { is_superuser: false, is_staff: true });
        promote.changes_roles = true;
        assert_eq!(authorize(&staff, &promote), Decision::Denied);

        let foreign_project = request(EntityKind::Project, Operation::Delete, vec![Some(9)]);
        assert_eq!(authorize(&staff, &foreign_project), Decision::Allowed(Tier::Staff));

        let create_account = request(EntityKind::Account, Operation::Create, vec![]);
        assert_eq!(authorize(&staff, &create_account), Decision::Allowed(Tier::Staff));
    }

    #[test]
    fn staff_may_delete_their_own_account() {
        let staff = principal(5, false, true);
        let mut req = request(EntityKind::Account, Operation::Delete, vec![Some(5)]);
        req.target_roles = Some(Roles { is_superuser: false, is_staff: true });
        assert!(authorize(&staff, &req).is_allowed());
    }
}
