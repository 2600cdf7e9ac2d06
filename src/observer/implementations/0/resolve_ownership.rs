// Ring 0: Resolve Ownership - gather what the authorization predicate decides on
use async_trait::async_trait;
use serde_json::Value;

use crate::authz::chain::owner_of;
use crate::authz::{AccessRequest, Roles};
use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ResolveObserver};
use crate::schema::{EntityKind, EntitySchema, OwnerPath};
use crate::types::{Operation, RowData};

const ROLE_FLAGS: [&str; 2] = ["is_superuser", "is_staff"];

/// Walks the ownership chain of the stored record and, when the mutation
/// creates a record or moves it to another parent, of the new state as well.
/// Stores the resulting `AccessRequest` for the authorize ring.
#[derive(Default)]
pub struct ResolveOwnership;

impl Observer for ResolveOwnership {
    fn name(&self) -> &'static str {
        "ResolveOwnership"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Resolve
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        40
    }
}

#[async_trait]
impl ResolveObserver for ResolveOwnership {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let (kind, operation) = (ctx.kind, ctx.operation);
        let original = ctx.record.original().cloned();
        let preview = ctx.preview();
        let check_new_state =
            operation == Operation::Create || (operation == Operation::Update && reassigns_owner(ctx.schema, &ctx.input));

        let tx = ctx.tx_mut()?;
        let mut owners = Vec::new();
        if let Some(stored) = &original {
            owners.push(owner_of(tx, kind, stored).await?);
        }
        if check_new_state {
            owners.push(owner_of(tx, kind, &preview).await?);
        }

        let request = AccessRequest {
            operation,
            kind,
            owners,
            target_roles: original.as_ref().filter(|_| kind == EntityKind::Account).map(roles_of),
            changes_roles: kind == EntityKind::Account && changes_roles(original.as_ref(), &ctx.input),
        };

        tracing::debug!("Access request: {:?}", request);
        ctx.set_metadata(request);
        Ok(())
    }
}

/// The update touches a field on the entity's ownership path
fn reassigns_owner(schema: &EntitySchema, input: &RowData) -> bool {
    match schema.owner {
        OwnerPath::Itself => false,
        OwnerPath::Field(field) => input.contains_key(field),
        OwnerPath::Parent(fields) => fields.iter().any(|field| input.contains_key(*field)),
    }
}

fn flag(row: &RowData, name: &str) -> bool {
    row.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn roles_of(row: &RowData) -> Roles {
    Roles {
        is_superuser: flag(row, "is_superuser"),
        is_staff: flag(row, "is_staff"),
    }
}

/// Setting a role flag on create, or changing one on update
fn changes_roles(original: Option<&RowData>, input: &RowData) -> bool {
    ROLE_FLAGS.iter().any(|name| {
        let Some(requested) = input.get(*name).and_then(Value::as_bool) else {
            return false;
        };
        match original {
            Some(stored) => requested != flag(stored, name),
            None => requested,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RowData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn detects_role_changes() {
        let stored = row(json!({ "is_superuser": false, "is_staff": true }));
        assert!(!changes_roles(Some(&stored), &row(json!({ "is_staff": true }))));
        assert!(changes_roles(Some(&stored), &row(json!({ "is_staff": false }))));
        assert!(changes_roles(Some(&stored), &row(json!({ "is_superuser": true }))));
        assert!(!changes_roles(None, &row(json!({ "is_staff": false }))));
        assert!(changes_roles(None, &row(json!({ "is_staff": true }))));
    }

    #[test]
    fn detects_reparenting() {
        let task = EntityKind::Task.schema();
        assert!(reassigns_owner(task, &row(json!({ "project_id": 2 }))));
        assert!(!reassigns_owner(task, &row(json!({ "activity_id": 2 }))));

        let cleiton = EntityKind::Cleiton.schema();
        assert!(reassigns_owner(cleiton, &row(json!({ "user_id": 2 }))));
        assert!(!reassigns_owner(EntityKind::Account.schema(), &row(json!({ "username": "x" }))));
    }
}
