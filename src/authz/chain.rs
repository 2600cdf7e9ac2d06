// Ownership chain walking: leaf -> Project -> Cleiton -> Account.
//
// All lookups go through the mutation's transaction so they see the same
// snapshot the write will be applied to.

use serde_json::Value;

use crate::database::{DatabaseError, StoreTransaction};
use crate::schema::{EntityKind, OwnerPath};
use crate::types::{EntityId, RowData};

/// First non-null parent reference on an ownership path
pub fn first_parent(kind: EntityKind, fields: &[&str], row: &RowData) -> Option<(EntityKind, EntityId)> {
    let schema = kind.schema();
    fields.iter().find_map(|name| {
        let target = schema.field(name)?.reference_target()?;
        let id = row.get(*name).and_then(Value::as_i64)?;
        Some((target, id))
    })
}

/// Account owning `row`, following the entity's ownership path upwards.
///
/// Returns None when the chain ends without an owner or a link is missing.
pub async fn owner_of(
    tx: &mut dyn StoreTransaction,
    kind: EntityKind,
    row: &RowData,
) -> Result<Option<EntityId>, DatabaseError> {
    let mut kind = kind;
    let mut row = row.clone();

    loop {
        match kind.schema().owner {
            OwnerPath::Itself => return Ok(row.get("id").and_then(Value::as_i64)),
            OwnerPath::Field(field) => return Ok(row.get(field).and_then(Value::as_i64)),
            OwnerPath::Parent(fields) => {
                let Some((parent_kind, parent_id)) = first_parent(kind, fields, &row) else {
                    return Ok(None);
                };
                match tx.fetch(parent_kind, parent_id).await? {
                    Some(parent) => {
                        kind = parent_kind;
                        row = parent;
                    }
                    None => return Ok(None),
                }
            }
        }
    }
}

/// Client (Cleiton) a stored entity descends from
pub async fn client_of(
    tx: &mut dyn StoreTransaction,
    kind: EntityKind,
    id: EntityId,
) -> Result<Option<EntityId>, DatabaseError> {
    let mut kind = kind;
    let mut id = id;

    loop {
        if kind == EntityKind::Cleiton {
            return Ok(Some(id));
        }
        let Some(row) = tx.fetch(kind, id).await? else {
            return Ok(None);
        };
        let OwnerPath::Parent(fields) = kind.schema().owner else {
            return Ok(None);
        };
        let Some((parent_kind, parent_id)) = first_parent(kind, fields, &row) else {
            return Ok(None);
        };
        kind = parent_kind;
        id = parent_id;
    }
}
