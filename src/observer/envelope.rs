// Mutation requests and the uniform result envelope.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::observer::error::MutationError;
use crate::schema::EntityKind;
use crate::types::{Operation, RowData};

/// A named mutation with its argument bag
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub operation: Operation,
    pub kind: EntityKind,
    pub arguments: RowData,
}

impl MutationRequest {
    pub fn new(operation: Operation, kind: EntityKind, arguments: RowData) -> Self {
        Self { operation, kind, arguments }
    }

    /// Build a request from a mutation name such as `createProject`
    pub fn from_name(name: &str, arguments: RowData) -> Option<Self> {
        let (operation, kind) = Self::parse_name(name)?;
        Some(Self::new(operation, kind, arguments))
    }

    /// Split `create<Type>` / `update<Type>` / `delete<Type>`
    pub fn parse_name(name: &str) -> Option<(Operation, EntityKind)> {
        [Operation::Create, Operation::Update, Operation::Delete]
            .into_iter()
            .find_map(|operation| {
                let type_name = name.strip_prefix(operation.verb())?;
                EntityKind::from_type_name(type_name).map(|kind| (operation, kind))
            })
    }

    pub fn name(&self) -> String {
        format!("{}{}", self.operation.verb(), self.kind.type_name())
    }
}

/// `{ <entity_field>: object|null, success, errors }`; delete omits the entity field
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEnvelope {
    pub kind: EntityKind,
    pub operation: Operation,
    pub entity: Option<Value>,
    pub success: bool,
    pub errors: Option<String>,
}

impl MutationEnvelope {
    pub fn success(kind: EntityKind, operation: Operation, entity: Option<Value>) -> Self {
        Self { kind, operation, entity, success: true, errors: None }
    }

    pub fn failure(kind: EntityKind, operation: Operation, error: &MutationError) -> Self {
        Self {
            kind,
            operation,
            entity: None,
            success: false,
            errors: Some(error.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for MutationEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.operation != Operation::Delete {
            map.serialize_entry(self.kind.field_name(), &self.entity)?;
        }
        map.serialize_entry("success", &self.success)?;
        map.serialize_entry("errors", &self.errors)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mutation_names() {
        assert_eq!(
            MutationRequest::parse_name("createProject"),
            Some((Operation::Create, EntityKind::Project))
        );
        assert_eq!(
            MutationRequest::parse_name("deleteCleiton"),
            Some((Operation::Delete, EntityKind::Cleiton))
        );
        assert_eq!(MutationRequest::parse_name("selectProject"), None);
        assert_eq!(MutationRequest::parse_name("createproject"), None);
        assert_eq!(MutationRequest::parse_name("update"), None);
    }

    #[test]
    fn names_round_trip() {
        let request = MutationRequest::from_name("updateNotification", RowData::new()).unwrap();
        assert_eq!(request.name(), "updateNotification");
    }

    #[test]
    fn envelope_shapes() {
        let created = MutationEnvelope::success(EntityKind::Cleiton, Operation::Create, Some(json!({ "name": "Acme" })));
        assert_eq!(
            created.to_json(),
            json!({ "cleiton": { "name": "Acme" }, "success": true, "errors": null })
        );

        let denied = MutationEnvelope::failure(EntityKind::Cleiton, Operation::Update, &MutationError::PermissionDenied);
        assert_eq!(
            denied.to_json(),
            json!({ "cleiton": null, "success": false, "errors": "Permission denied." })
        );

        let deleted = MutationEnvelope::success(EntityKind::Task, Operation::Delete, None);
        assert_eq!(deleted.to_json(), json!({ "success": true, "errors": null }));
    }
}
