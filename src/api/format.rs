use serde_json::{Map, Value};

use crate::api::ids;
use crate::schema::{EntityKind, FieldKind};
use crate::types::RowData;

/// Options that control how stored rows are rendered on the wire
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Encode `id` and every reference as an opaque global id
    pub opaque_ids: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { opaque_ids: true }
    }
}

impl FormatOptions {
    pub fn from_config() -> Self {
        Self {
            opaque_ids: crate::config::config().api.opaque_ids,
        }
    }
}

/// Convert a stored row into the public wire format.
///
/// Secret fields are dropped. Columns the schema does not declare are dropped too,
/// so storage-only columns never leak.
pub fn entity_to_api_value(kind: EntityKind, row: &RowData, options: FormatOptions) -> Value {
    let schema = kind.schema();
    let mut obj = Map::new();

    if let Some(id) = row.get("id") {
        obj.insert("id".into(), render_id(kind, id, options));
    }

    for field in &schema.fields {
        let value = row.get(field.name).cloned().unwrap_or(Value::Null);
        match field.kind {
            FieldKind::Secret => continue,
            FieldKind::Reference(target) => {
                obj.insert(field.name.into(), render_id(target, &value, options));
            }
            _ => {
                obj.insert(field.name.into(), value);
            }
        }
    }

    Value::Object(obj)
}

/// Render a list of rows
pub fn entities_to_api_value(kind: EntityKind, rows: &[RowData], options: FormatOptions) -> Value {
    Value::Array(
        rows.iter()
            .map(|row| entity_to_api_value(kind, row, options))
            .collect(),
    )
}

fn render_id(kind: EntityKind, value: &Value, options: FormatOptions) -> Value {
    match value.as_i64() {
        Some(id) if options.opaque_ids => Value::String(ids::encode(kind, id)),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RowData {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn strips_secrets_and_encodes_ids() {
        let account = row(json!({
            "id": 3,
            "username": "bob",
            "email": "bob@example.com",
            "password": "$argon2id$...",
            "is_staff": false,
        }));
        let value = entity_to_api_value(EntityKind::Account, &account, FormatOptions::default());

        assert!(value.get("password").is_none());
        assert_eq!(value["id"], json!(ids::encode(EntityKind::Account, 3)));
        assert_eq!(value["username"], json!("bob"));
        assert_eq!(value["cpf"], Value::Null);
    }

    #[test]
    fn references_use_target_type() {
        let project = row(json!({ "id": 5, "name": "Site", "cleiton_id": 2 }));
        let value = entity_to_api_value(EntityKind::Project, &project, FormatOptions::default());
        assert_eq!(value["cleiton_id"], json!(ids::encode(EntityKind::Cleiton, 2)));
    }

    #[test]
    fn plain_ids_when_disabled() {
        let project = row(json!({ "id": 5, "cleiton_id": 2 }));
        let value = entity_to_api_value(EntityKind::Project, &project, FormatOptions { opaque_ids: false });
        assert_eq!(value["id"], json!(5));
        assert_eq!(value["cleiton_id"], json!(2));
    }
}
