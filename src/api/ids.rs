// Opaque global ids: base64 of "<Type>:<n>", relay style.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::schema::EntityKind;
use crate::types::EntityId;

/// Encode a numeric id as an opaque global id
pub fn encode(kind: EntityKind, id: EntityId) -> String {
    STANDARD.encode(format!("{}:{}", kind.type_name(), id))
}

/// Decode an id argument.
///
/// Accepts a JSON number, a numeric string, or an opaque global id. The kind is
/// only known for the opaque form. Returns None when the value is none of these.
pub fn decode(raw: &Value) -> Option<(Option<EntityKind>, EntityId)> {
    match raw {
        Value::Number(number) => number.as_i64().map(|id| (None, id)),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(id) = text.parse::<EntityId>() {
                return Some((None, id));
            }
            decode_global(text).map(|(kind, id)| (Some(kind), id))
        }
        _ => None,
    }
}

fn decode_global(text: &str) -> Option<(EntityKind, EntityId)> {
    let bytes = STANDARD.decode(text).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (type_name, id) = decoded.split_once(':')?;
    let kind = EntityKind::from_type_name(type_name)?;
    let id = id.parse::<EntityId>().ok()?;
    Some((kind, id))
}
