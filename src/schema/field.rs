use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::api::ids;
use crate::schema::EntityKind;

/// Storage/value type of a field
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text
    Text,
    /// Email address
    Email,
    /// Text that must match a pattern
    Pattern {
        regex: &'static Lazy<Regex>,
        message: &'static str,
    },
    /// One of an enumerated set of values
    Choice(&'static [&'static str]),
    /// Calendar date, canonical form YYYY-MM-DD
    Date,
    /// Instant, canonical form RFC 3339 in UTC
    DateTime,
    Bool,
    /// Foreign key to another entity
    Reference(EntityKind),
    /// Credential; hashed before storage and never serialised
    Secret,
}

/// Value a field receives when the caller does not supply one on create
#[derive(Debug, Clone)]
pub enum FieldDefault {
    None,
    Value(Value),
    /// Current instant
    Now,
    /// Current date
    Today,
    /// Id of the acting principal
    Principal,
    /// Copied from the record referenced by `via`
    Derived {
        via: &'static str,
        field: &'static str,
    },
}

/// Reasons an argument value cannot be turned into a field value
#[derive(Debug, Clone, PartialEq)]
pub enum CoerceError {
    /// Wrong shape or unparseable; carries a user-facing message
    Invalid(String),
    /// A well-formed id that names a different entity type, so it can never resolve
    Unresolvable(EntityKind),
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Declaration of a single field
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    /// False for server-assigned fields; callers may not supply them
    pub writable: bool,
    pub unique: bool,
    pub lowercase: bool,
    /// Timestamps that must not lie in the past when set or changed
    pub not_past: bool,
    pub max_len: Option<usize>,
    pub min_len: Option<usize>,
    pub default: FieldDefault,
}

impl FieldDef {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            writable: true,
            unique: false,
            lowercase: false,
            not_past: false,
            max_len: None,
            min_len: None,
            default: FieldDefault::None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email).max_len(254)
    }

    pub fn pattern(name: &'static str, regex: &'static Lazy<Regex>, message: &'static str) -> Self {
        Self::new(name, FieldKind::Pattern { regex, message })
    }

    pub fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Choice(choices))
    }

    pub fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn datetime(name: &'static str) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool).default_value(Value::Bool(false))
    }

    pub fn reference(name: &'static str, target: EntityKind) -> Self {
        Self::new(name, FieldKind::Reference(target))
    }

    pub fn secret(name: &'static str) -> Self {
        Self::new(name, FieldKind::Secret)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    pub fn not_past(mut self) -> Self {
        self.not_past = true;
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        self.max_len = Some(len);
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        self.min_len = Some(len);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = FieldDefault::Value(value);
        self
    }

    pub fn default_to(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    /// Server-assigned: filled from `default`, never accepted from callers
    pub fn server(mut self, default: FieldDefault) -> Self {
        self.writable = false;
        self.default = default;
        self
    }

    pub fn reference_target(&self) -> Option<EntityKind> {
        match self.kind {
            FieldKind::Reference(target) => Some(target),
            _ => None,
        }
    }

    /// Typed setter: turn a raw argument value into the canonical stored value.
    ///
    /// Null passes through untouched; presence rules are the validation layer's job.
    pub fn coerce(&self, raw: &Value) -> Result<Value, CoerceError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }

        match self.kind {
            FieldKind::Text | FieldKind::Email | FieldKind::Pattern { .. } | FieldKind::Choice(_) | FieldKind::Secret => {
                let text = raw
                    .as_str()
                    .ok_or_else(|| CoerceError::Invalid(format!("{}: Expected a string.", self.name)))?;
                let text = if matches!(self.kind, FieldKind::Secret) { text } else { text.trim() };
                if self.lowercase {
                    Ok(Value::String(text.to_lowercase()))
                } else {
                    Ok(Value::String(text.to_string()))
                }
            }
            FieldKind::Date => {
                let text = raw.as_str().unwrap_or_default();
                NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                    .map_err(|_| CoerceError::Invalid(format!("{}: Enter a valid date (YYYY-MM-DD).", self.name)))
            }
            FieldKind::DateTime => {
                let text = raw.as_str().unwrap_or_default();
                parse_datetime(text)
                    .map(|instant| Value::String(format_datetime(&instant)))
                    .ok_or_else(|| CoerceError::Invalid(format!("{}: Enter a valid date/time (RFC 3339).", self.name)))
            }
            FieldKind::Bool => match raw {
                Value::Bool(flag) => Ok(Value::Bool(*flag)),
                Value::String(text) => match text.to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Ok(Value::Bool(true)),
                    "false" | "0" | "no" => Ok(Value::Bool(false)),
                    _ => Err(CoerceError::Invalid(format!("{}: Expected a boolean.", self.name))),
                },
                _ => Err(CoerceError::Invalid(format!("{}: Expected a boolean.", self.name))),
            },
            FieldKind::Reference(target) => match ids::decode(raw) {
                Some((Some(kind), _)) if kind != target => Err(CoerceError::Unresolvable(target)),
                Some((_, id)) => Ok(Value::from(id)),
                None => Err(CoerceError::Invalid(format!("{}: Invalid {} id.", self.name, target))),
            },
        }
    }
}

/// Email format check shared with the validation layer
pub fn is_valid_email(text: &str) -> bool {
    EMAIL_RE.is_match(text)
}

/// Parse an RFC 3339 instant; also accepts the `+00` offset form Postgres emits
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%#z"))
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

pub fn format_datetime(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dates_are_canonicalised() {
        let field = FieldDef::date("start_date");
        assert_eq!(field.coerce(&json!("2025-03-01")).unwrap(), json!("2025-03-01"));
        assert!(matches!(field.coerce(&json!("01/03/2025")), Err(CoerceError::Invalid(_))));
    }

    #[test]
    fn datetimes_normalise_to_utc() {
        let field = FieldDef::datetime("due_date");
        let value = field.coerce(&json!("2025-03-01T12:00:00-03:00")).unwrap();
        assert_eq!(value, json!("2025-03-01T15:00:00+00:00"));
    }

    #[test]
    fn booleans_accept_strings() {
        let field = FieldDef::boolean("completed");
        assert_eq!(field.coerce(&json!("true")).unwrap(), json!(true));
        assert_eq!(field.coerce(&json!(false)).unwrap(), json!(false));
        assert!(field.coerce(&json!("maybe")).is_err());
    }

    #[test]
    fn lowercase_fields_are_folded() {
        let field = FieldDef::text("username").lowercase();
        assert_eq!(field.coerce(&json!(" Root ")).unwrap(), json!("root"));
    }

    #[test]
    fn references_decode_plain_and_opaque_ids() {
        let field = FieldDef::reference("project_id", EntityKind::Project);
        assert_eq!(field.coerce(&json!(7)).unwrap(), json!(7));
        assert_eq!(field.coerce(&json!("7")).unwrap(), json!(7));
        let opaque = ids::encode(EntityKind::Project, 7);
        assert_eq!(field.coerce(&json!(opaque)).unwrap(), json!(7));

        let foreign = ids::encode(EntityKind::Task, 7);
        assert_eq!(field.coerce(&json!(foreign)), Err(CoerceError::Unresolvable(EntityKind::Project)));
        assert!(matches!(field.coerce(&json!("not-an-id")), Err(CoerceError::Invalid(_))));
    }

    #[test]
    fn nulls_pass_through() {
        let field = FieldDef::text("phone");
        assert_eq!(field.coerce(&Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@acme.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
    }
}
