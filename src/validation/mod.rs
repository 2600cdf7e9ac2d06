// Validation layer: declared field constraints and cross-field rules evaluated
// against a candidate record. Checks that need the store (uniqueness, rules
// spanning related rows) live in the pipeline's validate ring.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::database::Record;
use crate::schema::field::{is_valid_email, parse_datetime};
use crate::schema::{CrossFieldRule, EntitySchema, FieldDef, FieldKind};

/// Field-level checks for every declared field of the candidate
pub fn validate_fields(schema: &EntitySchema, record: &Record, now: DateTime<Utc>) -> Vec<String> {
    schema
        .fields
        .iter()
        .flat_map(|field| validate_field(field, record, now))
        .collect()
}

fn validate_field(field: &FieldDef, record: &Record, now: DateTime<Utc>) -> Vec<String> {
    let mut violations = Vec::new();
    let name = field.name;

    if record.is_blank(name) {
        if field.required {
            violations.push(format!("{}: This field is required.", name));
        }
        return violations;
    }

    let Some(value) = record.get(name) else {
        return violations;
    };

    if let Value::String(text) = value {
        let length = text.chars().count();
        if let Some(max) = field.max_len {
            if length > max {
                violations.push(format!("{}: Ensure this value has at most {} characters.", name, max));
            }
        }
        if let Some(min) = field.min_len {
            if length < min {
                violations.push(format!("{}: Ensure this value has at least {} characters.", name, min));
            }
        }
    }

    match field.kind {
        FieldKind::Email => {
            if !value.as_str().map_or(false, is_valid_email) {
                violations.push(format!("{}: Enter a valid email address.", name));
            }
        }
        FieldKind::Pattern { regex, message } => {
            if !value.as_str().map_or(false, |text| regex.is_match(text)) {
                violations.push(format!("{}: {}", name, message));
            }
        }
        FieldKind::Choice(choices) => {
            let text = value.as_str().unwrap_or_default();
            if !choices.contains(&text) {
                violations.push(format!("{}: \"{}\" is not a valid choice.", name, text));
            }
        }
        FieldKind::DateTime if field.not_past && record.changed(name) => {
            if instant(value).map_or(false, |at| at < now) {
                violations.push(format!("{}: Cannot be in the past.", name));
            }
        }
        _ => {}
    }

    violations
}

/// Cross-field rules that need nothing but the candidate itself
pub fn validate_local_rules(schema: &EntitySchema, record: &Record) -> Vec<String> {
    schema
        .rules
        .iter()
        .filter(|rule| rule.is_local())
        .filter_map(|rule| match rule {
            CrossFieldRule::ExactlyOne { fields, message } => {
                let set = fields.iter().filter(|field| !record.is_blank(field)).count();
                (set != 1).then(|| message.to_string())
            }
            CrossFieldRule::NotBefore { earlier, later, message } => {
                let start = record.get(earlier).and_then(instant)?;
                let end = record.get(later).and_then(instant)?;
                (end < start).then(|| message.to_string())
            }
            _ => None,
        })
        .collect()
}

/// Dates and timestamps on one axis; a bare date is midnight UTC
fn instant(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    parse_datetime(text).or_else(|| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityKind;
    use chrono::Duration;
    use serde_json::json;

    fn candidate(value: Value) -> Record {
        let mut record = Record::new();
        for (key, value) in value.as_object().cloned().unwrap() {
            record.set(key, value);
        }
        record
    }

    #[test]
    fn reports_every_missing_required_field() {
        let schema = EntityKind::Project.schema();
        let violations = validate_fields(schema, &candidate(json!({ "status": "open" })), Utc::now());
        for field in ["name", "description", "cleiton_id", "start_date", "estimated_end_date"] {
            assert!(
                violations.contains(&format!("{}: This field is required.", field)),
                "missing violation for {}: {:?}",
                field,
                violations
            );
        }
    }

    #[test]
    fn enum_membership_is_enforced() {
        let schema = EntityKind::Activity.schema();
        let record = candidate(json!({ "priority": "urgent", "status": "pending" }));
        let violations = validate_fields(schema, &record, Utc::now());
        assert!(violations.contains(&"priority: \"urgent\" is not a valid choice.".to_string()));
        assert!(!violations.iter().any(|v| v.starts_with("status:")));
    }

    #[test]
    fn formats_and_lengths() {
        let schema = EntityKind::Account.schema();
        let record = candidate(json!({
            "username": "bad name!",
            "email": "nope",
            "password": "short",
            "cpf": "123",
        }));
        let violations = validate_fields(schema, &record, Utc::now());
        assert!(violations.iter().any(|v| v.starts_with("username:")));
        assert!(violations.contains(&"email: Enter a valid email address.".to_string()));
        assert!(violations.contains(&"password: Ensure this value has at least 8 characters.".to_string()));
        assert!(violations.contains(&"cpf: CPF must contain exactly 11 digits.".to_string()));
    }

    #[test]
    fn notification_needs_exactly_one_subject() {
        let schema = EntityKind::Notification.schema();
        let message = "A notification must be associated with exactly one entity.".to_string();

        let none = candidate(json!({ "cleiton_id": 1 }));
        assert!(validate_local_rules(schema, &none).contains(&message));

        let two = candidate(json!({ "cleiton_id": 1, "project_id": 1, "task_id": 2 }));
        assert!(validate_local_rules(schema, &two).contains(&message));

        let one = candidate(json!({ "cleiton_id": 1, "report_id": 3 }));
        assert!(validate_local_rules(schema, &one).is_empty());
    }

    #[test]
    fn end_dates_must_not_precede_start_dates() {
        let schema = EntityKind::Project.schema();
        let backwards = candidate(json!({ "start_date": "2025-05-01", "estimated_end_date": "2025-04-01" }));
        assert_eq!(validate_local_rules(schema, &backwards).len(), 1);

        let same_day = candidate(json!({ "start_date": "2025-05-01", "estimated_end_date": "2025-05-01" }));
        assert!(validate_local_rules(schema, &same_day).is_empty());
    }

    #[test]
    fn events_may_end_when_they_start() {
        let schema = EntityKind::Event.schema();
        let base = |end: &str| {
            candidate(json!({ "task_id": 1, "start_time": "2030-01-01T10:00:00Z", "end_time": end }))
        };

        assert!(validate_local_rules(schema, &base("2030-01-01T10:00:00Z")).is_empty());
        assert_eq!(
            validate_local_rules(schema, &base("2030-01-01T09:59:00Z")),
            vec!["End time must not be before the start time.".to_string()]
        );
    }

    #[test]
    fn past_start_times_only_matter_when_changed() {
        let schema = EntityKind::Event.schema();
        let now = Utc::now();
        let yesterday = (now - Duration::days(1)).to_rfc3339();

        let fresh = candidate(json!({ "start_time": yesterday }));
        assert!(validate_fields(schema, &fresh, now).contains(&"start_time: Cannot be in the past.".to_string()));

        let stored = json!({ "id": 1, "start_time": yesterday }).as_object().cloned().unwrap();
        let mut untouched = Record::from_row(stored);
        untouched.set("title", "Renamed");
        assert!(!validate_fields(schema, &untouched, now).iter().any(|v| v.starts_with("start_time:")));
    }
}
