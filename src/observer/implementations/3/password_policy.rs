// Ring 3: Password Policy - deployment-configured credential rules
use async_trait::async_trait;
use serde_json::Value;

use crate::config;
use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ValidateObserver};
use crate::schema::{EntityKind, FieldDef};
use crate::types::Operation;

/// Runs before hashing, on the plaintext, and only when the secret changes.
/// The schema minimum is reported by `FieldConstraints`; this adds the
/// configured minimum when it is stricter.
#[derive(Default)]
pub struct PasswordPolicy;

impl Observer for PasswordPolicy {
    fn name(&self) -> &'static str {
        "PasswordPolicy"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Validate
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_entity(&self, kind: EntityKind) -> bool {
        kind.schema().secret_fields().next().is_some()
    }

    fn priority(&self) -> u8 {
        40
    }
}

#[async_trait]
impl ValidateObserver for PasswordPolicy {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let min_length = config::config().security.min_password_length;

        let violations: Vec<String> = ctx
            .schema
            .secret_fields()
            .filter(|field| ctx.record.changed(field.name))
            .filter_map(|field| {
                let Some(Value::String(secret)) = ctx.record.get(field.name) else {
                    return None;
                };
                check(field, secret, min_length)
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(MutationError::ValidationFailed(violations))
        }
    }
}

fn check(field: &FieldDef, secret: &str, min_length: usize) -> Option<String> {
    if secret.is_empty() {
        return None;
    }
    let length = secret.chars().count();
    if min_length > field.min_len.unwrap_or(0) && length < min_length {
        return Some(format!(
            "{}: This password is too short. It must contain at least {} characters.",
            field.name, min_length
        ));
    }
    if secret.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{}: This password is entirely numeric.", field.name));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password() -> &'static FieldDef {
        EntityKind::Account.schema().field("password").unwrap()
    }

    #[test]
    fn stricter_configured_minimum_applies() {
        assert!(check(password(), "abcdefghi", 12).is_some());
        assert!(check(password(), "abcdefghijkl", 12).is_none());
    }

    #[test]
    fn schema_minimum_is_not_reported_twice() {
        assert_eq!(check(password(), "abc", 8), None);
    }

    #[test]
    fn numeric_passwords_are_rejected() {
        assert_eq!(
            check(password(), "123456789012", 8),
            Some("password: This password is entirely numeric.".to_string())
        );
    }
}
