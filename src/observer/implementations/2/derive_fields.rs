// Ring 2: Derive Fields - copy values from referenced records
use async_trait::async_trait;
use serde_json::Value;

use crate::observer::context::{MutationContext, ResolvedReferences};
use crate::observer::error::MutationError;
use crate::observer::traits::{ApplyObserver, Observer, ObserverRing};
use crate::schema::{EntityKind, FieldDefault};
use crate::types::Operation;

/// Fills `Derived` fields (a report's client) from the record behind `via`.
/// Recomputed whenever `via` is supplied, so the copy follows a reassignment.
#[derive(Default)]
pub struct DeriveFields;

impl Observer for DeriveFields {
    fn name(&self) -> &'static str {
        "DeriveFields"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Apply
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_entity(&self, kind: EntityKind) -> bool {
        kind.schema()
            .fields
            .iter()
            .any(|field| matches!(field.default, FieldDefault::Derived { .. }))
    }

    fn priority(&self) -> u8 {
        20
    }
}

#[async_trait]
impl ApplyObserver for DeriveFields {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let derived: Vec<(&'static str, Value)> = ctx
            .schema
            .fields
            .iter()
            .filter_map(|field| match field.default {
                FieldDefault::Derived { via, field: source } => Some((field.name, via, source)),
                _ => None,
            })
            .filter(|(_, via, _)| ctx.operation == Operation::Create || ctx.input.contains_key(*via))
            .map(|(name, via, source)| {
                let value = ctx
                    .get_metadata::<ResolvedReferences>()
                    .and_then(|resolved| resolved.get(via))
                    .and_then(|row| row.get(source))
                    .cloned()
                    .unwrap_or(Value::Null);
                (name, value)
            })
            .collect();

        for (name, value) in derived {
            ctx.record.set(name, value);
        }
        Ok(())
    }
}
