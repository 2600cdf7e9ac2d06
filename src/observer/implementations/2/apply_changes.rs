// Ring 2: Apply Changes - build the candidate record
use async_trait::async_trait;
use serde_json::Value;

use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{ApplyObserver, Observer, ObserverRing};
use crate::schema::field::format_datetime;
use crate::schema::FieldDefault;
use crate::types::Operation;

/// Create: every declared field from the input or its default.
/// Update: only the supplied fields; omitted fields keep their stored value.
///
/// An explicit null on a field with a fixed default falls back to that default,
/// since those columns are never nullable.
#[derive(Default)]
pub struct ApplyChanges;

impl Observer for ApplyChanges {
    fn name(&self) -> &'static str {
        "ApplyChanges"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Apply
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl ApplyObserver for ApplyChanges {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let schema = ctx.schema;

        for field in &schema.fields {
            let supplied = ctx.input.get(field.name);
            let value = match (supplied, &field.default) {
                (Some(Value::Null), FieldDefault::Value(default)) => default.clone(),
                (Some(value), _) => value.clone(),
                (None, _) if ctx.operation == Operation::Update => continue,
                (None, default) => default_value(ctx, default),
            };
            ctx.record.set(field.name, value);
        }

        tracing::debug!("Applied {} field(s) to {}", ctx.input.len(), ctx.kind);
        Ok(())
    }
}

/// Value of a declared default at this mutation's clock reading.
/// Derived fields start out null and are filled by `DeriveFields`.
fn default_value(ctx: &MutationContext, default: &FieldDefault) -> Value {
    match default {
        FieldDefault::None | FieldDefault::Derived { .. } => Value::Null,
        FieldDefault::Value(value) => value.clone(),
        FieldDefault::Now => Value::String(format_datetime(&ctx.now)),
        FieldDefault::Today => Value::String(ctx.now.date_naive().format("%Y-%m-%d").to_string()),
        FieldDefault::Principal => Value::from(ctx.principal.id),
    }
}
