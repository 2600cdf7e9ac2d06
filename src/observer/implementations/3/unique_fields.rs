// Ring 3: Unique Fields - uniqueness checked against the store
use async_trait::async_trait;

use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ValidateObserver};
use crate::schema::EntityKind;
use crate::types::Operation;

/// Checked inside the transaction; the store's unique constraints remain the
/// last line for concurrent inserts.
#[derive(Default)]
pub struct UniqueFields;

impl Observer for UniqueFields {
    fn name(&self) -> &'static str {
        "UniqueFields"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Validate
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_entity(&self, kind: EntityKind) -> bool {
        kind.schema().fields.iter().any(|field| field.unique)
    }

    fn priority(&self) -> u8 {
        30
    }
}

#[async_trait]
impl ValidateObserver for UniqueFields {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let kind = ctx.kind;
        let exclude_id = ctx.record.id();
        let candidates: Vec<_> = ctx
            .schema
            .fields
            .iter()
            .filter(|field| field.unique && !ctx.record.is_blank(field.name))
            .filter(|field| ctx.operation == Operation::Create || ctx.record.changed(field.name))
            .filter_map(|field| Some((field.name, ctx.record.get(field.name)?.clone())))
            .collect();

        let tx = ctx.tx_mut()?;
        let mut violations = Vec::new();
        for (name, value) in candidates {
            if tx.exists_with(kind, name, &value, exclude_id).await? {
                violations.push(format!("{}: {} with this {} already exists.", name, kind, name));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(MutationError::ValidationFailed(violations))
        }
    }
}
