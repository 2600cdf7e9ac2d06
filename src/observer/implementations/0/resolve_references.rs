// Ring 0: Resolve References - every supplied foreign key must exist
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::observer::context::{MutationContext, ResolvedReferences};
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ResolveObserver};
use crate::types::Operation;

/// Looks up each non-null reference in the argument bag inside the
/// transaction. A dangling id is NotFound naming the referenced type, never a
/// null assignment. The loaded rows are kept for later rings.
#[derive(Default)]
pub struct ResolveReferences;

impl Observer for ResolveReferences {
    fn name(&self) -> &'static str {
        "ResolveReferences"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Resolve
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn priority(&self) -> u8 {
        30
    }
}

#[async_trait]
impl ResolveObserver for ResolveReferences {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let wanted: Vec<_> = ctx
            .schema
            .references()
            .filter_map(|(field, target)| {
                let id = ctx.input.get(field.name).and_then(Value::as_i64)?;
                Some((field.name, target, id))
            })
            .collect();

        let mut resolved = HashMap::new();
        let tx = ctx.tx_mut()?;
        for (field, target, id) in wanted {
            match tx.fetch(target, id).await? {
                Some(row) => {
                    resolved.insert(field, row);
                }
                None => {
                    tracing::debug!("{} references missing {} {}", field, target, id);
                    return Err(MutationError::NotFound(target));
                }
            }
        }

        ctx.set_metadata(ResolvedReferences(resolved));
        Ok(())
    }
}
