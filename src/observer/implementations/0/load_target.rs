// Ring 0: Load Target - lock the row an update or delete acts on
use async_trait::async_trait;

use crate::database::Record;
use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ResolveObserver};
use crate::types::Operation;

#[derive(Default)]
pub struct LoadTarget;

impl Observer for LoadTarget {
    fn name(&self) -> &'static str {
        "LoadTarget"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Resolve
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Update | Operation::Delete)
    }

    fn priority(&self) -> u8 {
        20
    }
}

#[async_trait]
impl ResolveObserver for LoadTarget {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let Some(id) = ctx.target_id else {
            return Err(MutationError::unexpected("mutation target was not parsed"));
        };
        let kind = ctx.kind;

        // Row lock is held until commit or rollback
        let Some(row) = ctx.tx_mut()?.fetch_for_update(kind, id).await? else {
            tracing::debug!("{} {} not found", kind, id);
            return Err(MutationError::NotFound(kind));
        };

        ctx.record = Record::from_row(row);
        Ok(())
    }
}
