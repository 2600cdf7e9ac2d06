// Ring 4: Write Record - the single store write of a mutation
use async_trait::async_trait;

use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, PersistObserver};
use crate::types::Operation;

#[derive(Default)]
pub struct WriteRecord;

impl Observer for WriteRecord {
    fn name(&self) -> &'static str {
        "WriteRecord"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Persist
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        50
    }
}

#[async_trait]
impl PersistObserver for WriteRecord {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let kind = ctx.kind;

        match ctx.operation {
            Operation::Create => {
                let row = ctx.record.to_row();
                let stored = ctx.tx_mut()?.insert(kind, &row).await?;
                tracing::debug!("Inserted {} {:?}", kind, stored.get("id"));
                ctx.record.persisted(stored);
            }
            Operation::Update => {
                let changes = ctx.record.changed_row();
                if changes.is_empty() {
                    tracing::debug!("No changes to write for {} {:?}", kind, ctx.target_id);
                    return Ok(());
                }
                let id = ctx.record.id().ok_or_else(|| MutationError::unexpected("update target has no id"))?;
                let stored = ctx.tx_mut()?.update(kind, id, &changes).await?;
                tracing::debug!("Updated {} {} ({} field(s))", kind, id, changes.len());
                ctx.record.persisted(stored);
            }
            Operation::Delete => {
                let id = ctx.record.id().ok_or_else(|| MutationError::unexpected("delete target has no id"))?;
                if !ctx.tx_mut()?.delete(kind, id).await? {
                    return Err(MutationError::NotFound(kind));
                }
                tracing::debug!("Deleted {} {}", kind, id);
            }
        }
        Ok(())
    }
}
