// Ring 5: Audit Log - one structured line per committed mutation
use async_trait::async_trait;

use crate::config;
use crate::observer::context::CommittedMutation;
use crate::observer::error::MutationError;
use crate::observer::traits::{AuditObserver, Observer, ObserverRing};
use crate::types::Operation;

/// Emits on the `audit` target. Field names only, never values.
#[derive(Default)]
pub struct AuditLog;

impl Observer for AuditLog {
    fn name(&self) -> &'static str {
        "AuditLog"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Audit
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        config::config().security.enable_audit_logging
    }
}

#[async_trait]
impl AuditObserver for AuditLog {
    async fn execute(&self, mutation: &CommittedMutation) -> Result<(), MutationError> {
        tracing::info!(
            target: "audit",
            request_id = %mutation.request_id,
            principal = mutation.principal.id,
            username = %mutation.principal.username,
            operation = ?mutation.operation,
            entity = %mutation.kind,
            id = ?mutation.entity_id,
            fields = ?mutation.changed_fields,
            "mutation committed"
        );
        Ok(())
    }
}
