// Ring 2: Stamp Read At - notifications record when they were read
use async_trait::async_trait;
use serde_json::Value;

use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{ApplyObserver, Observer, ObserverRing};
use crate::schema::field::format_datetime;
use crate::schema::EntityKind;
use crate::types::Operation;

#[derive(Default)]
pub struct StampReadAt;

impl Observer for StampReadAt {
    fn name(&self) -> &'static str {
        "StampReadAt"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Apply
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_entity(&self, kind: EntityKind) -> bool {
        kind == EntityKind::Notification
    }

    fn priority(&self) -> u8 {
        30
    }
}

#[async_trait]
impl ApplyObserver for StampReadAt {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let read = ctx.record.get("read") == Some(&Value::Bool(true));
        let was_read = ctx.record.get_original("read") == Some(&Value::Bool(true));

        if read && !was_read && ctx.record.is_blank("read_at") && !ctx.input.contains_key("read_at") {
            let now = format_datetime(&ctx.now);
            ctx.record.set("read_at", now);
        }
        Ok(())
    }
}
