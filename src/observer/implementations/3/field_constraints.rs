// Ring 3: Field Constraints - declared per-field rules and local cross-field rules
use async_trait::async_trait;

use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ValidateObserver};
use crate::types::Operation;
use crate::validation::{validate_fields, validate_local_rules};

#[derive(Default)]
pub struct FieldConstraints;

impl Observer for FieldConstraints {
    fn name(&self) -> &'static str {
        "FieldConstraints"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Validate
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl ValidateObserver for FieldConstraints {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let mut violations = validate_fields(ctx.schema, &ctx.record, ctx.now);
        violations.extend(validate_local_rules(ctx.schema, &ctx.record));

        if violations.is_empty() {
            Ok(())
        } else {
            Err(MutationError::ValidationFailed(violations))
        }
    }
}
