// Ring 3: Relational Rules - cross-field rules that need related rows
use async_trait::async_trait;
use serde_json::Value;

use crate::authz::chain::client_of;
use crate::database::{DatabaseError, Record, StoreTransaction};
use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ValidateObserver};
use crate::schema::{CrossFieldRule, EntityKind, EntitySchema};
use crate::types::Operation;

/// `SameParent` (a task's activity lives in the task's project) and
/// `SubjectOfClient` (a notification's subject descends from its client).
#[derive(Default)]
pub struct RelationalRules;

impl Observer for RelationalRules {
    fn name(&self) -> &'static str {
        "RelationalRules"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Validate
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_entity(&self, kind: EntityKind) -> bool {
        kind.schema().rules.iter().any(|rule| !rule.is_local())
    }

    fn priority(&self) -> u8 {
        20
    }
}

#[async_trait]
impl ValidateObserver for RelationalRules {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let schema = ctx.schema;
        let record = ctx.record.clone();
        let tx = ctx.tx_mut()?;

        let mut violations = Vec::new();
        for rule in schema.rules.iter().filter(|rule| !rule.is_local()) {
            if let Some(message) = check(tx, schema, &record, rule).await? {
                violations.push(message.to_string());
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(MutationError::ValidationFailed(violations))
        }
    }
}

async fn check(
    tx: &mut dyn StoreTransaction,
    schema: &EntitySchema,
    record: &Record,
    rule: &CrossFieldRule,
) -> Result<Option<&'static str>, DatabaseError> {
    match *rule {
        CrossFieldRule::SameParent { child, parent, message } => {
            let (Some(child_id), Some(target)) = (
                record.get_id(child),
                schema.field(child).and_then(|field| field.reference_target()),
            ) else {
                return Ok(None);
            };
            let Some(child_row) = tx.fetch(target, child_id).await? else {
                return Ok(None);
            };
            let same = child_row.get(parent).and_then(Value::as_i64) == record.get_id(parent);
            Ok((!same).then_some(message))
        }
        CrossFieldRule::SubjectOfClient { subjects, client, message } => {
            let set: Vec<_> = subjects
                .iter()
                .filter_map(|name| {
                    let id = record.get_id(name)?;
                    let target = schema.field(name)?.reference_target()?;
                    Some((target, id))
                })
                .collect();
            // Zero or several subjects is the exactly-one rule's to report
            let [(target, id)] = set.as_slice() else {
                return Ok(None);
            };
            let owner = client_of(tx, *target, *id).await?;
            Ok((owner != record.get_id(client)).then_some(message))
        }
        CrossFieldRule::ExactlyOne { .. } | CrossFieldRule::NotBefore { .. } => Ok(None),
    }
}
