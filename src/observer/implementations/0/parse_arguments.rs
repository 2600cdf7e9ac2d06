// Ring 0: Parse Arguments - typed coercion of the argument bag
use async_trait::async_trait;
use serde_json::Value;

use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, ResolveObserver};
use crate::schema::{CoerceError, EntityKind, FieldDef};
use crate::types::{EntityId, Operation, RowData};

/// Turns the raw argument bag into `target_id` and `input`.
///
/// Unknown keys and server-assigned fields are rejected rather than dropped.
/// A well-formed id of another entity type can never resolve and is reported
/// as NotFound, but only when nothing else is wrong with the bag.
#[derive(Default)]
pub struct ParseArguments;

impl Observer for ParseArguments {
    fn name(&self) -> &'static str {
        "ParseArguments"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Resolve
    }

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl ResolveObserver for ParseArguments {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let parsed = parse(ctx.kind, ctx.operation, &ctx.arguments)?;

        tracing::debug!(
            "Parsed {} argument(s) for {} (target: {:?})",
            parsed.input.len(),
            ctx.kind,
            parsed.target_id
        );

        ctx.target_id = parsed.target_id;
        ctx.input = parsed.input;
        Ok(())
    }
}

#[derive(Debug)]
struct ParsedArguments {
    target_id: Option<EntityId>,
    input: RowData,
}

fn parse(kind: EntityKind, operation: Operation, arguments: &RowData) -> Result<ParsedArguments, MutationError> {
    let schema = kind.schema();
    let mut violations = Vec::new();
    let mut unresolvable: Option<EntityKind> = None;
    let mut target_id = None;
    let mut id_reported = false;
    let mut input = RowData::new();

    for (key, raw) in arguments {
        if key == "id" {
            if operation == Operation::Create {
                violations.push("id: This field is set by the server.".to_string());
                continue;
            }
            match FieldDef::reference("id", kind).coerce(raw) {
                Ok(Value::Number(id)) => target_id = id.as_i64(),
                Ok(_) => {}
                Err(CoerceError::Invalid(message)) => {
                    id_reported = true;
                    violations.push(message);
                }
                Err(CoerceError::Unresolvable(target)) => {
                    id_reported = true;
                    unresolvable.get_or_insert(target);
                }
            }
            continue;
        }

        // Delete takes nothing but the target
        let field = match schema.field(key) {
            Some(field) if operation != Operation::Delete => field,
            _ => {
                violations.push(format!("Unknown field: {}.", key));
                continue;
            }
        };

        if !field.writable {
            violations.push(format!("{}: This field is set by the server.", key));
            continue;
        }

        match field.coerce(raw) {
            Ok(value) => {
                input.insert(key.clone(), value);
            }
            Err(CoerceError::Invalid(message)) => violations.push(message),
            Err(CoerceError::Unresolvable(target)) => {
                unresolvable.get_or_insert(target);
            }
        }
    }

    if operation != Operation::Create && target_id.is_none() && !id_reported {
        violations.push("id: This field is required.".to_string());
    }

    if !violations.is_empty() {
        return Err(MutationError::ValidationFailed(violations));
    }
    if let Some(target) = unresolvable {
        return Err(MutationError::NotFound(target));
    }

    Ok(ParsedArguments { target_id, input })
}
