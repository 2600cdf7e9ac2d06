// Ring 4: Hash Credentials - secrets are stored as Argon2id hashes only
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::auth::password::hash_password;
use crate::observer::context::MutationContext;
use crate::observer::error::MutationError;
use crate::observer::traits::{Observer, ObserverRing, PersistObserver};
use crate::schema::EntityKind;
use crate::types::Operation;

#[derive(Default)]
pub struct HashCredentials;

impl Observer for HashCredentials {
    fn name(&self) -> &'static str {
        "HashCredentials"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Persist
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_entity(&self, kind: EntityKind) -> bool {
        kind.schema().secret_fields().next().is_some()
    }

    // Argon2 is deliberately slow
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[async_trait]
impl PersistObserver for HashCredentials {
    async fn execute(&self, ctx: &mut MutationContext) -> Result<(), MutationError> {
        let pending: Vec<(&'static str, String)> = ctx
            .schema
            .secret_fields()
            .filter(|field| ctx.record.changed(field.name))
            .filter_map(|field| match ctx.record.get(field.name) {
                Some(Value::String(plain)) if !plain.is_empty() => Some((field.name, plain.clone())),
                _ => None,
            })
            .collect();

        for (name, plain) in pending {
            let hashed = tokio::task::spawn_blocking(move || hash_password(&plain))
                .await
                .map_err(|e| MutationError::unexpected(format!("hashing task failed: {}", e)))?
                .map_err(|e| MutationError::unexpected(format!("password hashing failed: {}", e)))?;
            ctx.record.set(name, hashed);
            tracing::debug!("Hashed {} for {}", name, ctx.kind);
        }
        Ok(())
    }
}
