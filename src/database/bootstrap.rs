// First-run provisioning: create the initial superuser directly in the store.
//
// There is no principal yet to authorize a createAccount mutation, so this path
// writes through a transaction of its own, after the same field validation.

use chrono::Utc;
use serde_json::Value;

use crate::auth::password::hash_password;
use crate::database::manager::DatabaseError;
use crate::database::record::Record;
use crate::database::store::EntityStore;
use crate::schema::field::format_datetime;
use crate::schema::{CoerceError, EntityKind};
use crate::types::EntityId;
use crate::validation::validate_fields;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Invalid superuser: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Create a superuser unless an account with that username exists.
///
/// Returns the new id, or None when the username was already taken.
pub async fn ensure_superuser(
    store: &dyn EntityStore,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Option<EntityId>, BootstrapError> {
    let schema = EntityKind::Account.schema();
    let mut record = Record::new();
    let mut violations = Vec::new();

    for (name, raw) in [("username", username), ("email", email), ("password", password)] {
        let Some(field) = schema.field(name) else {
            continue;
        };
        match field.coerce(&Value::from(raw)) {
            Ok(value) => {
                record.set(name, value);
            }
            Err(CoerceError::Invalid(message)) => violations.push(message),
            Err(CoerceError::Unresolvable(kind)) => violations.push(format!("{}: {} not found.", name, kind)),
        }
    }

    let now = Utc::now();
    record
        .set("is_superuser", true)
        .set("is_staff", true)
        .set("date_joined", format_datetime(&now));

    violations.extend(validate_fields(schema, &record, now));
    if !violations.is_empty() {
        return Err(BootstrapError::Invalid(violations));
    }

    let mut tx = store.begin().await?;
    let username = record.get("username").cloned().unwrap_or(Value::Null);
    if tx.exists_with(EntityKind::Account, "username", &username, None).await? {
        tx.rollback().await?;
        tracing::info!("Superuser {} already exists", username);
        return Ok(None);
    }

    let plain = password.to_string();
    let hashed = tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| BootstrapError::Hashing(e.to_string()))?
        .map_err(|e| BootstrapError::Hashing(e.to_string()))?;
    record.set("password", hashed);

    let stored = tx.insert(EntityKind::Account, &record.to_row()).await?;
    tx.commit().await?;

    let id = stored.get("id").and_then(Value::as_i64);
    tracing::info!("Created superuser {} with id {:?}", username, id);
    Ok(id)
}
