/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Primary key of every stored entity (BIGSERIAL in Postgres)
pub type EntityId = i64;

/// A stored row as a JSON object keyed by column name
pub type RowData = serde_json::Map<String, serde_json::Value>;

/// Operations supported throughout the system
/// Used by the mutation pipeline, the authorization predicate and individual records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Verb used as the mutation name prefix (createProject, updateProject, ...)
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}
