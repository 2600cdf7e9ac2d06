use chrono::{DateTime, Utc};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use crate::authz::Principal;
use crate::database::{Record, StoreTransaction};
use crate::observer::envelope::MutationRequest;
use crate::observer::error::MutationError;
use crate::schema::{EntityKind, EntitySchema, FieldDefault};
use crate::types::{EntityId, Operation, RowData};

/// State that flows through the synchronous rings of one mutation
pub struct MutationContext {
    pub request_id: Uuid,
    pub operation: Operation,
    pub kind: EntityKind,
    pub schema: &'static EntitySchema,
    pub principal: Principal,

    /// Raw argument bag as received
    pub arguments: RowData,
    /// Decoded `id` argument (update/delete)
    pub target_id: Option<EntityId>,
    /// Supplied fields after typed coercion, `id` excluded
    pub input: RowData,

    /// The candidate: empty for create, the locked stored row for update/delete
    pub record: Record,

    /// Open transaction; taken by the pipeline at commit or rollback
    pub tx: Option<Box<dyn StoreTransaction>>,

    /// Single clock reading for every server-assigned timestamp
    pub now: DateTime<Utc>,

    // Type-safe metadata storage for cross-observer communication
    metadata: HashMap<TypeId, Box<dyn Any + Send>>,

    pub start_time: Instant,
    pub errors: Vec<MutationError>,
}

impl MutationContext {
    pub fn new(
        request_id: Uuid,
        request: MutationRequest,
        principal: Principal,
        tx: Box<dyn StoreTransaction>,
    ) -> Self {
        Self {
            request_id,
            operation: request.operation,
            kind: request.kind,
            schema: request.kind.schema(),
            principal,
            arguments: request.arguments,
            target_id: None,
            input: RowData::new(),
            record: Record::new(),
            tx: Some(tx),
            now: Utc::now(),
            metadata: HashMap::new(),
            start_time: Instant::now(),
            errors: Vec::new(),
        }
    }

    /// The open transaction
    pub fn tx_mut(&mut self) -> Result<&mut (dyn StoreTransaction + 'static), MutationError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| MutationError::unexpected("transaction is no longer open"))
    }

    /// Store typed metadata - compile-time type safety
    pub fn set_metadata<T: Send + 'static>(&mut self, data: T) {
        self.metadata.insert(TypeId::of::<T>(), Box::new(data));
    }

    /// Retrieve typed metadata - compile-time type safety
    pub fn get_metadata<T: Send + 'static>(&self) -> Option<&T> {
        self.metadata
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// What the row will look like once the supplied fields are applied.
    ///
    /// Used before the apply ring runs, so only the principal default is
    /// filled in; that one decides ownership of a new client.
    pub fn preview(&self) -> RowData {
        let mut row = self.record.to_row();
        for (key, value) in &self.input {
            row.insert(key.clone(), value.clone());
        }
        if self.operation == Operation::Create {
            for field in &self.schema.fields {
                if matches!(field.default, FieldDefault::Principal) && !row.contains_key(field.name) {
                    row.insert(field.name.to_string(), Value::from(self.principal.id));
                }
            }
        }
        row
    }

    /// Get total execution time
    pub fn execution_time(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Read-only snapshot for the audit ring
    pub fn committed(&self) -> CommittedMutation {
        let changed_fields = match self.operation {
            Operation::Delete => Vec::new(),
            _ => self.record.changes().into_keys().filter(|field| field != "id").collect(),
        };

        CommittedMutation {
            request_id: self.request_id,
            operation: self.operation,
            kind: self.kind,
            principal: self.principal.clone(),
            entity_id: self.record.id().or(self.target_id),
            changed_fields,
        }
    }
}

/// A committed mutation as seen by post-commit observers
#[derive(Debug, Clone)]
pub struct CommittedMutation {
    pub request_id: Uuid,
    pub operation: Operation,
    pub kind: EntityKind,
    pub principal: Principal,
    pub entity_id: Option<EntityId>,
    /// Names only; values never leave the transaction
    pub changed_fields: Vec<String>,
}

/// Strongly-typed metadata structs for cross-observer communication

/// Rows behind the references supplied in the argument bag, keyed by field name
#[derive(Debug, Clone, Default)]
pub struct ResolvedReferences(pub HashMap<&'static str, RowData>);

impl ResolvedReferences {
    pub fn get(&self, field: &str) -> Option<&RowData> {
        self.0.get(field)
    }
}
