use async_trait::async_trait;
use serde_json::Value;

use crate::database::manager::DatabaseError;
use crate::schema::EntityKind;
use crate::types::{EntityId, RowData};

/// Generic persistence boundary keyed by entity id.
///
/// Reads outside a mutation go straight to the store; every write happens
/// through a `StoreTransaction` obtained from `begin`.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Short name for logs and the health endpoint
    fn backend(&self) -> &'static str;

    /// Open a transaction for one mutation
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError>;

    async fn fetch(&self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError>;

    /// All rows of a kind, ordered by id
    async fn list(&self, kind: EntityKind) -> Result<Vec<RowData>, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Explicit transaction handle passed through the mutation pipeline.
///
/// Dropping a transaction without calling `commit` discards its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn fetch(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError>;

    /// Fetch and lock the row until the transaction ends
    async fn fetch_for_update(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError>;

    /// True when another row of `kind` already holds `value` in `field`
    async fn exists_with(
        &mut self,
        kind: EntityKind,
        field: &str,
        value: &Value,
        exclude_id: Option<EntityId>,
    ) -> Result<bool, DatabaseError>;

    /// Insert a row; returns the stored row including its new id
    async fn insert(&mut self, kind: EntityKind, row: &RowData) -> Result<RowData, DatabaseError>;

    /// Apply `changes` to the row; returns the full stored row
    async fn update(&mut self, kind: EntityKind, id: EntityId, changes: &RowData) -> Result<RowData, DatabaseError>;

    /// Delete the row and everything that references it; false if it did not exist
    async fn delete(&mut self, kind: EntityKind, id: EntityId) -> Result<bool, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
