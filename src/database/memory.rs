// In-memory EntityStore used by tests and the `memory` backend.
//
// A transaction takes the table lock for its whole lifetime and works on a
// staged copy; commit swaps the copy in, so readers never observe partial writes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::database::manager::DatabaseError;
use crate::database::store::{EntityStore, StoreTransaction};
use crate::schema::EntityKind;
use crate::types::{EntityId, RowData};

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: HashMap<EntityKind, BTreeMap<EntityId, RowData>>,
    last_id: HashMap<EntityKind, EntityId>,
}

impl Tables {
    fn table(&self, kind: EntityKind) -> Option<&BTreeMap<EntityId, RowData>> {
        self.rows.get(&kind)
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Option<RowData> {
        self.table(kind).and_then(|rows| rows.get(&id)).cloned()
    }

    fn insert(&mut self, kind: EntityKind, row: &RowData) -> RowData {
        let next = self.last_id.entry(kind).or_insert(0);
        *next += 1;
        let id = *next;

        let mut stored = RowData::new();
        for column in kind.schema().columns() {
            stored.insert(column.to_string(), row.get(column).cloned().unwrap_or(Value::Null));
        }
        stored.insert("id".to_string(), Value::from(id));

        self.rows.entry(kind).or_default().insert(id, stored.clone());
        stored
    }

    /// Remove a row and, recursively, every row referencing it
    fn delete_cascade(&mut self, kind: EntityKind, id: EntityId) -> bool {
        let removed = self
            .rows
            .get_mut(&kind)
            .and_then(|rows| rows.remove(&id))
            .is_some();
        if !removed {
            return false;
        }

        for dependant in EntityKind::ALL {
            let fields: Vec<&'static str> = dependant
                .schema()
                .references()
                .filter(|(_, target)| *target == kind)
                .map(|(field, _)| field.name)
                .collect();
            if fields.is_empty() {
                continue;
            }

            let doomed: Vec<EntityId> = self
                .table(dependant)
                .map(|rows| {
                    rows.iter()
                        .filter(|(_, row)| fields.iter().any(|f| row.get(*f).and_then(Value::as_i64) == Some(id)))
                        .map(|(child_id, _)| *child_id)
                        .collect()
                })
                .unwrap_or_default();

            for child_id in doomed {
                self.delete_cascade(dependant, child_id);
            }
        }

        true
    }
}

/// Process-local store; clones share the same tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }

    async fn fetch(&self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError> {
        Ok(self.tables.lock().await.get(kind, id))
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<RowData>, DatabaseError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .table(kind)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn fetch(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError> {
        Ok(self.staged.get(kind, id))
    }

    async fn fetch_for_update(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError> {
        // The whole store is already locked for this transaction
        Ok(self.staged.get(kind, id))
    }

    async fn exists_with(
        &mut self,
        kind: EntityKind,
        field: &str,
        value: &Value,
        exclude_id: Option<EntityId>,
    ) -> Result<bool, DatabaseError> {
        Ok(self
            .staged
            .table(kind)
            .map(|rows| {
                rows.iter()
                    .any(|(id, row)| Some(*id) != exclude_id && row.get(field) == Some(value))
            })
            .unwrap_or(false))
    }

    async fn insert(&mut self, kind: EntityKind, row: &RowData) -> Result<RowData, DatabaseError> {
        Ok(self.staged.insert(kind, row))
    }

    async fn update(&mut self, kind: EntityKind, id: EntityId, changes: &RowData) -> Result<RowData, DatabaseError> {
        let row = self
            .staged
            .rows
            .get_mut(&kind)
            .and_then(|rows| rows.get_mut(&id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", kind, id)))?;

        for (field, value) in changes {
            if field != "id" {
                row.insert(field.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn delete(&mut self, kind: EntityKind, id: EntityId) -> Result<bool, DatabaseError> {
        Ok(self.staged.delete_cascade(kind, id))
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}
