use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{EntityId, RowData};

/// Fields only the store may assign
const SYSTEM_FIELDS: &[&str] = &["id"];

/// Field change information for diff tracking
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub change_type: ChangeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Added,    // Field didn't exist in original
    Modified, // Field existed but value changed
    Removed,  // Field was explicitly removed
}

/// Errors that can occur during Record construction
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// A stored row with change tracking.
///
/// Create records start empty; update and delete records start from the row
/// loaded inside the mutation's transaction, so `changes()` is always relative
/// to what the store held when the row was locked.
#[derive(Debug, Clone)]
pub struct Record {
    /// Original state from the store (None for CREATE operations)
    original: Option<RowData>,
    /// Current field values
    fields: RowData,
    /// Fields that have been modified since original
    modified_fields: BTreeSet<String>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    /// Create a new empty record
    pub fn new() -> Self {
        Self {
            original: None,
            fields: Map::new(),
            modified_fields: BTreeSet::new(),
        }
    }

    /// Wrap a stored row as the target of an update or delete
    pub fn from_row(row: RowData) -> Self {
        Self {
            original: Some(row.clone()),
            fields: row,
            modified_fields: BTreeSet::new(),
        }
    }

    /// Parse an API argument bag; only JSON objects are accepted
    pub fn arguments_from_json(json: Value) -> Result<RowData, RecordError> {
        match json {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            _ => Err(RecordError::InvalidJson("Expected a JSON object.".to_string())),
        }
    }

    /// Get field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a field as a reference id, if set
    pub fn get_id(&self, key: &str) -> Option<EntityId> {
        self.get(key).and_then(Value::as_i64)
    }

    /// True when the field is absent or null
    pub fn is_blank(&self, key: &str) -> bool {
        match self.get(key) {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.is_empty(),
            Some(_) => false,
        }
    }

    /// Set field value with automatic change tracking
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();

        if SYSTEM_FIELDS.contains(&key.as_str()) {
            tracing::warn!("Attempted to set system field '{}' - ignoring", key);
            return self;
        }

        if self.original.is_some() {
            self.modified_fields.insert(key.clone());
        }

        self.fields.insert(key, value.into());
        self
    }

    /// Replace all fields with what the store returned after a write
    pub fn persisted(&mut self, row: RowData) -> &mut Self {
        self.fields = row;
        self
    }

    /// Record id
    pub fn id(&self) -> Option<EntityId> {
        self.get_id("id")
    }

    // ========================================
    // Change tracking
    // ========================================

    /// Check if a specific field has been changed
    pub fn changed(&self, key: &str) -> bool {
        match (&self.original, self.fields.get(key)) {
            (Some(original), Some(current)) => original.get(key) != Some(current),
            (Some(original), None) => original.contains_key(key),
            (None, Some(_)) => true, // New field on create
            (None, None) => false,
        }
    }

    /// Get original data (before changes)
    pub fn original(&self) -> Option<&RowData> {
        self.original.as_ref()
    }

    /// Get original value for a specific field
    pub fn get_original(&self, key: &str) -> Option<&Value> {
        self.original.as_ref()?.get(key)
    }

    /// Get detailed changes for each field
    pub fn changes(&self) -> BTreeMap<String, FieldChange> {
        let mut changes = BTreeMap::new();

        if let Some(original) = &self.original {
            for field in &self.modified_fields {
                let old_value = original.get(field).cloned();
                let new_value = self.fields.get(field).cloned();

                let change_type = match (&old_value, &new_value) {
                    (None, Some(_)) => ChangeType::Added,
                    (Some(_), None) => ChangeType::Removed,
                    (Some(old), Some(new)) if old != new => ChangeType::Modified,
                    _ => continue, // No actual change
                };

                changes.insert(
                    field.clone(),
                    FieldChange { field: field.clone(), old_value, new_value, change_type },
                );
            }
        } else {
            // For CREATE operations, all fields are "added"
            for (field, value) in &self.fields {
                changes.insert(
                    field.clone(),
                    FieldChange {
                        field: field.clone(),
                        old_value: None,
                        new_value: Some(value.clone()),
                        change_type: ChangeType::Added,
                    },
                );
            }
        }

        changes
    }

    /// Only the fields that differ from the original, ready for an UPDATE
    pub fn changed_row(&self) -> RowData {
        self.changes()
            .into_iter()
            .filter_map(|(field, change)| change.new_value.map(|value| (field, value)))
            .collect()
    }

    // ========================================
    // Serialization
    // ========================================

    /// Current fields as a row
    pub fn to_row(&self) -> RowData {
        self.fields.clone()
    }
}
