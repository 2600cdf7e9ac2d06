// Postgres-backed EntityStore.
//
// Rows travel as JSON: every read wraps the projection in row_to_json so one
// code path serves all entity kinds. Values are bound as text and cast to the
// column type declared by the entity schema.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::manager::DatabaseError;
use crate::database::store::{EntityStore, StoreTransaction};
use crate::schema::field::{format_datetime, parse_datetime};
use crate::schema::{EntityKind, FieldKind};
use crate::types::{EntityId, RowData};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Comma separated column list for a kind, `id` first
fn column_list(kind: EntityKind) -> String {
    kind.schema().columns().join(", ")
}

fn select_by_id(kind: EntityKind, lock: bool) -> String {
    format!(
        "SELECT row_to_json(t) FROM (SELECT {} FROM {} WHERE id = $1{}) t",
        column_list(kind),
        kind.table(),
        if lock { " FOR UPDATE" } else { "" }
    )
}

/// Postgres type a text parameter is cast to before it reaches the column
fn cast_for(kind: EntityKind, column: &str) -> &'static str {
    if column == "id" {
        return "bigint";
    }
    match kind.schema().field(column).map(|field| field.kind) {
        Some(FieldKind::Date) => "date",
        Some(FieldKind::DateTime) => "timestamptz",
        Some(FieldKind::Bool) => "boolean",
        Some(FieldKind::Reference(_)) => "bigint",
        _ => "text",
    }
}

/// Text form of a JSON value for binding; null stays SQL NULL
fn bind_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Unwrap a row_to_json value, rewriting instants into the form field coercion produces
fn into_row(kind: EntityKind, value: Value) -> Result<RowData, DatabaseError> {
    let mut row = match value {
        Value::Object(map) => map,
        other => return Err(DatabaseError::QueryError(format!("expected a JSON row, got {}", other))),
    };

    for field in kind.schema().fields.iter().filter(|f| matches!(f.kind, FieldKind::DateTime)) {
        if let Some(Value::String(text)) = row.get(field.name) {
            if let Some(instant) = parse_datetime(text) {
                row.insert(field.name.to_string(), Value::String(format_datetime(&instant)));
            }
        }
    }
    Ok(row)
}

/// Columns of `row` the schema knows about, skipping `id`
fn writable_columns(kind: EntityKind, row: &RowData) -> Vec<(&'static str, Option<String>)> {
    kind.schema()
        .fields
        .iter()
        .filter_map(|field| row.get(field.name).map(|value| (field.name, bind_text(value))))
        .collect()
}

#[async_trait]
impl EntityStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn fetch(&self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError> {
        let sql = select_by_id(kind, false);
        let row: Option<Value> = sqlx::query_scalar(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(|value| into_row(kind, value)).transpose()
    }

    async fn list(&self, kind: EntityKind) -> Result<Vec<RowData>, DatabaseError> {
        let sql = format!(
            "SELECT row_to_json(t) FROM (SELECT {} FROM {} ORDER BY id) t",
            column_list(kind),
            kind.table()
        );
        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(|value| into_row(kind, value)).collect()
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn fetch(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError> {
        let sql = select_by_id(kind, false);
        let row: Option<Value> = sqlx::query_scalar(&sql).bind(id).fetch_optional(&mut *self.tx).await?;
        row.map(|value| into_row(kind, value)).transpose()
    }

    async fn fetch_for_update(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<RowData>, DatabaseError> {
        let sql = select_by_id(kind, true);
        let row: Option<Value> = sqlx::query_scalar(&sql).bind(id).fetch_optional(&mut *self.tx).await?;
        row.map(|value| into_row(kind, value)).transpose()
    }

    async fn exists_with(
        &mut self,
        kind: EntityKind,
        field: &str,
        value: &Value,
        exclude_id: Option<EntityId>,
    ) -> Result<bool, DatabaseError> {
        // Column names only ever come from the static schema
        let column = kind
            .schema()
            .field(field)
            .map(|f| f.name)
            .ok_or_else(|| DatabaseError::QueryError(format!("unknown column {}.{}", kind.table(), field)))?;

        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = $1::text::{} AND ($2::bigint IS NULL OR id <> $2))",
            kind.table(),
            column,
            cast_for(kind, column)
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(bind_text(value))
            .bind(exclude_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(exists)
    }

    async fn insert(&mut self, kind: EntityKind, row: &RowData) -> Result<RowData, DatabaseError> {
        // Nulls are left out so column defaults apply
        let columns: Vec<_> = writable_columns(kind, row)
            .into_iter()
            .filter(|(_, value)| value.is_some())
            .collect();

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let placeholders: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("${}::text::{}", i + 1, cast_for(kind, name)))
            .collect();

        let sql = if columns.is_empty() {
            format!(
                "WITH inserted AS (INSERT INTO {} DEFAULT VALUES RETURNING {}) SELECT row_to_json(inserted) FROM inserted",
                kind.table(),
                column_list(kind)
            )
        } else {
            format!(
                "WITH inserted AS (INSERT INTO {} ({}) VALUES ({}) RETURNING {}) SELECT row_to_json(inserted) FROM inserted",
                kind.table(),
                names.join(", "),
                placeholders.join(", "),
                column_list(kind)
            )
        };

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in columns {
            query = query.bind(value);
        }
        let stored = query.fetch_one(&mut *self.tx).await?;
        into_row(kind, stored)
    }

    async fn update(&mut self, kind: EntityKind, id: EntityId, changes: &RowData) -> Result<RowData, DatabaseError> {
        let columns = writable_columns(kind, changes);
        if columns.is_empty() {
            return self
                .fetch(kind, id)
                .await?
                .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", kind, id)));
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, (name, _))| format!("{} = ${}::text::{}", name, i + 1, cast_for(kind, name)))
            .collect();

        let sql = format!(
            "WITH updated AS (UPDATE {} SET {} WHERE id = ${} RETURNING {}) SELECT row_to_json(updated) FROM updated",
            kind.table(),
            assignments.join(", "),
            columns.len() + 1,
            column_list(kind)
        );

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in columns {
            query = query.bind(value);
        }
        let stored = query
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", kind, id)))?;
        into_row(kind, stored)
    }

    async fn delete(&mut self, kind: EntityKind, id: EntityId) -> Result<bool, DatabaseError> {
        // Dependants go with it through ON DELETE CASCADE
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_locks_only_when_asked() {
        let plain = select_by_id(EntityKind::Project, false);
        assert!(plain.starts_with("SELECT row_to_json(t) FROM (SELECT id, name, description, cleiton_id"));
        assert!(!plain.contains("FOR UPDATE"));
        assert!(select_by_id(EntityKind::Project, true).ends_with("WHERE id = $1 FOR UPDATE) t"));
    }

    #[test]
    fn casts_follow_field_kinds() {
        assert_eq!(cast_for(EntityKind::Project, "start_date"), "date");
        assert_eq!(cast_for(EntityKind::Task, "due_date"), "timestamptz");
        assert_eq!(cast_for(EntityKind::Task, "completed"), "boolean");
        assert_eq!(cast_for(EntityKind::Task, "project_id"), "bigint");
        assert_eq!(cast_for(EntityKind::Task, "title"), "text");
        assert_eq!(cast_for(EntityKind::Task, "id"), "bigint");
    }

    #[test]
    fn binds_values_as_text() {
        assert_eq!(bind_text(&json!(true)), Some("true".to_string()));
        assert_eq!(bind_text(&json!(12)), Some("12".to_string()));
        assert_eq!(bind_text(&json!("open")), Some("open".to_string()));
        assert_eq!(bind_text(&Value::Null), None);
    }

    #[test]
    fn instants_read_back_in_canonical_form() {
        let session_text = json!({ "id": 3, "title": "Review", "start_time": "2030-01-01T07:00:00.5-03:00", "end_time": null });
        let row = into_row(EntityKind::Event, session_text).unwrap();

        let canonical = format_datetime(&parse_datetime("2030-01-01T10:00:00.5Z").unwrap());
        assert_eq!(row["start_time"], json!(canonical));
        assert_eq!(row["end_time"], Value::Null);
        assert_eq!(row["title"], "Review");

        assert!(into_row(EntityKind::Event, json!([1])).is_err());
    }

    #[test]
    fn ignores_undeclared_columns() {
        let row = json!({ "name": "Site", "bogus": 1, "id": 9 }).as_object().cloned().unwrap();
        let columns = writable_columns(EntityKind::Project, &row);
        assert_eq!(columns, vec![("name", Some("Site".to_string()))]);
    }
}
