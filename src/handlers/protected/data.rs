use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::api::{entities_to_api_value, entity_to_api_value, ids, FormatOptions};
use crate::app::AppState;
use crate::authz::AuthContext;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{CoerceError, EntityKind, FieldKind};
use crate::types::RowData;

use super::require_principal;

/// GET /api/data/:table - records of one type, ordered by id
///
/// Query parameters are equality filters on declared fields, e.g.
/// `/api/data/tasks?completed=false&project_id=3`.
pub async fn table_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(table): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Value> {
    require_principal(&auth)?;
    let kind = kind_for_table(&table)?;
    let filters = parse_filters(kind, &query)?;

    let rows: Vec<RowData> = match filters {
        Some(filters) => state
            .store
            .list(kind)
            .await?
            .into_iter()
            .filter(|row| filters.iter().all(|(name, expected)| row.get(*name).unwrap_or(&Value::Null) == expected))
            .collect(),
        None => Vec::new(),
    };
    tracing::debug!("Listed {} {} record(s) matching {} filter(s)", rows.len(), kind, query.len());

    Ok(ApiResponse::success(entities_to_api_value(kind, &rows, FormatOptions::from_config())))
}

/// GET /api/data/:table/:id - one record by numeric or opaque id
pub async fn record_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((table, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    require_principal(&auth)?;
    let kind = kind_for_table(&table)?;

    let (decoded_kind, id) = ids::decode(&Value::String(id))
        .ok_or_else(|| ApiError::bad_request("id: Invalid id."))?;
    if decoded_kind.is_some_and(|decoded| decoded != kind) {
        return Err(ApiError::not_found(format!("{} not found.", kind)));
    }

    let row = state
        .store
        .fetch(kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{} not found.", kind)))?;

    Ok(ApiResponse::success(entity_to_api_value(kind, &row, FormatOptions::from_config())))
}

/// Coerce each filter value the way a mutation argument would be.
///
/// `None` when a filter can never match (an id of another type).
fn parse_filters(
    kind: EntityKind,
    query: &BTreeMap<String, String>,
) -> Result<Option<Vec<(&'static str, Value)>>, ApiError> {
    let schema = kind.schema();
    let mut filters = Vec::with_capacity(query.len());

    for (name, raw) in query {
        let field = schema
            .field(name)
            .filter(|field| !matches!(field.kind, FieldKind::Secret))
            .ok_or_else(|| ApiError::bad_request(format!("Unknown filter field: {}", name)))?;

        match field.coerce(&Value::String(raw.clone())) {
            Ok(value) => filters.push((field.name, value)),
            Err(CoerceError::Unresolvable(_)) => return Ok(None),
            Err(CoerceError::Invalid(message)) => return Err(ApiError::bad_request(message)),
        }
    }
    Ok(Some(filters))
}

fn kind_for_table(table: &str) -> Result<EntityKind, ApiError> {
    EntityKind::from_table(table).ok_or_else(|| ApiError::not_found(format!("Unknown table: {}", table)))
}
