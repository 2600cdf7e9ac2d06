use axum::Extension;
use serde_json::{json, Value};

use crate::api::{ids, FormatOptions};
use crate::authz::AuthContext;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::EntityKind;

use super::require_principal;

/// GET /api/auth/whoami - the principal resolved from the bearer token
///
/// ```json
/// { "success": true, "data": { "id": "QWNjb3VudDox", "username": "admin", "is_superuser": true, "is_staff": true } }
/// ```
pub async fn whoami(Extension(auth): Extension<AuthContext>) -> ApiResult<Value> {
    let principal = require_principal(&auth)?;

    let id = if FormatOptions::from_config().opaque_ids {
        Value::from(ids::encode(EntityKind::Account, principal.id))
    } else {
        Value::from(principal.id)
    };

    Ok(ApiResponse::success(json!({
        "id": id,
        "username": principal.username,
        "is_superuser": principal.is_superuser,
        "is_staff": principal.is_staff,
    })))
}
