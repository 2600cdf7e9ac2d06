use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::schema::EntityKind;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let mutations: Vec<String> = EntityKind::ALL
        .iter()
        .map(|kind| format!("create{0}, update{0}, delete{0}", kind.type_name()))
        .collect();
    let tables: Vec<&str> = EntityKind::ALL.iter().map(|kind| kind.table()).collect();

    Json(json!({
        "success": true,
        "data": {
            "name": "Project Management API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "whoami": "/api/auth/whoami (protected)",
                "mutations": "/api/mutations/:name (POST, result envelope)",
                "data": "/api/data/:table[/:id] (protected)",
            },
            "mutations": mutations,
            "tables": tables,
        }
    }))
}

/// GET /health - ping the store
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": backend
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed on {}: {}", backend, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": backend
                    }
                })),
            )
        }
    }
}
