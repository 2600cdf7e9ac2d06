use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use crate::app::AppState;
use crate::auth::verify_jwt;
use crate::authz::{AuthContext, Principal};
use crate::database::EntityStore;
use crate::schema::EntityKind;

/// Resolve the acting principal for every request.
///
/// Never rejects: a missing or bad token leaves the request anonymous, and the
/// handlers decide what an anonymous caller may see.
pub async fn resolve_principal(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let auth = match bearer_token(request.headers()) {
        Some(token) => authenticate(state.store.as_ref(), token).await,
        None => AuthContext::Anonymous,
    };

    request.extensions_mut().insert(auth);
    next.run(request).await
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

async fn authenticate(store: &dyn EntityStore, token: &str) -> AuthContext {
    let claims = match verify_jwt(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Ignoring bearer token: {}", e);
            return AuthContext::Anonymous;
        }
    };

    // Role flags come from the store, not the token, so a demotion applies at once
    let row = match store.fetch(EntityKind::Account, claims.sub).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            tracing::info!("Token for unknown account {}", claims.sub);
            return AuthContext::Anonymous;
        }
        Err(e) => {
            tracing::error!("Failed to load account {}: {}", claims.sub, e);
            return AuthContext::Anonymous;
        }
    };

    let flag = |name: &str| row.get(name).and_then(Value::as_bool).unwrap_or(false);
    AuthContext::Authenticated(Principal {
        id: claims.sub,
        username: row
            .get("username")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(claims.username),
        is_superuser: flag("is_superuser"),
        is_staff: flag("is_staff"),
    })
}
