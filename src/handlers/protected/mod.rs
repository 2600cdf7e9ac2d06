// Endpoints that read the resolved principal from request extensions.
// `resolve_principal` must be layered on every route declared here.

pub mod auth;
pub mod data;
pub mod mutation;

pub use auth::whoami;
pub use data::{record_get, table_get};
pub use mutation::mutate;

use crate::authz::{AuthContext, Principal};
use crate::error::ApiError;

/// The authenticated principal, or 401
pub(crate) fn require_principal(auth: &AuthContext) -> Result<&Principal, ApiError> {
    auth.principal()
        .ok_or_else(|| ApiError::unauthorized("Authentication required."))
}
