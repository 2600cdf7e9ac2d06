pub mod auth;
pub mod response;

pub use auth::{bearer_token, resolve_principal};
pub use response::{ApiResponse, ApiResult};
