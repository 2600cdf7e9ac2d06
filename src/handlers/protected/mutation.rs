use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::authz::AuthContext;
use crate::database::Record;
use crate::error::ApiError;
use crate::observer::{MutationError, MutationRequest};

/// POST /api/mutations/:name - run one named mutation
///
/// Always answers 200 with the mutation envelope once the name is known;
/// the caller inspects `success`, not the status code.
pub async fn mutate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (operation, kind) = MutationRequest::parse_name(&name)
        .ok_or_else(|| ApiError::bad_request(format!("Unknown mutation: {}", name)))?;

    let arguments = body
        .map_err(|rejection| MutationError::validation(rejection.body_text()))
        .and_then(|Json(body)| Record::arguments_from_json(body).map_err(MutationError::from));

    let envelope = match arguments {
        Ok(arguments) => {
            state
                .pipeline
                .execute(&auth, MutationRequest::new(operation, kind, arguments))
                .await
        }
        Err(error) => state.pipeline.reject(&auth, kind, operation, error),
    };
    Ok(Json(envelope.to_json()))
}
