use thiserror::Error;

use crate::database::{DatabaseError, RecordError};
use crate::schema::EntityKind;

/// Mutation failure taxonomy; `Display` is the text placed in the envelope
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MutationError {
    #[error("Authentication required.")]
    Unauthenticated,

    #[error("Permission denied.")]
    PermissionDenied,

    #[error("{0} not found.")]
    NotFound(EntityKind),

    #[error("{}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// The detail is for logs only
    #[error("An unexpected error occurred.")]
    Unexpected(String),
}

impl MutationError {
    pub fn validation(message: impl Into<String>) -> Self {
        MutationError::ValidationFailed(vec![message.into()])
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        MutationError::Unexpected(detail.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MutationError::ValidationFailed(_))
    }

    /// Fold the errors collected by one ring into the one reported.
    ///
    /// Anything other than a validation failure wins outright; validation
    /// messages are concatenated in order.
    pub fn merge(errors: Vec<MutationError>) -> Option<MutationError> {
        if let Some(fatal) = errors.iter().find(|error| !error.is_validation()) {
            return Some(fatal.clone());
        }

        let messages: Vec<String> = errors
            .into_iter()
            .flat_map(|error| match error {
                MutationError::ValidationFailed(messages) => messages,
                _ => Vec::new(),
            })
            .collect();

        (!messages.is_empty()).then_some(MutationError::ValidationFailed(messages))
    }
}

/// A malformed argument bag is reported like any other invalid input
impl From<RecordError> for MutationError {
    fn from(error: RecordError) -> Self {
        MutationError::validation(error.to_string())
    }
}

impl From<DatabaseError> for MutationError {
    fn from(error: DatabaseError) -> Self {
        MutationError::Unexpected(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(MutationError::PermissionDenied.to_string(), "Permission denied.");
        assert_eq!(MutationError::NotFound(EntityKind::Cleiton).to_string(), "Cleiton not found.");
        assert_eq!(
            MutationError::Unexpected("connection reset".into()).to_string(),
            "An unexpected error occurred."
        );
        let failed = MutationError::ValidationFailed(vec!["a: x".into(), "b: y".into()]);
        assert_eq!(failed.to_string(), "a: x; b: y");
    }

    #[test]
    fn merge_concatenates_validation_messages() {
        let merged = MutationError::merge(vec![
            MutationError::validation("name: This field is required."),
            MutationError::validation("email: Enter a valid email address."),
        ]);
        assert_eq!(
            merged,
            Some(MutationError::ValidationFailed(vec![
                "name: This field is required.".into(),
                "email: Enter a valid email address.".into(),
            ]))
        );
    }

    #[test]
    fn merge_prefers_fatal_errors() {
        let merged = MutationError::merge(vec![
            MutationError::validation("name: This field is required."),
            MutationError::unexpected("timeout"),
        ]);
        assert!(matches!(merged, Some(MutationError::Unexpected(_))));
        assert_eq!(MutationError::merge(Vec::new()), None);
    }
}
