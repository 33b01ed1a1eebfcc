//! Error types for request validation and method dispatch.

use thiserror::Error;

use crate::types::Status;

/// Errors raised while binding a payload against a schema.
///
/// Messages name the schema and field but never echo the rejected value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field {field} in {schema} is not provided")]
    MissingRequiredField { schema: String, field: String },

    #[error("field {field} in {schema} must not be empty")]
    EmptyNotAllowed { schema: String, field: String },

    #[error("value of field {field} in {schema} is not valid: expected {expected}, got {actual}")]
    InvalidFieldValue {
        schema: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("invalid arguments for {schema}: {rule}")]
    SchemaInvariant { schema: String, rule: String },
}

impl ValidationError {
    /// Name of the field that failed, if the error is field-scoped.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field, .. }
            | Self::EmptyNotAllowed { field, .. }
            | Self::InvalidFieldValue { field, .. } => Some(field),
            Self::SchemaInvariant { .. } => None,
        }
    }
}

/// Errors surfaced by the dispatcher and the transport shell.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // Generic on purpose: which credential part was wrong is not reported.
    #[error("Forbidden")]
    Forbidden,

    #[error("Method not found")]
    MethodNotFound { method: String },

    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Internal { message: String },
}

impl ApiError {
    /// Returns the response status for this error type.
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::InvalidRequest,
            ApiError::Forbidden => Status::Forbidden,
            ApiError::MethodNotFound { .. } => Status::NotFound,
            ApiError::BadRequest { .. } => Status::BadRequest,
            ApiError::Internal { .. } => Status::InternalError,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_statuses() {
        let err = ApiError::from(ValidationError::EmptyNotAllowed {
            schema: "MethodRequest".into(),
            field: "method".into(),
        });
        assert_eq!(err.status(), Status::InvalidRequest);

        assert_eq!(ApiError::Forbidden.status(), Status::Forbidden);

        let err = ApiError::MethodNotFound {
            method: "drop_tables".into(),
        };
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.to_string(), "Method not found");

        assert_eq!(ApiError::internal("boom").status(), Status::InternalError);
    }

    #[test]
    fn validation_messages_name_field_and_schema() {
        let err = ValidationError::MissingRequiredField {
            schema: "MethodRequest".into(),
            field: "login".into(),
        };
        assert_eq!(
            err.to_string(),
            "required field login in MethodRequest is not provided"
        );
        assert_eq!(err.field(), Some("login"));

        let err = ValidationError::SchemaInvariant {
            schema: "OnlineScoreRequest".into(),
            rule: "need a pair".into(),
        };
        assert_eq!(err.field(), None);
        assert!(err.to_string().contains("OnlineScoreRequest"));
    }

    #[test]
    fn forbidden_message_is_generic() {
        assert_eq!(ApiError::Forbidden.to_string(), "Forbidden");
    }
}
