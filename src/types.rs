//! Core types shared by the validation and dispatch layers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name for the scoring operation.
pub const ONLINE_SCORE: &str = "online_score";

/// Method name for the interests lookup operation.
pub const CLIENTS_INTERESTS: &str = "clients_interests";

/// Methods the dispatcher knows how to route.
pub const METHODS: &[&str] = &[ONLINE_SCORE, CLIENTS_INTERESTS];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Response status of a dispatched call.
///
/// Serialized as its numeric HTTP code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Status {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    InvalidRequest,
    InternalError,
}

impl Status {
    /// Returns the numeric HTTP status code.
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::InvalidRequest => 422,
            Status::InternalError => 500,
        }
    }

    /// Stock phrase used when an error response carries no message of its own.
    ///
    /// Returns `None` for success.
    pub fn phrase(&self) -> Option<&'static str> {
        match self {
            Status::Ok => None,
            Status::BadRequest => Some("Bad Request"),
            Status::Forbidden => Some("Forbidden"),
            Status::NotFound => Some("Not Found"),
            Status::InvalidRequest => Some("Invalid Request"),
            Status::InternalError => Some("Internal Server Error"),
        }
    }
}

impl From<Status> for u16 {
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl TryFrom<u16> for Status {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            200 => Ok(Status::Ok),
            400 => Ok(Status::BadRequest),
            403 => Ok(Status::Forbidden),
            404 => Ok(Status::NotFound),
            422 => Ok(Status::InvalidRequest),
            500 => Ok(Status::InternalError),
            other => Err(format!("unsupported status code {}", other)),
        }
    }
}
