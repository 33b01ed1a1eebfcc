//! Method dispatch: envelope validation, auth gate, and per-method routing.
//!
//! [`method_handler`] is the whole core call chain for one request. It is
//! synchronous, touches nothing but its arguments, and never panics on bad
//! input: every validation failure becomes a 422 response here.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, warn};

use crate::auth::check_auth;
use crate::error::ApiError;
use crate::schema::{ClientsInterestsRequest, HasSet, MethodRequest, OnlineScoreRequest, Request};
use crate::scoring::{get_interests, get_score};
use crate::store::Store;
use crate::types::{Status, CLIENTS_INTERESTS, ONLINE_SCORE};

/// Score returned to the admin without consulting the scorer.
pub const ADMIN_SCORE: i64 = 42;

/// Per-call diagnostic record, written by the dispatcher.
#[derive(Debug, Clone, Serialize)]
pub struct CallContext {
    pub request_id: String,
    /// Instant the call was received; anchors auth and date checks.
    #[serde(skip)]
    pub received_at: DateTime<Utc>,
    /// Argument fields the caller supplied.
    pub has: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nclients: Option<usize>,
}

impl CallContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self::at(request_id, Utc::now())
    }

    pub fn at(request_id: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            request_id: request_id.into(),
            received_at,
            has: BTreeSet::new(),
            nclients: None,
        }
    }

    fn record_has(&mut self, has: &HasSet) {
        self.has = has.iter().map(|name| (*name).to_string()).collect();
    }
}

/// Response body and status produced by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub body: Value,
    pub status: Status,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self {
            body,
            status: Status::Ok,
        }
    }

    /// Error response with a `{"error": message}` body.
    pub fn error(status: Status, message: impl Into<String>) -> Self {
        Self {
            body: json!({ "error": message.into() }),
            status,
        }
    }

    /// Wire envelope: `{"response", "code"}` on success, `{"error", "code"}` otherwise.
    ///
    /// The error text is the body's `error` message, or the status' stock
    /// phrase when the body carries none.
    pub fn envelope(&self) -> Value {
        let code = self.status.code();
        match self.status.phrase() {
            None => json!({ "response": self.body, "code": code }),
            Some(phrase) => {
                let message = self
                    .body
                    .get("error")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(phrase);
                json!({ "error": message, "code": code })
            }
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        match err {
            // Transport and internal detail stays in the logs.
            ApiError::BadRequest { .. } | ApiError::Internal { .. } => {
                Response::error(status, status.phrase().unwrap_or_default())
            }
            other => Response::error(status, other.to_string()),
        }
    }
}

/// Validates, authenticates and routes one method call.
pub fn method_handler(body: &Map<String, Value>, ctx: &mut CallContext, store: &dyn Store) -> Response {
    match dispatch(body, ctx, store) {
        Ok(body) => Response::ok(body),
        Err(err) => {
            match &err {
                ApiError::Validation(e) => warn!(request_id = %ctx.request_id, "Validation error: {}", e),
                ApiError::Forbidden => warn!(request_id = %ctx.request_id, "Forbidden"),
                ApiError::MethodNotFound { method } => {
                    warn!(request_id = %ctx.request_id, "Method not found: {}", method)
                }
                ApiError::BadRequest { message } | ApiError::Internal { message } => {
                    error!(request_id = %ctx.request_id, "{}", message)
                }
            }
            Response::from(err)
        }
    }
}

/// Core call chain behind [`method_handler`].
///
/// # Errors
///
/// Returns `ApiError::Validation` for envelope or argument failures,
/// `ApiError::Forbidden` for a bad token, `ApiError::MethodNotFound` for an
/// unknown method, and `ApiError::Internal` if the store holds bad data.
pub fn dispatch(
    body: &Map<String, Value>,
    ctx: &mut CallContext,
    store: &dyn Store,
) -> Result<Value, ApiError> {
    let today = ctx.received_at.date_naive();
    let request = MethodRequest::parse(body, today)?;
    ctx.has.clear();

    if !check_auth(&request, ctx.received_at) {
        return Err(ApiError::Forbidden);
    }
    debug!(request_id = %ctx.request_id, method = %request.method, admin = request.is_admin(), "authenticated");

    match request.method.as_str() {
        ONLINE_SCORE => online_score(&request, ctx, store),
        CLIENTS_INTERESTS => clients_interests(&request, ctx, store),
        other => Err(ApiError::MethodNotFound {
            method: other.to_string(),
        }),
    }
}

fn online_score(
    request: &MethodRequest,
    ctx: &mut CallContext,
    store: &dyn Store,
) -> Result<Value, ApiError> {
    if request.is_admin() {
        return Ok(json!({ "score": ADMIN_SCORE }));
    }

    let args = OnlineScoreRequest::parse(&request.arguments, ctx.received_at.date_naive())?;
    ctx.record_has(&args.has);

    let score = get_score(
        store,
        args.phone.as_deref(),
        args.email.as_deref(),
        args.birthday,
        args.gender,
        args.first_name.as_deref(),
        args.last_name.as_deref(),
    );
    Ok(json!({ "score": score }))
}

fn clients_interests(
    request: &MethodRequest,
    ctx: &mut CallContext,
    store: &dyn Store,
) -> Result<Value, ApiError> {
    let args = ClientsInterestsRequest::parse(&request.arguments, ctx.received_at.date_naive())?;
    ctx.record_has(&args.has);
    ctx.nclients = Some(args.client_ids.len());

    let mut interests = Map::new();
    for client_id in &args.client_ids {
        let labels = get_interests(store, *client_id).map_err(|e| {
            ApiError::internal(format!("bad interests entry for client {}: {}", client_id, e))
        })?;
        interests.insert(client_id.to_string(), json!(labels));
    }
    Ok(Value::Object(interests))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn success_envelope() {
        let response = Response::ok(json!({"score": 3.0}));
        assert_eq!(
            response.envelope(),
            json!({"response": {"score": 3.0}, "code": 200})
        );
    }

    #[test]
    fn error_envelope_uses_message_or_phrase() {
        let response = Response::error(Status::Forbidden, "Forbidden");
        assert_eq!(response.envelope(), json!({"error": "Forbidden", "code": 403}));

        let response = Response {
            body: json!({}),
            status: Status::BadRequest,
        };
        assert_eq!(response.envelope(), json!({"error": "Bad Request", "code": 400}));
    }

    #[test]
    fn internal_errors_are_flattened() {
        let response = Response::from(ApiError::internal("secret detail"));
        assert_eq!(response.status, Status::InternalError);
        assert_eq!(response.body, json!({"error": "Internal Server Error"}));
    }

    #[test]
    fn corrupt_store_entry_is_internal_error() {
        let store = MemoryStore::new();
        store.set("i:1", "{broken");
        let user = crate::auth::Principal::new("a", "b");
        let mut ctx = CallContext::new("test");
        let body = json!({
            "account": "a",
            "login": "b",
            "token": user.expected_token(ctx.received_at),
            "method": "clients_interests",
            "arguments": {"client_ids": [1]}
        });
        let Value::Object(body) = body else { unreachable!() };

        let response = method_handler(&body, &mut ctx, &store);
        assert_eq!(response.status, Status::InternalError);
    }

    #[test]
    fn context_serializes_without_timestamp() {
        let mut ctx = CallContext::new("abc");
        ctx.has.insert("phone".into());
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value, json!({"request_id": "abc", "has": ["phone"]}));
    }
}
