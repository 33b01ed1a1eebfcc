//! Scoring API
//!
//! Request validation and method dispatch for a small JSON-over-HTTP API.
//!
//! A caller posts an envelope naming a method and its arguments. The envelope
//! is validated against a declarative schema, the caller's token is checked,
//! and the arguments are validated against the method's own schema before
//! the scoring or interests lookup runs.
//!
//! # Example
//!
//! ```
//! use scoring_api::{method_handler, CallContext, MemoryStore, Principal, Status};
//! use serde_json::json;
//!
//! let mut ctx = CallContext::new("req-1");
//! let token = Principal::new("horns&hoofs", "h&f").expected_token(ctx.received_at);
//! let body = json!({
//!     "account": "horns&hoofs",
//!     "login": "h&f",
//!     "token": token,
//!     "method": "online_score",
//!     "arguments": {"phone": "79175002040", "email": "a@b.ru"}
//! });
//!
//! let store = MemoryStore::new();
//! let response = method_handler(body.as_object().unwrap(), &mut ctx, &store);
//!
//! assert_eq!(response.status, Status::Ok);
//! assert_eq!(response.body["score"], json!(3.0));
//! assert!(ctx.has.contains("phone") && ctx.has.contains("email"));
//! ```
//!
//! # Field Policy
//!
//! | Input | required | nullable | Result |
//! |-------|----------|----------|--------|
//! | absent | yes | - | missing field (422) |
//! | absent | no | yes | kind's empty value |
//! | empty value | - | no | empty not allowed (422) |
//! | other | - | - | kind's shape predicate |
//!
//! # Status Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 200 | OK |
//! | 400 | malformed transport payload |
//! | 403 | token check failed |
//! | 404 | unknown route or method |
//! | 422 | envelope or argument validation failed |
//! | 500 | unexpected failure |

mod auth;
mod config;
mod dispatch;
mod error;
mod export;
mod field;
mod schema;
mod scoring;
mod server;
mod store;
mod types;

pub use auth::{check_auth, Principal, ADMIN_SALT, SALT};
pub use config::ServerConfig;
pub use dispatch::{dispatch, method_handler, CallContext, Response, ADMIN_SCORE};
pub use error::{ApiError, ValidationError};
pub use export::to_json_schema;
pub use field::{Field, FieldKind, Violation, DATE_FORMAT, GENDERS, MAX_AGE_YEARS};
pub use schema::{
    arguments_schema, Bound, ClientsInterestsRequest, HasSet, Invariant, MethodRequest,
    OnlineScoreRequest, Request, Schema, ADMIN_LOGIN, CLIENTS_INTERESTS_REQUEST, METHOD_REQUEST,
    ONLINE_SCORE_REQUEST, SCORE_PAIRS,
};
pub use scoring::{get_interests, get_score, INTERESTS, SCORE_TTL};
pub use server::{build_router, serve, AppState};
pub use store::{MemoryStore, Store, SWEEP_INTERVAL};
pub use types::{json_type_name, Status, CLIENTS_INTERESTS, METHODS, ONLINE_SCORE};
