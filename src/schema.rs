//! Request schemas: ordered field descriptors bound by one generic binder.
//!
//! A [`Schema`] is plain data: a name, an ordered list of `(name, Field)`
//! pairs and an optional cross-field [`Invariant`] over the set of supplied
//! keys. [`Schema::bind`] validates a raw JSON object against it, failing
//! on the first rejected field. Typed requests implement [`Request`] to
//! turn a [`Bound`] payload into a struct.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::field::{client_id, parse_date, phone_digits, Field, FieldKind, Violation};
use crate::types::{CLIENTS_INTERESTS, ONLINE_SCORE};

/// Login that switches the auth check and scoring to admin mode.
pub const ADMIN_LOGIN: &str = "admin";

/// Names of declared fields that were present in the input.
pub type HasSet = BTreeSet<&'static str>;

/// Cross-field rule evaluated after every field bound successfully.
#[derive(Debug, Clone, Copy)]
pub struct Invariant {
    /// Description used in the error message and in exported schemas.
    pub rule: &'static str,
    pub check: fn(&HasSet) -> bool,
}

/// A named, ordered set of field descriptors.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [(&'static str, Field)],
    pub invariant: Option<Invariant>,
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [(&'static str, Field)]) -> Self {
        Self {
            name,
            fields,
            invariant: None,
        }
    }

    pub const fn with_invariant(mut self, rule: &'static str, check: fn(&HasSet) -> bool) -> Self {
        self.invariant = Some(Invariant { rule, check });
        self
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(field_name, _)| *field_name == name)
            .map(|(_, field)| field)
    }

    /// Validate a raw payload against this schema.
    ///
    /// Fields are bound in declaration order; the first failure aborts.
    /// Keys not declared by the schema are ignored. `today` anchors
    /// date-relative checks.
    ///
    /// # Errors
    ///
    /// Returns the first field's `ValidationError`, or
    /// `ValidationError::SchemaInvariant` if the cross-field rule fails.
    pub fn bind(&self, raw: &Map<String, Value>, today: NaiveDate) -> Result<Bound, ValidationError> {
        let mut values = Map::new();
        let mut has = HasSet::new();

        for (name, field) in self.fields {
            let supplied = raw.get(*name);
            if supplied.is_some() {
                has.insert(*name);
            }
            let value = field
                .bind(supplied, today)
                .map_err(|violation| self.violation_error(name, violation))?;
            values.insert((*name).to_string(), value);
        }

        if let Some(invariant) = &self.invariant {
            if !(invariant.check)(&has) {
                return Err(ValidationError::SchemaInvariant {
                    schema: self.name.to_string(),
                    rule: invariant.rule.to_string(),
                });
            }
        }

        Ok(Bound { values, has })
    }

    fn violation_error(&self, field: &str, violation: Violation) -> ValidationError {
        let schema = self.name.to_string();
        let field = field.to_string();
        match violation {
            Violation::Missing => ValidationError::MissingRequiredField { schema, field },
            Violation::Empty => ValidationError::EmptyNotAllowed { schema, field },
            Violation::Invalid { expected, actual } => ValidationError::InvalidFieldValue {
                schema,
                field,
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
        }
    }
}

/// A payload that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// Accepted value for every declared field, empty values included.
    pub values: Map<String, Value>,
    pub has: HasSet,
}

impl Bound {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String value, or `""` for the empty value.
    fn text(&self, name: &str) -> String {
        self.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Non-empty string value.
    fn non_empty_text(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    fn date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).and_then(Value::as_str).and_then(parse_date)
    }
}

/// A typed request built from a schema-validated payload.
pub trait Request: Sized {
    fn schema() -> &'static Schema;

    fn from_bound(bound: Bound) -> Self;

    /// Validate `raw` against [`Request::schema`] and build the request.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any field or the cross-field rule fails.
    fn parse(raw: &Map<String, Value>, today: NaiveDate) -> Result<Self, ValidationError> {
        Self::schema().bind(raw, today).map(Self::from_bound)
    }
}

// === Envelope ===

const METHOD_FIELDS: &[(&str, Field)] = &[
    ("account", Field::new(FieldKind::Char).nullable()),
    ("login", Field::new(FieldKind::Char).required().nullable()),
    ("token", Field::new(FieldKind::Char).required().nullable()),
    ("arguments", Field::new(FieldKind::Arguments).required().nullable()),
    ("method", Field::new(FieldKind::Char).required()),
];

pub static METHOD_REQUEST: Schema = Schema::new("MethodRequest", METHOD_FIELDS);

/// The authenticated call envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRequest {
    pub account: String,
    pub login: String,
    pub token: String,
    pub method: String,
    pub arguments: Map<String, Value>,
    pub has: HasSet,
}

impl MethodRequest {
    pub fn is_admin(&self) -> bool {
        self.login == ADMIN_LOGIN
    }
}

impl Request for MethodRequest {
    fn schema() -> &'static Schema {
        &METHOD_REQUEST
    }

    fn from_bound(bound: Bound) -> Self {
        let arguments = match bound.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        Self {
            account: bound.text("account"),
            login: bound.text("login"),
            token: bound.text("token"),
            method: bound.text("method"),
            arguments,
            has: bound.has,
        }
    }
}

// === online_score ===

/// Field pairs of which at least one must be fully supplied for scoring.
pub const SCORE_PAIRS: &[(&str, &str)] = &[
    ("phone", "email"),
    ("first_name", "last_name"),
    ("gender", "birthday"),
];

fn has_score_pair(has: &HasSet) -> bool {
    SCORE_PAIRS
        .iter()
        .any(|(a, b)| has.contains(a) && has.contains(b))
}

const ONLINE_SCORE_FIELDS: &[(&str, Field)] = &[
    ("first_name", Field::new(FieldKind::Char).nullable()),
    ("last_name", Field::new(FieldKind::Char).nullable()),
    ("email", Field::new(FieldKind::Email).nullable()),
    ("phone", Field::new(FieldKind::Phone).nullable()),
    ("birthday", Field::new(FieldKind::BirthDay).nullable()),
    ("gender", Field::new(FieldKind::Gender).nullable()),
];

pub static ONLINE_SCORE_REQUEST: Schema = Schema::new("OnlineScoreRequest", ONLINE_SCORE_FIELDS)
    .with_invariant(
        "at least one of phone+email, first_name+last_name, gender+birthday must be present",
        has_score_pair,
    );

/// Arguments of the `online_score` method.
#[derive(Debug, Clone, PartialEq)]
pub struct OnlineScoreRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<i64>,
    pub has: HasSet,
}

impl Request for OnlineScoreRequest {
    fn schema() -> &'static Schema {
        &ONLINE_SCORE_REQUEST
    }

    fn from_bound(bound: Bound) -> Self {
        Self {
            first_name: bound.non_empty_text("first_name"),
            last_name: bound.non_empty_text("last_name"),
            email: bound.non_empty_text("email"),
            phone: bound.get("phone").and_then(phone_digits),
            birthday: bound.date("birthday"),
            gender: bound.get("gender").and_then(Value::as_i64),
            has: bound.has,
        }
    }
}

// === clients_interests ===

const CLIENTS_INTERESTS_FIELDS: &[(&str, Field)] = &[
    ("client_ids", Field::new(FieldKind::ClientIds).required()),
    ("date", Field::new(FieldKind::Date).nullable()),
];

pub static CLIENTS_INTERESTS_REQUEST: Schema =
    Schema::new("ClientsInterestsRequest", CLIENTS_INTERESTS_FIELDS);

/// Arguments of the `clients_interests` method.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientsInterestsRequest {
    /// In request order, duplicates kept.
    pub client_ids: Vec<i128>,
    pub date: Option<NaiveDate>,
    pub has: HasSet,
}

impl Request for ClientsInterestsRequest {
    fn schema() -> &'static Schema {
        &CLIENTS_INTERESTS_REQUEST
    }

    fn from_bound(bound: Bound) -> Self {
        let client_ids = bound
            .get("client_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(client_id).collect())
            .unwrap_or_default();
        Self {
            client_ids,
            date: bound.date("date"),
            has: bound.has,
        }
    }
}

/// Arguments schema for a method name.
pub fn arguments_schema(method: &str) -> Option<&'static Schema> {
    match method {
        ONLINE_SCORE => Some(&ONLINE_SCORE_REQUEST),
        CLIENTS_INTERESTS => Some(&CLIENTS_INTERESTS_REQUEST),
        _ => None,
    }
}
