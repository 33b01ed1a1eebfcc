//! Field descriptors: typed validation rules with required/nullable policy.
//!
//! A [`Field`] pairs a [`FieldKind`] (the shape predicate and the kind's
//! empty value) with two independent policy flags:
//!
//! | Input | `required` | `nullable` | Outcome |
//! |-------|------------|------------|---------|
//! | absent or `null` | true | any | missing |
//! | absent or `null` | false | true | kind's empty value |
//! | absent or `null` | false | false | empty not allowed |
//! | equals empty value | any | true | empty value |
//! | equals empty value | any | false | empty not allowed |
//! | anything else | any | any | shape predicate decides |

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde_json::{json, Value};

use crate::types::json_type_name;

/// Date format accepted by date-like fields.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Textual shape a date must have before it is parsed.
pub const DATE_PATTERN: &str = r"^[0-9]{1,2}\.[0-9]{1,2}\.[0-9]{4}$";

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DATE_PATTERN).expect("Invalid regex pattern for dates"));

/// Oldest accepted birthday, in years before the current one.
pub const MAX_AGE_YEARS: i32 = 70;

/// Gender codes accepted by [`FieldKind::Gender`].
pub const GENDERS: &[(i64, &str)] = &[(0, "unknown"), (1, "male"), (2, "female")];

/// Kind of a field, selecting its shape predicate and empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Any string.
    Char,
    /// A JSON object holding nested method arguments.
    Arguments,
    /// A string containing `@`.
    Email,
    /// String or integer of 11 characters starting with `7`.
    Phone,
    /// String in `DD.MM.YYYY` form.
    Date,
    /// A date no more than [`MAX_AGE_YEARS`] years back.
    BirthDay,
    /// Integer gender code 0, 1 or 2.
    Gender,
    /// Array of integers, signed or unsigned 64-bit.
    ClientIds,
}

impl FieldKind {
    /// Canonical "nothing" value for this kind.
    pub fn empty_value(&self) -> Value {
        match self {
            FieldKind::Char | FieldKind::Email => json!(""),
            FieldKind::Arguments => json!({}),
            FieldKind::ClientIds => json!([]),
            FieldKind::Phone | FieldKind::Date | FieldKind::BirthDay | FieldKind::Gender => {
                Value::Null
            }
        }
    }

    /// Human-readable description of the accepted shape.
    pub fn expected(&self) -> &'static str {
        match self {
            FieldKind::Char => "string",
            FieldKind::Arguments => "object",
            FieldKind::Email => "string containing '@'",
            FieldKind::Phone => "11-character phone starting with 7",
            FieldKind::Date => "date in DD.MM.YYYY format",
            FieldKind::BirthDay => "date in DD.MM.YYYY format at most 70 years ago",
            FieldKind::Gender => "integer 0, 1 or 2",
            FieldKind::ClientIds => "array of integers",
        }
    }

    /// Shape predicate for a present, non-empty value.
    ///
    /// `today` anchors the birthday age check.
    pub fn validate(&self, value: &Value, today: NaiveDate) -> bool {
        match self {
            FieldKind::Char => value.is_string(),
            FieldKind::Arguments => value.is_object(),
            FieldKind::Email => value.as_str().is_some_and(|s| s.contains('@')),
            FieldKind::Phone => phone_digits(value)
                .is_some_and(|s| s.starts_with('7') && s.chars().count() == 11),
            FieldKind::Date => value.as_str().and_then(parse_date).is_some(),
            FieldKind::BirthDay => value
                .as_str()
                .and_then(parse_date)
                .is_some_and(|date| today.year() - date.year() <= MAX_AGE_YEARS),
            FieldKind::Gender => value
                .as_i64()
                .is_some_and(|code| GENDERS.iter().any(|(g, _)| *g == code)),
            FieldKind::ClientIds => value
                .as_array()
                .is_some_and(|ids| ids.iter().all(|id| client_id(id).is_some())),
        }
    }
}

/// Parses a `DD.MM.YYYY` date.
///
/// Signs, padding and years outside four digits are rejected.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if !DATE_SHAPE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Integer value of a client id, covering both `i64` and `u64` ranges.
pub fn client_id(value: &Value) -> Option<i128> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
}

/// Stringified form of a phone value, if it is a string or an integer.
pub fn phone_digits(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Why a single value was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Required value was absent.
    Missing,
    /// Value was the empty value but the field is not nullable.
    Empty,
    /// Value failed the kind's shape predicate.
    Invalid {
        expected: &'static str,
        actual: &'static str,
    },
}

/// A field descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
}

impl Field {
    /// An optional, non-nullable field of the given kind.
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            nullable: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Bind a raw value, returning the accepted value.
    ///
    /// `raw` is `None` when the key was not supplied. An explicit `null`
    /// is treated the same way.
    pub fn bind(&self, raw: Option<&Value>, today: NaiveDate) -> Result<Value, Violation> {
        let value = match raw {
            None | Some(Value::Null) if self.required => return Err(Violation::Missing),
            None | Some(Value::Null) => self.kind.empty_value(),
            Some(v) => v.clone(),
        };

        if value == self.kind.empty_value() {
            return if self.nullable {
                Ok(value)
            } else {
                Err(Violation::Empty)
            };
        }

        if self.kind.validate(&value, today) {
            Ok(value)
        } else {
            Err(Violation::Invalid {
                expected: self.kind.expected(),
                actual: json_type_name(&value),
            })
        }
    }
}
