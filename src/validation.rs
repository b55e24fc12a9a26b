//! Identifier and field validation.
//!
//! Pure predicates (no I/O) plus the structured [`FieldError`] issue type shared
//! by the smart constructors in [`crate::models::identifiers`] and the
//! `validator`-derived request bodies in [`crate::models::book`].

use std::{borrow::Cow, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use utoipa::ToSchema;

// The `regex` crate has no look-around, so the combined ISBN-10/13 pattern is
// split into a prefix, four shape pre-checks and the group structure.
static ISBN_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ISBN(?:-1[03])?:? ").expect("valid ISBN prefix regex"));
static ISBN10_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9X]{10}$").expect("valid ISBN-10 regex"));
static ISBN10_SEPARATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[- 0-9X]{13}$").expect("valid separated ISBN-10 regex"));
static ISBN13_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^97[89][0-9]{10}$").expect("valid ISBN-13 regex"));
static ISBN13_SEPARATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[- 0-9]{17}$").expect("valid separated ISBN-13 regex"));
static THREE_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+[- ]){3}").expect("valid group regex"));
static FOUR_GROUPS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+[- ]){4}").expect("valid group regex"));
static ISBN_GROUPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:97[89][- ]?)?[0-9]{1,5}[- ]?[0-9]+[- ]?[0-9]+[- ]?[0-9X]$")
        .expect("valid ISBN group regex")
});
static BORROWER_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^user[0-9]+$").expect("valid borrower regex"));

/// Human readable rule names used in [`FieldError::expected`].
pub const EXPECTED_ISBN: &str = "ISBN-10 or ISBN-13";
pub const EXPECTED_BORROWER_ID: &str = "user<digits>";
pub const EXPECTED_UUID: &str = "uuid";
pub const EXPECTED_URL: &str = "absolute url";
pub const EXPECTED_NON_EMPTY: &str = "non-empty string";
pub const EXPECTED_DATE: &str = "ISO 8601 date or date-time";

/// Check an ISBN against the accepted ISBN-10 / ISBN-13 notations.
///
/// Only the notation is checked, the check digit is not recomputed.
pub fn is_valid_isbn(value: &str) -> bool {
    let body = match ISBN_PREFIX.find(value) {
        Some(prefix) => &value[prefix.end()..],
        None => value,
    };

    let shape_ok = ISBN10_PLAIN.is_match(body)
        || (ISBN10_SEPARATED.is_match(body) && THREE_GROUPS.is_match(body))
        || ISBN13_PLAIN.is_match(body)
        || (ISBN13_SEPARATED.is_match(body) && FOUR_GROUPS.is_match(body));

    shape_ok && ISBN_GROUPS.is_match(body)
}

/// `user` followed by one or more ASCII digits
pub fn is_valid_borrower_id(value: &str) -> bool {
    BORROWER_ID.is_match(value)
}

pub fn is_valid_catalog_id(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// RFC 3339 date-time, or a bare `YYYY-MM-DD` taken as midnight UTC
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One structured validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// Rule that failed (`invalid_string`, `too_small`, `invalid_date`, ...)
    pub code: String,
    pub expected: String,
    pub received: String,
    /// Path to the offending field in the request body
    pub path: Vec<String>,
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            expected: expected.into(),
            received: received.into(),
            path: vec![field.into()],
            message: message.into(),
        }
    }

    pub fn field(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// Convert one `validator` failure, renaming the field to its wire name.
    fn from_validator(field: &str, error: &validator::ValidationError) -> Self {
        let received = error
            .params
            .get("value")
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default();

        let expected = match error.params.get("expected") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => expected_for_code(&error.code).to_string(),
        };

        let message = error
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("Invalid {}", field));

        Self::new(field, code_for(&error.code), expected, received, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.join("."), self.message)
    }
}

fn code_for(code: &str) -> &'static str {
    match code {
        "length" => "too_small",
        "url" | "isbn" | "borrower_id" | "uuid" => "invalid_string",
        "borrowing_status" => "invalid_enum_value",
        "date" => "invalid_date",
        _ => "custom",
    }
}

fn expected_for_code(code: &str) -> &'static str {
    match code {
        "length" => EXPECTED_NON_EMPTY,
        "url" => EXPECTED_URL,
        "isbn" => EXPECTED_ISBN,
        "borrower_id" => EXPECTED_BORROWER_ID,
        "uuid" => EXPECTED_UUID,
        "date" => EXPECTED_DATE,
        _ => "valid value",
    }
}

/// Flatten `validator` output into a stable list of issues.
///
/// `wire_name` maps Rust field names to the names clients send.
pub fn collect_field_errors(
    errors: &validator::ValidationErrors,
    wire_name: fn(&str) -> &str,
) -> Vec<FieldError> {
    let mut issues: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, failures)| {
            let name = wire_name(&field).to_string();
            failures
                .iter()
                .map(move |failure| FieldError::from_validator(&name, failure))
        })
        .collect();
    issues.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.code.cmp(&b.code)));
    issues
}

fn rule_error(
    code: &'static str,
    expected: &'static str,
    message: &'static str,
    value: &str,
) -> validator::ValidationError {
    let mut error = validator::ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error.add_param(Cow::Borrowed("value"), &value);
    error.add_param(Cow::Borrowed("expected"), &expected);
    error
}

// `validator` custom rules

pub fn isbn_rule(value: &str) -> Result<(), validator::ValidationError> {
    if is_valid_isbn(value) {
        Ok(())
    } else {
        Err(rule_error("isbn", EXPECTED_ISBN, "Invalid ISBN", value))
    }
}

pub fn borrower_id_rule(value: &str) -> Result<(), validator::ValidationError> {
    if is_valid_borrower_id(value) {
        Ok(())
    } else {
        Err(rule_error(
            "borrower_id",
            EXPECTED_BORROWER_ID,
            "Invalid borrower ID",
            value,
        ))
    }
}

pub fn catalog_id_rule(value: &str) -> Result<(), validator::ValidationError> {
    if is_valid_catalog_id(value) {
        Ok(())
    } else {
        Err(rule_error("uuid", EXPECTED_UUID, "Invalid uuid", value))
    }
}

pub fn date_rule(value: &str) -> Result<(), validator::ValidationError> {
    if parse_date(value).is_some() {
        Ok(())
    } else {
        Err(rule_error("date", EXPECTED_DATE, "Invalid date", value))
    }
}

pub fn borrowing_status_rule(value: &str) -> Result<(), validator::ValidationError> {
    if crate::models::book::BorrowingStatus::parse(value).is_some() {
        Ok(())
    } else {
        Err(rule_error(
            "borrowing_status",
            "'Available' | 'Checked Out'",
            "Invalid enum value",
            value,
        ))
    }
}
