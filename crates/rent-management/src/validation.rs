//! Field-level validation for JSON request bodies and query strings.
//!
//! Messages follow the `"<field>" must be ...` convention the browser client
//! already displays verbatim. Numeric and boolean readers accept string
//! representations so query parameters validate with the same rules as bodies.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};

/// First rule violation found in a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn field(key: &str, message: impl std::fmt::Display) -> Self {
        Self(format!("\"{key}\" {message}"))
    }
}

/// Bounds applied by [`Fields::number`] and [`Fields::integer`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumberRule {
    positive: bool,
    min: Option<f64>,
    max: Option<f64>,
}

impl NumberRule {
    pub const fn any() -> Self {
        Self {
            positive: false,
            min: None,
            max: None,
        }
    }

    pub const fn positive(mut self) -> Self {
        self.positive = true;
        self
    }

    pub const fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub const fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    fn check(&self, key: &str, value: f64) -> Result<f64, ValidationError> {
        if self.positive && value <= 0.0 {
            return Err(ValidationError::field(key, "must be a positive number"));
        }
        if let Some(min) = self.min {
            if value < min {
                return Err(ValidationError::field(
                    key,
                    format!("must be greater than or equal to {min}"),
                ));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ValidationError::field(
                    key,
                    format!("must be less than or equal to {max}"),
                ));
            }
        }
        Ok(value)
    }
}

/// Read-only view over the fields of one request object.
///
/// Declared fields are read first; keys outside `allowed` are only reported
/// once every declared field has passed, matching the order the browser
/// client expects errors in.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    allowed: &'a [&'a str],
}

impl<'a> Fields<'a> {
    /// Wraps `body` if it is an object. Unknown keys are not checked here.
    pub fn from_body(body: &'a Value, allowed: &'a [&'a str]) -> Result<Self, ValidationError> {
        match body {
            Value::Object(map) => Ok(Self::from_map(map, allowed)),
            _ => Err(ValidationError(
                "\"value\" must be of type object".to_string(),
            )),
        }
    }

    pub fn from_map(map: &'a Map<String, Value>, allowed: &'a [&'a str]) -> Self {
        Self { map, allowed }
    }

    /// Runs `read` over the declared fields of `body`, then rejects unknown keys.
    pub fn read_body<T>(
        body: &'a Value,
        allowed: &'a [&'a str],
        read: impl FnOnce(&Fields<'a>) -> Result<T, ValidationError>,
    ) -> Result<T, ValidationError> {
        let fields = Self::from_body(body, allowed)?;
        let value = read(&fields)?;
        fields.reject_unknown()?;
        Ok(value)
    }

    /// [`Fields::read_body`] for an already unpacked map such as a query string.
    pub fn read_map<T>(
        map: &'a Map<String, Value>,
        allowed: &'a [&'a str],
        read: impl FnOnce(&Fields<'a>) -> Result<T, ValidationError>,
    ) -> Result<T, ValidationError> {
        let fields = Self::from_map(map, allowed);
        let value = read(&fields)?;
        fields.reject_unknown()?;
        Ok(value)
    }

    pub fn reject_unknown(&self) -> Result<(), ValidationError> {
        match self
            .map
            .keys()
            .find(|key| !self.allowed.contains(&key.as_str()))
        {
            Some(unknown) => Err(ValidationError::field(unknown, "is not allowed")),
            None => Ok(()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn string(&self, key: &str) -> Result<Option<String>, ValidationError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::String(raw)) if raw.is_empty() => {
                Err(ValidationError::field(key, "is not allowed to be empty"))
            }
            Some(Value::String(raw)) => Ok(Some(raw.clone())),
            Some(_) => Err(ValidationError::field(key, "must be a string")),
        }
    }

    /// Reads an email address, returned trimmed and lower-cased.
    pub fn email(&self, key: &str) -> Result<Option<String>, ValidationError> {
        let Some(raw) = self.string(key)? else {
            return Ok(None);
        };
        let normalized = raw.trim().to_lowercase();
        if email_pattern().is_match(&normalized) {
            Ok(Some(normalized))
        } else {
            Err(ValidationError::field(key, "must be a valid email"))
        }
    }

    pub fn number(&self, key: &str, rule: NumberRule) -> Result<Option<f64>, ValidationError> {
        self.raw_number(key)?
            .map(|value| rule.check(key, value))
            .transpose()
    }

    pub fn integer(&self, key: &str, rule: NumberRule) -> Result<Option<i64>, ValidationError> {
        let Some(value) = self.raw_number(key)? else {
            return Ok(None);
        };
        if value.fract() != 0.0 {
            return Err(ValidationError::field(key, "must be an integer"));
        }
        rule.check(key, value).map(|checked| Some(checked as i64))
    }

    pub fn boolean(&self, key: &str) -> Result<Option<bool>, ValidationError> {
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(ValidationError::field(key, "must be a boolean")),
            },
            Some(_) => Err(ValidationError::field(key, "must be a boolean")),
        }
    }

    /// Reads a string restricted to `choices` and parses it into `T`.
    pub fn choice<T>(&self, key: &str, choices: &[&str]) -> Result<Option<T>, ValidationError>
    where
        T: std::str::FromStr,
    {
        let invalid = || {
            ValidationError::field(key, format!("must be one of [{}]", choices.join(", ")))
        };
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::String(raw)) if choices.contains(&raw.as_str()) => {
                raw.parse::<T>().map(Some).map_err(|_| invalid())
            }
            Some(_) => Err(invalid()),
        }
    }

    /// Accepts RFC 3339 timestamps, `YYYY-MM-DD` dates, or epoch milliseconds.
    pub fn date(&self, key: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
        let invalid = || ValidationError::field(key, "must be a valid date");
        match self.map.get(key) {
            None => Ok(None),
            Some(Value::Number(number)) => number
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .map(Some)
                .ok_or_else(invalid),
            Some(Value::String(raw)) => parse_date(raw.trim()).map(Some).ok_or_else(invalid),
            Some(_) => Err(invalid()),
        }
    }

    fn raw_number(&self, key: &str) -> Result<Option<f64>, ValidationError> {
        let parsed = match self.map.get(key) {
            None => return Ok(None),
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match parsed {
            Some(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(ValidationError::field(key, "must be a number")),
        }
    }
}

/// Turns an optional field into a required one.
pub fn required<T>(key: &str, value: Option<T>) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::field(key, "is required"))
}

/// Lifts query-string pairs into a JSON map so [`Fields`] can read them.
pub fn query_map(params: &HashMap<String, String>) -> Map<String, Value> {
    params
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
    })
}
