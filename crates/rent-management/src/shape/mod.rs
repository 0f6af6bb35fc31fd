//! Response redaction by shape templates.
//!
//! A [`Template`] lists the fields a caller may see. [`filter`] walks a value
//! alongside its template and copies only the allowed fields, descending into
//! nested objects and arrays where the template does. Internal document fields
//! such as password hashes never reach the wire this way.

mod template;


use std::borrow::Cow;
use std::collections::BTreeMap;

use serde_json::{Map, Value};

pub use template::{Template, TemplateError};

/// Capability for domain types that can hand out a plain JSON representation
/// of themselves before being filtered.
pub trait ToPlainData {
    fn to_plain_data(&self) -> Cow<'_, Value>;
}

impl ToPlainData for Value {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        Cow::Borrowed(self)
    }
}

impl ToPlainData for Map<String, Value> {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        Cow::Owned(Value::Object(self.clone()))
    }
}

impl<T: ToPlainData> ToPlainData for [T] {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        Cow::Owned(Value::Array(
            self.iter()
                .map(|item| item.to_plain_data().into_owned())
                .collect(),
        ))
    }
}

impl<T: ToPlainData> ToPlainData for Vec<T> {
    fn to_plain_data(&self) -> Cow<'_, Value> {
        self.as_slice().to_plain_data()
    }
}

/// Produces a copy of `subject` holding only the fields `template` allows.
///
/// Where the template and the value disagree on shape (an object template
/// over an array, a field template over a scalar) the value is kept as
/// selected and recursion stops there. Never fails.
pub fn filter<S>(subject: &S, template: &Template) -> Value
where
    S: ToPlainData + ?Sized,
{
    let plain = subject.to_plain_data();
    filter_value(&plain, template)
}

fn filter_value(subject: &Value, template: &Template) -> Value {
    match (template, subject) {
        (Template::ArrayOf(element), Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(_) => filter_value(item, element),
                    other => other.clone(),
                })
                .collect(),
        ),
        (Template::Fields(fields), Value::Object(map)) => Value::Object(select(map, fields)),
        _ => subject.clone(),
    }
}

fn select(map: &Map<String, Value>, fields: &BTreeMap<String, Template>) -> Map<String, Value> {
    map.iter()
        .filter_map(|(key, value)| {
            let nested = fields.get(key)?;
            let kept = if nested.matches(value) {
                filter_value(value, nested)
            } else {
                value.clone()
            };
            Some((key.clone(), kept))
        })
        .collect()
}

/// Template and value disagreed on shape at `path`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("shape mismatch at {path}: template expects {expected}, value is {found}")]
pub struct ShapeMismatch {
    pub path: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// Like [`filter`], but reports the first place where a non-leaf template
/// meets a value of a different shape instead of passing the value through.
/// `null` values are kept without complaint.
pub fn filter_strict<S>(subject: &S, template: &Template) -> Result<Value, ShapeMismatch>
where
    S: ToPlainData + ?Sized,
{
    let plain = subject.to_plain_data();
    strict_value(&plain, template, "$")
}

fn strict_value(subject: &Value, template: &Template, path: &str) -> Result<Value, ShapeMismatch> {
    if template.is_leaf() || subject.is_null() {
        return Ok(subject.clone());
    }

    match (template, subject) {
        (Template::ArrayOf(element), Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| strict_value(item, element, &format!("{path}[{index}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (Template::Fields(fields), Value::Object(map)) => map
            .iter()
            .filter_map(|(key, value)| fields.get(key).map(|nested| (key, value, nested)))
            .map(|(key, value, nested)| {
                strict_value(value, nested, &format!("{path}.{key}")).map(|kept| (key.clone(), kept))
            })
            .collect::<Result<Map<_, _>, _>>()
            .map(Value::Object),
        _ => Err(ShapeMismatch {
            path: path.to_string(),
            expected: template.shape_label(),
            found: value_label(subject),
        }),
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
