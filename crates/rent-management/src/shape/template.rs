use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Nested allowlist describing which fields of a value are externally visible.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Template {
    /// Keep the selected value as-is without descending into it.
    Leaf,
    /// Keep only the named fields, each shaped by its own sub-template.
    Fields(BTreeMap<String, Template>),
    /// Apply the inner template to every element of an array.
    ArrayOf(Box<Template>),
}

/// Raised when the JSON notation of a template is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template leaves must be `true`, found `{0}`")]
    InvalidMarker(String),
    #[error("array templates need exactly one element, found none")]
    EmptyArray,
    #[error("array templates need exactly one element, found {0}")]
    MultipleElements(usize),
}

impl Template {
    pub fn fields<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Template)>,
        K: Into<String>,
    {
        Self::Fields(
            entries
                .into_iter()
                .map(|(key, template)| (key.into(), template))
                .collect(),
        )
    }

    /// Shorthand for a field set where every field is a leaf.
    pub fn leaves<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self::fields(keys.into_iter().map(|key| (key, Self::Leaf)))
    }

    pub fn array_of(element: Template) -> Self {
        Self::ArrayOf(Box::new(element))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf)
    }

    /// Whether `value` has the container shape this template descends into.
    pub(crate) fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Fields(_), Value::Object(_)) | (Self::ArrayOf(_), Value::Array(_))
        )
    }

    pub(crate) fn shape_label(&self) -> &'static str {
        match self {
            Self::Leaf => "leaf",
            Self::Fields(_) => "object",
            Self::ArrayOf(_) => "array",
        }
    }

    /// Parses the dynamic JSON notation: `true` marks a leaf, an object lists
    /// fields, and a single-element array wraps the element template.
    pub fn from_json(value: &Value) -> Result<Self, TemplateError> {
        match value {
            Value::Bool(true) => Ok(Self::Leaf),
            Value::Object(map) => map
                .iter()
                .map(|(key, nested)| Ok((key.clone(), Self::from_json(nested)?)))
                .collect::<Result<BTreeMap<_, _>, TemplateError>>()
                .map(Self::Fields),
            Value::Array(items) => match items.as_slice() {
                [element] => Ok(Self::array_of(Self::from_json(element)?)),
                [] => Err(TemplateError::EmptyArray),
                _ => Err(TemplateError::MultipleElements(items.len())),
            },
            other => Err(TemplateError::InvalidMarker(other.to_string())),
        }
    }

    /// Renders the template back into its JSON notation.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Leaf => Value::Bool(true),
            Self::Fields(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, nested)| (key.clone(), nested.to_json()))
                    .collect(),
            ),
            Self::ArrayOf(element) => Value::Array(vec![element.to_json()]),
        }
    }
}

impl TryFrom<Value> for Template {
    type Error = TemplateError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}
