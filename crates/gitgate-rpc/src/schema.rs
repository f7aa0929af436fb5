//! Declarative parameter schemas.
//!
//! Schemas deserialize from the same camelCase JSON the UI uses to describe
//! them, e.g. `{"type": "string", "minLength": 1}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Expected shape of one positional parameter (or nested value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamSchema {
    String(StringSchema),
    Number(NumberSchema),
    Boolean(BooleanSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSchema {
    #[serde(default = "required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression the value must contain a match for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberSchema {
    #[serde(default = "required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanSchema {
    #[serde(default = "required")]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    #[serde(default = "required")]
    pub required: bool,
    /// Schema every element must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParamSchema>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    #[serde(default = "required")]
    pub required: bool,
    /// Declared properties; undeclared ones are not checked.
    #[serde(default)]
    pub properties: BTreeMap<String, ParamSchema>,
}

const fn required() -> bool {
    true
}

impl ParamSchema {
    #[must_use]
    pub const fn string() -> Self {
        Self::String(StringSchema {
            required: true,
            min_length: None,
            max_length: None,
            pattern: None,
        })
    }

    #[must_use]
    pub const fn number() -> Self {
        Self::Number(NumberSchema {
            required: true,
            min: None,
            max: None,
        })
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::Boolean(BooleanSchema { required: true })
    }

    #[must_use]
    pub fn array(items: Self) -> Self {
        Self::Array(ArraySchema {
            required: true,
            items: Some(Box::new(items)),
        })
    }

    #[must_use]
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Self)>,
        K: Into<String>,
    {
        Self::Object(ObjectSchema {
            required: true,
            properties: properties.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        })
    }

    /// Mark this value as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        *self.required_mut() = false;
        self
    }

    /// Minimum string length; ignored for other types.
    #[must_use]
    pub fn min_length(mut self, n: usize) -> Self {
        if let Self::String(s) = &mut self {
            s.min_length = Some(n);
        }
        self
    }

    /// Maximum string length; ignored for other types.
    #[must_use]
    pub fn max_length(mut self, n: usize) -> Self {
        if let Self::String(s) = &mut self {
            s.max_length = Some(n);
        }
        self
    }

    /// Required regex match; ignored for other types.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        if let Self::String(s) = &mut self {
            s.pattern = Some(pattern.into());
        }
        self
    }

    #[must_use]
    pub const fn is_required(&self) -> bool {
        match self {
            Self::String(s) => s.required,
            Self::Number(s) => s.required,
            Self::Boolean(s) => s.required,
            Self::Array(s) => s.required,
            Self::Object(s) => s.required,
        }
    }

    /// Name used in type-mismatch messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    fn required_mut(&mut self) -> &mut bool {
        match self {
            Self::String(s) => &mut s.required,
            Self::Number(s) => &mut s.required,
            Self::Boolean(s) => &mut s.required,
            Self::Array(s) => &mut s.required,
            Self::Object(s) => &mut s.required,
        }
    }
}
