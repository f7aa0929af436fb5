//! Schema-driven validation of positional call parameters.

use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::error::{GatewayError, ValidationError};
use crate::schema::ParamSchema;

type Result<T> = std::result::Result<T, ValidationError>;

/// Checks call parameters against per-method schemas.
///
/// Methods without a schema are not checked at all.
#[derive(Debug, Default)]
pub struct ParameterValidator {
    schemas: HashMap<String, Vec<ParamSchema>>,
    patterns: HashMap<String, Regex>,
}

impl ParameterValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the schema for `method`, replacing any previous one.
    ///
    /// # Errors
    /// Returns `InvalidSchema` if a string pattern does not compile.
    pub fn register(&mut self, method: &str, schema: Vec<ParamSchema>) -> crate::Result<()> {
        let mut patterns = Vec::new();
        for param in &schema {
            collect_patterns(param, &mut patterns);
        }
        for pattern in patterns {
            if self.patterns.contains_key(pattern) {
                continue;
            }
            let regex = Regex::new(pattern).map_err(|e| GatewayError::InvalidSchema {
                method: method.to_string(),
                message: e.to_string(),
            })?;
            self.patterns.insert(pattern.to_string(), regex);
        }

        self.schemas.insert(method.to_string(), schema);
        Ok(())
    }

    #[must_use]
    pub fn has_schema(&self, method: &str) -> bool {
        self.schemas.contains_key(method)
    }

    /// Validate `params` for `method`.
    ///
    /// # Errors
    /// Returns the first violation found, scanning parameters left to right.
    pub fn validate(&self, method: &str, params: &[Value]) -> Result<()> {
        let Some(schema) = self.schemas.get(method) else {
            return Ok(());
        };

        let expected = schema.iter().filter(|p| p.is_required()).count();
        if params.len() < expected {
            return Err(ValidationError::TooFewParameters {
                expected,
                actual: params.len(),
            });
        }

        for (index, param) in schema.iter().enumerate() {
            match params.get(index) {
                None | Some(Value::Null) if param.is_required() => {
                    return Err(ValidationError::MissingParameter(index));
                }
                None | Some(Value::Null) => {}
                Some(value) => self.check(param, value, &index.to_string())?,
            }
        }
        Ok(())
    }

    fn check(&self, schema: &ParamSchema, value: &Value, path: &str) -> Result<()> {
        let mismatch = || ValidationError::TypeMismatch {
            path: path.to_string(),
            expected: schema.type_name(),
            actual: json_type(value),
        };

        match schema {
            ParamSchema::String(s) => {
                let text = value.as_str().ok_or_else(mismatch)?;
                let len = text.chars().count();
                if let Some(min) = s.min_length.filter(|&min| len < min) {
                    return Err(constraint(path, format!("must be at least {min} characters")));
                }
                if let Some(max) = s.max_length.filter(|&max| len > max) {
                    return Err(constraint(path, format!("must be at most {max} characters")));
                }
                if let Some(pattern) = &s.pattern {
                    let matched = self.patterns.get(pattern).is_some_and(|re| re.is_match(text));
                    if !matched {
                        return Err(constraint(path, format!("does not match pattern {pattern}")));
                    }
                }
            }
            ParamSchema::Number(s) => {
                let number = value.as_f64().ok_or_else(mismatch)?;
                if let Some(min) = s.min.filter(|&min| number < min) {
                    return Err(constraint(path, format!("must be >= {min}")));
                }
                if let Some(max) = s.max.filter(|&max| number > max) {
                    return Err(constraint(path, format!("must be <= {max}")));
                }
            }
            ParamSchema::Boolean(_) => {
                value.as_bool().ok_or_else(mismatch)?;
            }
            ParamSchema::Array(s) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                if let Some(item_schema) = &s.items {
                    for (i, item) in items.iter().enumerate() {
                        self.check(item_schema, item, &format!("{path}[{i}]"))?;
                    }
                }
            }
            ParamSchema::Object(s) => {
                let object = value.as_object().ok_or_else(mismatch)?;
                for (name, prop) in &s.properties {
                    let prop_path = format!("{path}.{name}");
                    match object.get(name) {
                        None | Some(Value::Null) if prop.is_required() => {
                            return Err(ValidationError::MissingProperty(prop_path));
                        }
                        None | Some(Value::Null) => {}
                        Some(v) => self.check(prop, v, &prop_path)?,
                    }
                }
            }
        }
        Ok(())
    }
}

fn constraint(path: &str, message: String) -> ValidationError {
    ValidationError::Constraint {
        path: path.to_string(),
        message,
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn collect_patterns<'a>(schema: &'a ParamSchema, out: &mut Vec<&'a str>) {
    match schema {
        ParamSchema::String(s) => out.extend(s.pattern.as_deref()),
        ParamSchema::Array(s) => {
            if let Some(items) = &s.items {
                collect_patterns(items, out);
            }
        }
        ParamSchema::Object(s) => {
            for prop in s.properties.values() {
                collect_patterns(prop, out);
            }
        }
        ParamSchema::Number(_) | ParamSchema::Boolean(_) => {}
    }
}
