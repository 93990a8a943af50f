//! Declarative payload schemas and the validation engine.
//!
//! A [`Schema`] describes the expected shape of a JSON payload: scalar types
//! with constraints, arrays of items, and objects with named properties.
//! Every node carries a `required` marker. Validation walks the payload,
//! coerces values where [`ValidationOptions::convert`] allows it, strips
//! unknown object keys by default, and collects every violation into a
//! [`ValidationReport`] instead of stopping at the first one.
//!
//! # Example
//!
//! ```
//! use sieve_core::schema::{Schema, ValidationOptions};
//! use serde_json::json;
//!
//! let schema = Schema::object(vec![
//!     ("title", Schema::string().min_length(1).required()),
//!     ("pages", Schema::integer().minimum_int(1)),
//! ]);
//!
//! let body = json!({ "title": "Dune", "pages": "412", "debug": true });
//! let coerced = schema.validate(&body, &ValidationOptions::default()).unwrap();
//!
//! // `pages` was coerced and the unknown `debug` key stripped.
//! assert_eq!(coerced, json!({ "title": "Dune", "pages": 412 }));
//! ```
//!
//! # Error descriptors
//!
//! Each [`FieldError`] carries the path, a human-readable message, a
//! machine-readable `type`, and a context. The context holds the offending
//! value as seen by the engine; callers must [`FieldError::redact`] before
//! returning descriptors to a client. Messages never embed the value.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Policy for object keys that have no property schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeys {
    /// Drop unknown keys from the coerced output.
    Strip,
    /// Keep unknown keys untouched.
    Allow,
    /// Report each unknown key as an error.
    Reject,
}

/// Options controlling a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Stop at the first error instead of collecting all of them.
    pub abort_early: bool,
    /// Strip unknown keys on objects that don't declare their own policy.
    /// When `false` those keys are rejected.
    pub strip_unknown: bool,
    /// Coerce numeric and boolean strings into their typed values.
    pub convert: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            abort_early: false,
            strip_unknown: true,
            convert: true,
        }
    }
}

/// A declarative schema for a payload or one of its fields.
///
/// Schemas are serializable so routes can declare them as JSON:
///
/// ```
/// use sieve_core::Schema;
///
/// let schema: Schema = serde_json::from_str(r#"{
///     "type": "object",
///     "properties": {
///         "email": { "type": "string", "required": true, "pattern": "^[^@]+@[^@]+$" }
///     }
/// }"#).unwrap();
///
/// assert!(schema.validate(&serde_json::json!({ "email": "a@b.c" }), &Default::default()).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schema {
    /// String type.
    String {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
        /// Minimum length in characters.
        #[serde(default)]
        min_length: Option<usize>,
        /// Maximum length in characters.
        #[serde(default)]
        max_length: Option<usize>,
        /// Regular expression the value must match.
        #[serde(default)]
        pattern: Option<String>,
    },
    /// Integer type.
    Integer {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
        /// Minimum value (inclusive).
        #[serde(default)]
        minimum: Option<i64>,
        /// Maximum value (inclusive).
        #[serde(default)]
        maximum: Option<i64>,
    },
    /// Number (float) type.
    Number {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
        /// Minimum value (inclusive).
        #[serde(default)]
        minimum: Option<f64>,
        /// Maximum value (inclusive).
        #[serde(default)]
        maximum: Option<f64>,
    },
    /// Boolean type.
    Boolean {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
    },
    /// Array type.
    Array {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
        /// Schema for array items.
        items: Box<Schema>,
        /// Minimum number of items.
        #[serde(default)]
        min_items: Option<usize>,
        /// Maximum number of items.
        #[serde(default)]
        max_items: Option<usize>,
    },
    /// Object type.
    Object {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
        /// Properties and their schemas, in declaration order.
        #[serde(default)]
        properties: IndexMap<String, Schema>,
        /// Unknown key policy. `None` defers to [`ValidationOptions::strip_unknown`].
        #[serde(default)]
        unknown: Option<UnknownKeys>,
    },
    /// Any type (accepts anything).
    Any {
        /// Whether this field is required.
        #[serde(default)]
        required: bool,
    },
    /// Null type.
    Null,
}

impl Schema {
    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::String {
            required: false,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    /// Creates an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::Integer {
            required: false,
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::Number {
            required: false,
            minimum: None,
            maximum: None,
        }
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::Boolean { required: false }
    }

    /// Creates an array schema.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::Array {
            required: false,
            items: Box::new(items),
            min_items: None,
            max_items: None,
        }
    }

    /// Creates an object schema from a list of property definitions.
    #[must_use]
    pub fn object(properties: Vec<(&str, Schema)>) -> Self {
        Self::Object {
            required: false,
            properties: properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect(),
            unknown: None,
        }
    }

    /// Creates an object schema with no declared properties that keeps every key.
    #[must_use]
    pub fn open_object() -> Self {
        Self::object(vec![]).unknown(UnknownKeys::Allow)
    }

    /// Creates an "any" schema that accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::Any { required: false }
    }

    /// Creates a null schema.
    #[must_use]
    pub fn null() -> Self {
        Self::Null
    }

    /// Marks this schema as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        if let Some(flag) = self.required_flag_mut() {
            *flag = true;
        }
        self
    }

    /// Marks this schema as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        if let Some(flag) = self.required_flag_mut() {
            *flag = false;
        }
        self
    }

    /// Returns whether this schema is marked as required.
    #[must_use]
    pub fn is_required(&self) -> bool {
        match self {
            Self::String { required, .. }
            | Self::Integer { required, .. }
            | Self::Number { required, .. }
            | Self::Boolean { required, .. }
            | Self::Array { required, .. }
            | Self::Object { required, .. }
            | Self::Any { required, .. } => *required,
            Self::Null => false,
        }
    }

    fn required_flag_mut(&mut self) -> Option<&mut bool> {
        match self {
            Self::String { required, .. }
            | Self::Integer { required, .. }
            | Self::Number { required, .. }
            | Self::Boolean { required, .. }
            | Self::Array { required, .. }
            | Self::Object { required, .. }
            | Self::Any { required, .. } => Some(required),
            Self::Null => None,
        }
    }

    /// Sets the minimum length for string schemas.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        if let Self::String { min_length, .. } = &mut self {
            *min_length = Some(len);
        }
        self
    }

    /// Sets the maximum length for string schemas.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        if let Self::String { max_length, .. } = &mut self {
            *max_length = Some(len);
        }
        self
    }

    /// Sets the pattern for string schemas.
    #[must_use]
    pub fn pattern(mut self, regex: impl Into<String>) -> Self {
        if let Self::String { pattern, .. } = &mut self {
            *pattern = Some(regex.into());
        }
        self
    }

    /// Sets the minimum value for integer schemas.
    #[must_use]
    pub fn minimum_int(mut self, min: i64) -> Self {
        if let Self::Integer { minimum, .. } = &mut self {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the maximum value for integer schemas.
    #[must_use]
    pub fn maximum_int(mut self, max: i64) -> Self {
        if let Self::Integer { maximum, .. } = &mut self {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the minimum value for number schemas.
    #[must_use]
    pub fn minimum(mut self, min: f64) -> Self {
        if let Self::Number { minimum, .. } = &mut self {
            *minimum = Some(min);
        }
        self
    }

    /// Sets the maximum value for number schemas.
    #[must_use]
    pub fn maximum(mut self, max: f64) -> Self {
        if let Self::Number { maximum, .. } = &mut self {
            *maximum = Some(max);
        }
        self
    }

    /// Sets the minimum items for array schemas.
    #[must_use]
    pub fn min_items(mut self, min: usize) -> Self {
        if let Self::Array { min_items, .. } = &mut self {
            *min_items = Some(min);
        }
        self
    }

    /// Sets the maximum items for array schemas.
    #[must_use]
    pub fn max_items(mut self, max: usize) -> Self {
        if let Self::Array { max_items, .. } = &mut self {
            *max_items = Some(max);
        }
        self
    }

    /// Sets the unknown key policy for object schemas.
    #[must_use]
    pub fn unknown(mut self, policy: UnknownKeys) -> Self {
        if let Self::Object { unknown, .. } = &mut self {
            *unknown = Some(policy);
        }
        self
    }

    /// Checks the schema definition itself, without any payload.
    ///
    /// Reports inverted ranges and patterns that are not valid regular
    /// expressions. [`Schema::validate`] performs the same checks lazily on
    /// every node it visits.
    pub fn check(&self) -> Result<(), SchemaError> {
        let mut path = Vec::new();
        self.check_tree(&mut path)
    }

    fn check_tree(&self, path: &mut Vec<PathSegment>) -> Result<(), SchemaError> {
        self.check_node(path)?;
        if let Self::String {
            pattern: Some(p), ..
        } = self
        {
            compile_pattern(p, path)?;
        }
        match self {
            Self::Array { items, .. } => {
                path.push(PathSegment::Index(0));
                let result = items.check_tree(path);
                path.pop();
                result
            }
            Self::Object { properties, .. } => {
                for (key, prop) in properties {
                    path.push(PathSegment::Key(key.clone()));
                    let result = prop.check_tree(path);
                    path.pop();
                    result?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_node(&self, path: &[PathSegment]) -> Result<(), SchemaError> {
        let inverted = match self {
            Self::String {
                min_length: Some(min),
                max_length: Some(max),
                ..
            }
            | Self::Array {
                min_items: Some(min),
                max_items: Some(max),
                ..
            } => min > max,
            Self::Integer {
                minimum: Some(min),
                maximum: Some(max),
                ..
            } => min > max,
            Self::Number {
                minimum: Some(min),
                maximum: Some(max),
                ..
            } => min > max,
            _ => false,
        };

        if inverted {
            return Err(SchemaError::definition(path, "minimum exceeds maximum"));
        }
        Ok(())
    }

    /// Validates a JSON value against this schema.
    ///
    /// Returns the coerced value on success. On failure returns
    /// [`SchemaError::Invalid`] with every collected error (or only the first
    /// one when [`ValidationOptions::abort_early`] is set), or
    /// [`SchemaError::Definition`] when the schema itself is broken.
    ///
    /// # Example
    ///
    /// ```
    /// use sieve_core::schema::{Schema, SchemaError, ValidationOptions};
    ///
    /// let schema = Schema::object(vec![
    ///     ("name", Schema::string().required()),
    ///     ("age", Schema::integer().minimum_int(0)),
    /// ]);
    ///
    /// let err = schema
    ///     .validate(&serde_json::json!({ "age": -3 }), &ValidationOptions::default())
    ///     .unwrap_err();
    ///
    /// match err {
    ///     SchemaError::Invalid(report) => assert_eq!(report.len(), 2),
    ///     other => panic!("unexpected: {other}"),
    /// }
    /// ```
    pub fn validate(&self, value: &Value, options: &ValidationOptions) -> Result<Value, SchemaError> {
        let mut walker = Walker {
            options,
            errors: Vec::new(),
        };
        let mut path = Vec::new();
        let output = walker.walk(self, Some(value), &mut path)?;

        if walker.errors.is_empty() {
            Ok(output.unwrap_or(Value::Null))
        } else {
            Err(SchemaError::Invalid(ValidationReport::new(walker.errors)))
        }
    }
}

fn compile_pattern(pattern: &str, path: &[PathSegment]) -> Result<Regex, SchemaError> {
    Regex::new(pattern).map_err(|e| SchemaError::definition(path, format!("invalid pattern: {e}")))
}

/// Walks a payload alongside its schema, collecting errors.
struct Walker<'o> {
    options: &'o ValidationOptions,
    errors: Vec<FieldError>,
}

impl Walker<'_> {
    fn halted(&self) -> bool {
        self.options.abort_early && !self.errors.is_empty()
    }

    fn report(
        &mut self,
        path: &[PathSegment],
        kind: &str,
        detail: &str,
        limit: Option<Value>,
        value: Option<&Value>,
    ) {
        if self.halted() {
            return;
        }
        let label = label_for(path);
        self.errors.push(FieldError {
            path: path.to_vec(),
            message: format!("\"{label}\" {detail}"),
            kind: kind.to_string(),
            context: ErrorContext {
                label,
                key: path.last().cloned(),
                limit,
                value: value.cloned(),
            },
        });
    }

    /// Validates `value` (absent when `None`) and returns the coerced output.
    fn walk(
        &mut self,
        schema: &Schema,
        value: Option<&Value>,
        path: &mut Vec<PathSegment>,
    ) -> Result<Option<Value>, SchemaError> {
        schema.check_node(path)?;
        if self.halted() {
            return Ok(value.cloned());
        }

        let value = match value {
            None | Some(Value::Null) if schema.is_required() => {
                self.report(path, "any.required", "is required", None, value);
                return Ok(None);
            }
            None => return Ok(None),
            Some(Value::Null) if !matches!(schema, Schema::Null) => return Ok(Some(Value::Null)),
            Some(v) => v,
        };

        match schema {
            Schema::String {
                min_length,
                max_length,
                pattern,
                ..
            } => {
                let Some(s) = value.as_str() else {
                    self.report(path, "string.base", "must be a string", None, Some(value));
                    return Ok(None);
                };
                let len = s.chars().count();
                if let Some(min) = *min_length {
                    if len < min {
                        let detail = format!("length must be at least {min} characters long");
                        self.report(path, "string.min", &detail, Some(min.into()), Some(value));
                    }
                }
                if let Some(max) = *max_length {
                    if len > max {
                        let detail =
                            format!("length must be less than or equal to {max} characters long");
                        self.report(path, "string.max", &detail, Some(max.into()), Some(value));
                    }
                }
                if let Some(p) = pattern {
                    if !compile_pattern(p, path)?.is_match(s) {
                        let detail = format!("fails to match the required pattern: {p}");
                        self.report(path, "string.pattern.base", &detail, None, Some(value));
                    }
                }
                Ok(Some(value.clone()))
            }

            Schema::Integer {
                minimum, maximum, ..
            } => {
                let Some(n) = self.coerce_number(value) else {
                    self.report(path, "number.base", "must be a number", None, Some(value));
                    return Ok(None);
                };
                let Some(n) = self.exact_integer(value).or_else(|| whole_i64(n)) else {
                    self.report(path, "number.integer", "must be an integer", None, Some(value));
                    return Ok(None);
                };
                if let Some(min) = *minimum {
                    if n < min {
                        let detail = format!("must be greater than or equal to {min}");
                        self.report(path, "number.min", &detail, Some(min.into()), Some(value));
                    }
                }
                if let Some(max) = *maximum {
                    if n > max {
                        let detail = format!("must be less than or equal to {max}");
                        self.report(path, "number.max", &detail, Some(max.into()), Some(value));
                    }
                }
                Ok(Some(Value::from(n)))
            }

            Schema::Number {
                minimum, maximum, ..
            } => {
                let Some(n) = self.coerce_number(value) else {
                    self.report(path, "number.base", "must be a number", None, Some(value));
                    return Ok(None);
                };
                if let Some(min) = *minimum {
                    if n < min {
                        let detail = format!("must be greater than or equal to {min}");
                        self.report(path, "number.min", &detail, Some(min.into()), Some(value));
                    }
                }
                if let Some(max) = *maximum {
                    if n > max {
                        let detail = format!("must be less than or equal to {max}");
                        self.report(path, "number.max", &detail, Some(max.into()), Some(value));
                    }
                }
                if value.is_number() {
                    Ok(Some(value.clone()))
                } else {
                    Ok(Some(Value::from(n)))
                }
            }

            Schema::Boolean { .. } => {
                let coerced = match value {
                    Value::Bool(b) => Some(*b),
                    Value::String(s) if self.options.convert => {
                        if s.eq_ignore_ascii_case("true") {
                            Some(true)
                        } else if s.eq_ignore_ascii_case("false") {
                            Some(false)
                        } else {
                            None
                        }
                    }
                    _ => None,
                };
                match coerced {
                    Some(b) => Ok(Some(Value::Bool(b))),
                    None => {
                        self.report(path, "boolean.base", "must be a boolean", None, Some(value));
                        Ok(None)
                    }
                }
            }

            Schema::Array {
                items,
                min_items,
                max_items,
                ..
            } => {
                let Some(arr) = value.as_array() else {
                    self.report(path, "array.base", "must be an array", None, Some(value));
                    return Ok(None);
                };
                if let Some(min) = *min_items {
                    if arr.len() < min {
                        let detail = format!("must contain at least {min} items");
                        self.report(path, "array.min", &detail, Some(min.into()), Some(value));
                    }
                }
                if let Some(max) = *max_items {
                    if arr.len() > max {
                        let detail = format!("must contain less than or equal to {max} items");
                        self.report(path, "array.max", &detail, Some(max.into()), Some(value));
                    }
                }

                let mut out = Vec::with_capacity(arr.len());
                for (idx, item) in arr.iter().enumerate() {
                    path.push(PathSegment::Index(idx));
                    let result = self.walk(items, Some(item), path);
                    path.pop();
                    out.push(result?.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(out)))
            }

            Schema::Object {
                properties,
                unknown,
                ..
            } => {
                let Some(obj) = value.as_object() else {
                    self.report(path, "object.base", "must be of type object", None, Some(value));
                    return Ok(None);
                };
                let policy = unknown.unwrap_or(if self.options.strip_unknown {
                    UnknownKeys::Strip
                } else {
                    UnknownKeys::Reject
                });

                let mut out = Map::new();
                for (key, prop) in properties {
                    path.push(PathSegment::Key(key.clone()));
                    let result = self.walk(prop, obj.get(key), path);
                    path.pop();
                    if let Some(v) = result? {
                        out.insert(key.clone(), v);
                    }
                }

                for (key, v) in obj {
                    if properties.contains_key(key) {
                        continue;
                    }
                    match policy {
                        UnknownKeys::Strip => {}
                        UnknownKeys::Allow => {
                            out.insert(key.clone(), v.clone());
                        }
                        UnknownKeys::Reject => {
                            path.push(PathSegment::Key(key.clone()));
                            self.report(path, "object.unknown", "is not allowed", None, Some(v));
                            path.pop();
                        }
                    }
                }
                Ok(Some(Value::Object(out)))
            }

            Schema::Any { .. } => Ok(Some(value.clone())),

            Schema::Null => {
                if value.is_null() {
                    Ok(Some(Value::Null))
                } else {
                    self.report(path, "null.base", "must be null", None, Some(value));
                    Ok(None)
                }
            }
        }
    }

    fn exact_integer(&self, value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) if self.options.convert => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn coerce_number(&self, value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if self.options.convert => {
                s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }
}

/// 2^63, the first whole `f64` outside the `i64` range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Converts a whole `f64` that fits in an `i64`.
#[allow(clippy::cast_possible_truncation)]
fn whole_i64(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&n)).then(|| n as i64)
}

/// Renders a path as a human-readable label, e.g. `editors[1].name`.
fn label_for(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "value".to_string();
    }
    let mut label = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !label.is_empty() {
                    label.push('.');
                }
                label.push_str(key);
            }
            PathSegment::Index(idx) => {
                label.push('[');
                label.push_str(&idx.to_string());
                label.push(']');
            }
        }
    }
    label
}

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Context attached to a [`FieldError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Human-readable label of the field.
    pub label: String,
    /// Last path segment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathSegment>,
    /// The constraint limit that was violated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Value>,
    /// The offending value. Removed by [`FieldError::redact`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A single field-level validation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path from the payload root to the failing field.
    pub path: Vec<PathSegment>,
    /// Human-readable message. Never contains the submitted value.
    pub message: String,
    /// Machine-readable error type, e.g. `string.min`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Additional context.
    pub context: ErrorContext,
}

impl FieldError {
    /// Removes the echoed offending value.
    pub fn redact(&mut self) {
        self.context.value = None;
    }

    /// Returns the dotted label of the failing field.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.context.label
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Ordered collection of field errors from one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("{} validation error(s)", .errors.len())]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    /// Creates a report from a list of errors.
    #[must_use]
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Redacts the offending value from every error.
    pub fn redact(&mut self) {
        self.errors.iter_mut().for_each(FieldError::redact);
    }

    /// Returns a redacted copy of this report.
    #[must_use]
    pub fn redacted(mut self) -> Self {
        self.redact();
        self
    }

    /// Returns the errors in report order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Consumes the report, returning its errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Failure of a validation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// The payload violates the schema.
    #[error(transparent)]
    Invalid(ValidationReport),

    /// The schema itself is malformed.
    #[error("invalid schema at '{path}': {reason}")]
    Definition {
        /// Label of the offending schema node.
        path: String,
        /// Why the definition is invalid.
        reason: String,
    },
}

impl SchemaError {
    fn definition(path: &[PathSegment], reason: impl Into<String>) -> Self {
        Self::Definition {
            path: label_for(path),
            reason: reason.into(),
        }
    }
}
