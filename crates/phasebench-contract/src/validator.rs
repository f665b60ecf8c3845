// crates/phasebench-contract/src/validator.rs
// ============================================================================
// Module: Schema Validator
// Description: Structural validation of metrics documents against schemas.
// Purpose: Offer interchangeable validator backends behind one trait.
// Dependencies: jsonschema, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`SchemaValidator`] checks a JSON instance against a versioned schema.
//! Two backends exist: [`JsonSchemaValidator`] delegates to the `jsonschema`
//! crate, and [`ManualSchemaValidator`] interprets the keyword subset used by
//! [`crate::schemas`] field by field. The manual backend refuses to compile a
//! schema that uses any keyword it does not understand, so it can never
//! accept an instance the full validator would reject for a keyword it
//! silently skipped. The backend is chosen once through [`SchemaBackend`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::schemas::extended_schema;
use crate::schemas::metrics_schema;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Directory, relative to a contract root, that holds schema files.
pub const SCHEMA_SUBDIR: &str = "schemas";

/// Keywords that carry no validation semantics.
const ANNOTATION_KEYWORDS: [&str; 4] = ["$schema", "$id", "title", "description"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or compiling a schema.
///
/// # Invariants
/// - Every variant is a configuration problem; none describes an instance.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema file is absent.
    #[error("schema file not found: {}", .0.display())]
    Missing(PathBuf),
    /// Schema file could not be read.
    #[error("schema io error: {0}")]
    Io(String),
    /// Schema file is not valid JSON.
    #[error("schema parse error: {0}")]
    Parse(String),
    /// Schema uses a keyword the manual backend cannot enforce.
    #[error("unsupported schema keyword `{keyword}` at {pointer}")]
    UnsupportedKeyword {
        /// Offending keyword.
        keyword: String,
        /// JSON pointer of the schema node.
        pointer: String,
    },
    /// Schema is structurally invalid.
    #[error("invalid schema: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Document Kinds
// ============================================================================

/// Versioned document families with a published schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Primary metrics document, version 3.0.
    Metrics,
    /// Extended multi-phase document, version 1.0.
    Extended,
}

impl DocumentKind {
    /// Returns the schema file name for the document family.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Metrics => "metrics-v3.0.schema.json",
            Self::Extended => "metrics-extended-v1.0.schema.json",
        }
    }

    /// Returns the schema path relative to a contract root.
    #[must_use]
    pub fn relative_path(self) -> String {
        format!("{SCHEMA_SUBDIR}/{}", self.file_name())
    }

    /// Returns the built-in schema for the document family.
    #[must_use]
    pub fn builtin_schema(self) -> Value {
        match self {
            Self::Metrics => metrics_schema(),
            Self::Extended => extended_schema(),
        }
    }
}

// ============================================================================
// SECTION: Backend Selection
// ============================================================================

/// Available validator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaBackend {
    /// Full JSON Schema implementation.
    #[default]
    JsonSchema,
    /// Field-by-field interpreter for the supported keyword subset.
    Manual,
}

impl SchemaBackend {
    /// Returns the stable backend label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JsonSchema => "jsonschema",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SchemaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemaBackend {
    type Err = SchemaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "jsonschema" | "json-schema" => Ok(Self::JsonSchema),
            "manual" => Ok(Self::Manual),
            other => Err(SchemaError::Invalid(format!("unknown validator backend: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Validator Trait
// ============================================================================

/// Structural validator for one compiled schema.
pub trait SchemaValidator: Send + Sync {
    /// Returns the backend that compiled this validator.
    fn backend(&self) -> SchemaBackend;

    /// Returns every violation found in the instance; empty means valid.
    fn validate(&self, instance: &Value) -> Vec<String>;

    /// Returns true when the instance conforms.
    fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_empty()
    }
}

/// Compiles a schema with the selected backend.
///
/// # Errors
///
/// Returns [`SchemaError`] when the schema does not compile.
pub fn build_validator(
    backend: SchemaBackend,
    schema: &Value,
) -> Result<Box<dyn SchemaValidator>, SchemaError> {
    match backend {
        SchemaBackend::JsonSchema => Ok(Box::new(JsonSchemaValidator::new(schema)?)),
        SchemaBackend::Manual => Ok(Box::new(ManualSchemaValidator::new(schema)?)),
    }
}

/// Reads a schema file for a document family from a contract root.
///
/// # Errors
///
/// Returns [`SchemaError::Missing`] when the file does not exist, and
/// [`SchemaError::Io`] or [`SchemaError::Parse`] when it cannot be loaded.
pub fn load_schema(contract_root: &Path, kind: DocumentKind) -> Result<Value, SchemaError> {
    let path = contract_root.join(SCHEMA_SUBDIR).join(kind.file_name());
    if !path.is_file() {
        return Err(SchemaError::Missing(path));
    }
    let bytes = fs::read(&path).map_err(|err| SchemaError::Io(err.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|err| SchemaError::Parse(format!("{}: {err}", path.display())))
}

/// Loads and compiles the schema for a document family.
///
/// # Errors
///
/// Returns [`SchemaError`] when the schema is missing or does not compile.
pub fn load_validator(
    backend: SchemaBackend,
    contract_root: &Path,
    kind: DocumentKind,
) -> Result<Box<dyn SchemaValidator>, SchemaError> {
    let schema = load_schema(contract_root, kind)?;
    build_validator(backend, &schema)
}

// ============================================================================
// SECTION: JSON Schema Backend
// ============================================================================

/// Validator backed by the `jsonschema` crate (draft 2020-12).
pub struct JsonSchemaValidator {
    /// Compiled validator.
    validator: Validator,
}

impl JsonSchemaValidator {
    /// Compiles the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] when compilation fails.
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| SchemaError::Invalid(err.to_string()))?;
        Ok(Self {
            validator,
        })
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn backend(&self) -> SchemaBackend {
        SchemaBackend::JsonSchema
    }

    fn validate(&self, instance: &Value) -> Vec<String> {
        self.validator.iter_errors(instance).map(|err| err.to_string()).collect()
    }
}

// ============================================================================
// SECTION: Manual Backend
// ============================================================================

/// Validator that interprets the supported keyword subset directly.
#[derive(Debug, Clone)]
pub struct ManualSchemaValidator {
    /// Compiled root node.
    root: Node,
}

impl ManualSchemaValidator {
    /// Compiles the schema, rejecting any keyword outside the subset.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnsupportedKeyword`] for unknown keywords and
    /// [`SchemaError::Invalid`] for malformed keyword values.
    pub fn new(schema: &Value) -> Result<Self, SchemaError> {
        Ok(Self {
            root: Node::compile(schema, "")?,
        })
    }
}

impl SchemaValidator for ManualSchemaValidator {
    fn backend(&self) -> SchemaBackend {
        SchemaBackend::Manual
    }

    fn validate(&self, instance: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        self.root.check(instance, "", &mut errors);
        errors
    }
}

/// Primitive JSON types named by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    /// `null`.
    Null,
    /// `true` or `false`.
    Boolean,
    /// Number with no fractional part.
    Integer,
    /// Any number.
    Number,
    /// String.
    String,
    /// Array.
    Array,
    /// Object.
    Object,
}

impl JsonType {
    /// Parses a `type` keyword entry.
    fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Returns true when the value has this type.
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Null => value.is_null(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => {
                value.is_u64()
                    || value.is_i64()
                    || value.as_f64().is_some_and(|number| number.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Returns the keyword spelling.
    const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Policy for object members not named in `properties`.
#[derive(Debug, Clone)]
enum Additional {
    /// Any extra member is allowed.
    Allow,
    /// Extra members are rejected.
    Deny,
    /// Extra members must match a schema.
    Schema(Box<Node>),
}

/// One compiled schema node.
#[derive(Debug, Clone)]
struct Node {
    /// Allowed primitive types; `None` allows any.
    types: Option<Vec<JsonType>>,
    /// Required object members.
    required: Vec<String>,
    /// Named object members.
    properties: BTreeMap<String, Self>,
    /// Extra member policy.
    additional: Additional,
    /// Inclusive lower bound.
    minimum: Option<f64>,
    /// Inclusive upper bound.
    maximum: Option<f64>,
    /// Exclusive lower bound.
    exclusive_minimum: Option<f64>,
    /// Allowed values.
    allowed: Option<Vec<Value>>,
    /// Required exact value.
    constant: Option<Value>,
    /// Array element schema.
    items: Option<Box<Self>>,
}

impl Node {
    /// Compiles one schema object.
    fn compile(schema: &Value, pointer: &str) -> Result<Self, SchemaError> {
        let object = schema.as_object().ok_or_else(|| {
            SchemaError::Invalid(format!("schema at {} must be an object", display(pointer)))
        })?;
        let mut node = Self {
            types: None,
            required: Vec::new(),
            properties: BTreeMap::new(),
            additional: Additional::Allow,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            allowed: None,
            constant: None,
            items: None,
        };
        for (keyword, value) in object {
            match keyword.as_str() {
                "type" => node.types = Some(compile_types(value, pointer)?),
                "required" => node.required = compile_required(value, pointer)?,
                "properties" => node.properties = compile_properties(value, pointer)?,
                "additionalProperties" => node.additional = compile_additional(value, pointer)?,
                "minimum" => node.minimum = Some(compile_number(keyword, value, pointer)?),
                "maximum" => node.maximum = Some(compile_number(keyword, value, pointer)?),
                "exclusiveMinimum" => {
                    node.exclusive_minimum = Some(compile_number(keyword, value, pointer)?);
                }
                "enum" => {
                    let values = value.as_array().ok_or_else(|| {
                        let at = display(pointer);
                        SchemaError::Invalid(format!("enum at {at} must be an array"))
                    })?;
                    node.allowed = Some(values.clone());
                }
                "const" => node.constant = Some(value.clone()),
                "items" => {
                    node.items = Some(Box::new(Self::compile(value, &format!("{pointer}/items"))?));
                }
                other if ANNOTATION_KEYWORDS.contains(&other) => {}
                other => {
                    return Err(SchemaError::UnsupportedKeyword {
                        keyword: other.to_string(),
                        pointer: display(pointer),
                    });
                }
            }
        }
        Ok(node)
    }

    /// Checks a value and appends every violation.
    fn check(&self, value: &Value, path: &str, errors: &mut Vec<String>) {
        let at = display(path);
        if let Some(constant) = &self.constant
            && !json_equal(constant, value)
        {
            errors.push(format!("{at}: {value} is not equal to {constant}"));
        }
        if let Some(allowed) = &self.allowed
            && !allowed.iter().any(|candidate| json_equal(candidate, value))
        {
            errors.push(format!("{at}: {value} is not one of the allowed values"));
        }
        if let Some(types) = &self.types
            && !types.iter().any(|kind| kind.matches(value))
        {
            let names: Vec<&str> = types.iter().map(|kind| kind.as_str()).collect();
            errors.push(format!("{at}: {value} is not of type {}", names.join(" or ")));
            return;
        }
        if let Some(number) = value.as_f64() {
            self.check_number(number, &at, errors);
        }
        if let Some(object) = value.as_object() {
            self.check_object(object, path, errors);
        }
        if let (Some(items), Some(array)) = (&self.items, value.as_array()) {
            for (index, item) in array.iter().enumerate() {
                items.check(item, &format!("{path}/{index}"), errors);
            }
        }
    }

    /// Applies numeric bounds.
    fn check_number(&self, number: f64, at: &str, errors: &mut Vec<String>) {
        if let Some(minimum) = self.minimum
            && number < minimum
        {
            errors.push(format!("{at}: {number} is less than the minimum of {minimum}"));
        }
        if let Some(maximum) = self.maximum
            && number > maximum
        {
            errors.push(format!("{at}: {number} is greater than the maximum of {maximum}"));
        }
        if let Some(bound) = self.exclusive_minimum
            && number <= bound
        {
            errors.push(format!(
                "{at}: {number} is less than or equal to the exclusive minimum of {bound}"
            ));
        }
    }

    /// Applies member rules.
    fn check_object(&self, object: &Map<String, Value>, path: &str, errors: &mut Vec<String>) {
        for name in &self.required {
            if !object.contains_key(name) {
                errors.push(format!("{}: missing required property `{name}`", display(path)));
            }
        }
        for (name, member) in object {
            let member_path = format!("{path}/{}", escape_pointer(name));
            if let Some(node) = self.properties.get(name) {
                node.check(member, &member_path, errors);
                continue;
            }
            match &self.additional {
                Additional::Allow => {}
                Additional::Deny => {
                    errors.push(format!(
                        "{}: additional property `{name}` is not allowed",
                        display(path)
                    ));
                }
                Additional::Schema(node) => node.check(member, &member_path, errors),
            }
        }
    }
}

// ============================================================================
// SECTION: Keyword Compilation
// ============================================================================

/// Compiles a `type` keyword.
fn compile_types(value: &Value, pointer: &str) -> Result<Vec<JsonType>, SchemaError> {
    let names: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(entries) => entries.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    if names.is_empty() || matches!(value, Value::Array(entries) if entries.len() != names.len()) {
        return Err(SchemaError::Invalid(format!("type at {} is malformed", display(pointer))));
    }
    names
        .into_iter()
        .map(|name| {
            JsonType::parse(name).ok_or_else(|| {
                SchemaError::Invalid(format!("unknown type `{name}` at {}", display(pointer)))
            })
        })
        .collect()
}

/// Compiles a `required` keyword.
fn compile_required(value: &Value, pointer: &str) -> Result<Vec<String>, SchemaError> {
    let entries = value.as_array().ok_or_else(|| {
        SchemaError::Invalid(format!("required at {} must be an array", display(pointer)))
    })?;
    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| {
                SchemaError::Invalid(format!("required at {} must list strings", display(pointer)))
            })
        })
        .collect()
}

/// Compiles a `properties` keyword.
fn compile_properties(value: &Value, pointer: &str) -> Result<BTreeMap<String, Node>, SchemaError> {
    let members = value.as_object().ok_or_else(|| {
        SchemaError::Invalid(format!("properties at {} must be an object", display(pointer)))
    })?;
    let mut properties = BTreeMap::new();
    for (name, schema) in members {
        let child = format!("{pointer}/properties/{}", escape_pointer(name));
        properties.insert(name.clone(), Node::compile(schema, &child)?);
    }
    Ok(properties)
}

/// Compiles an `additionalProperties` keyword.
fn compile_additional(value: &Value, pointer: &str) -> Result<Additional, SchemaError> {
    match value {
        Value::Bool(true) => Ok(Additional::Allow),
        Value::Bool(false) => Ok(Additional::Deny),
        Value::Object(_) => Ok(Additional::Schema(Box::new(Node::compile(
            value,
            &format!("{pointer}/additionalProperties"),
        )?))),
        _ => Err(SchemaError::Invalid(format!(
            "additionalProperties at {} must be a boolean or schema",
            display(pointer)
        ))),
    }
}

/// Compiles a numeric bound keyword.
fn compile_number(keyword: &str, value: &Value, pointer: &str) -> Result<f64, SchemaError> {
    value.as_f64().ok_or_else(|| {
        SchemaError::Invalid(format!("{keyword} at {} must be a number", display(pointer)))
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// JSON equality with numbers compared by value.
fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            a == b || a.as_f64().zip(b.as_f64()).is_some_and(|(x, y)| x.total_cmp(&y).is_eq())
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Escapes a member name for a JSON pointer.
fn escape_pointer(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}

/// Renders an empty pointer as the document root.
fn display(pointer: &str) -> String {
    if pointer.is_empty() { String::from("/") } else { pointer.to_string() }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::JsonType;
    use super::display;
    use super::escape_pointer;
    use super::json_equal;

    #[test]
    fn integer_type_accepts_whole_floats() {
        assert!(JsonType::Integer.matches(&json!(3)));
        assert!(JsonType::Integer.matches(&json!(3.0)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
    }

    #[test]
    fn pointer_escaping_follows_rfc6901() {
        assert_eq!(escape_pointer("a/b~c"), "a~1b~0c");
        assert_eq!(display(""), "/");
    }

    #[test]
    fn numeric_const_compares_by_value() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(!json_equal(&json!("1"), &json!(1)));
    }
}
