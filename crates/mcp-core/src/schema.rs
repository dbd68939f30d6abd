//! Schema helpers
//!
//! Builders for the JSON-schema fragments used in tool descriptors, plus the
//! argument checks a server runs before handing arguments to a tool.

use serde_json::{Map, Number, Value, json};
use thiserror::Error;

/// Why a set of arguments does not satisfy a tool's input schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be {expected}, got {found}")]
    InvalidType {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("field '{field}' item {index} must be {expected}, got {found}")]
    InvalidItem {
        field: String,
        index: usize,
        expected: &'static str,
        found: String,
    },
}

/// Create a JSON Schema object type
///
/// # Arguments
///
/// * `properties` - Map of property names to their schemas
/// * `required` - List of required property names
///
/// # Example
///
/// ```
/// use mcp_core::schema::{object, number};
/// use serde_json::json;
///
/// let schema = object(
///     json!({
///         "a": number(Some("First number")),
///         "b": number(Some("Second number")),
///     }),
///     vec!["a", "b"],
/// );
/// assert_eq!(schema["required"][1], "b");
/// ```
pub fn object(properties: Value, required: Vec<&str>) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn typed(kind: &str, description: Option<&str>) -> Value {
    if let Some(d) = description {
        json!({
            "type": kind,
            "description": d,
        })
    } else {
        json!({"type": kind})
    }
}

/// Create a JSON Schema number type
pub fn number(description: Option<&str>) -> Value {
    typed("number", description)
}

/// Create a JSON Schema array type
///
/// # Arguments
///
/// * `items` - Schema for array items
/// * `description` - Optional description of the array field
pub fn array(items: Value, description: Option<&str>) -> Value {
    let mut schema = typed("array", description);
    schema["items"] = items;
    schema
}

/// One declared parameter of a tool, as read from its input schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    /// JSON-schema type name; array parameters read `array<item type>`
    pub kind: String,
    pub required: bool,
    pub description: Option<String>,
}

/// List the parameters declared by an object schema
pub fn parameters(schema: &Value) -> Vec<ParameterSpec> {
    let required = required_fields(schema);
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, property)| ParameterSpec {
            name: name.clone(),
            kind: type_label(property),
            required: required.iter().any(|r| r == name),
            description: property
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

fn type_label(property: &Value) -> String {
    let kind = property.get("type").and_then(Value::as_str).unwrap_or("any");
    if kind == "array" {
        let item = property
            .get("items")
            .and_then(|items| items.get("type"))
            .and_then(Value::as_str)
            .unwrap_or("any");
        format!("array<{item}>")
    } else {
        kind.to_string()
    }
}

fn required_fields(schema: &Value) -> Vec<String> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Check arguments against an object schema and coerce them to declared types
///
/// Required fields must be present. Numeric fields accept JSON numbers and
/// numeric strings; booleans and null are never numbers. Array fields must be
/// arrays whose items satisfy `items`. Keys the schema does not declare are
/// dropped.
pub fn coerce_arguments(
    schema: &Value,
    arguments: &Value,
) -> Result<Map<String, Value>, SchemaError> {
    let empty = Map::new();
    let arguments = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => return Err(SchemaError::NotAnObject(json_type_name(other))),
    };

    let mut coerced = Map::new();

    for field in required_fields(schema) {
        if !arguments.contains_key(&field) {
            return Err(SchemaError::MissingField(field));
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, property) in properties {
            if let Some(value) = arguments.get(name) {
                coerced.insert(name.clone(), coerce_field(name, value, property)?);
            }
        }
    }

    Ok(coerced)
}

fn coerce_field(field: &str, value: &Value, property: &Value) -> Result<Value, SchemaError> {
    let Some(kind) = property.get("type").and_then(Value::as_str) else {
        return Ok(value.clone());
    };

    if kind == "array" {
        let Value::Array(items) = value else {
            return Err(SchemaError::InvalidType {
                field: field.to_string(),
                expected: "an array",
                found: describe(value),
            });
        };
        let item_schema = property.get("items").cloned().unwrap_or(Value::Null);
        return items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                coerce_scalar(&item_schema, item).ok_or_else(|| SchemaError::InvalidItem {
                    field: field.to_string(),
                    index,
                    expected: expected_label(&item_schema),
                    found: describe(item),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    coerce_scalar(property, value).ok_or_else(|| SchemaError::InvalidType {
        field: field.to_string(),
        expected: expected_label(property),
        found: describe(value),
    })
}

fn coerce_scalar(schema: &Value, value: &Value) -> Option<Value> {
    match schema.get("type").and_then(Value::as_str) {
        Some("number") => to_f64(value)
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some("integer") => to_f64(value)
            .filter(|n| n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15)
            .map(|n| Value::from(n as i64)),
        Some("string") => value.is_string().then(|| value.clone()),
        Some("boolean") => value.is_boolean().then(|| value.clone()),
        Some("object") => value.is_object().then(|| value.clone()),
        _ => Some(value.clone()),
    }
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn expected_label(schema: &Value) -> &'static str {
    match schema.get("type").and_then(Value::as_str) {
        Some("number") => "a number",
        Some("integer") => "an integer",
        Some("string") => "a string",
        Some("boolean") => "a boolean",
        Some("object") => "an object",
        Some("array") => "an array",
        _ => "a value",
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string {s:?}"),
        Value::Null => "null".to_string(),
        other => format!("{} {other}", json_type_name(other)),
    }
}

/// JSON type name of a value
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_schema() -> Value {
        object(
            json!({
                "a": number(Some("First number")),
                "b": number(Some("Second number")),
            }),
            vec!["a", "b"],
        )
    }

    fn list_schema() -> Value {
        object(
            json!({
                "numbers": array(number(None), Some("List of numbers")),
            }),
            vec!["numbers"],
        )
    }

    #[test]
    fn test_array_schema() {
        let schema = array(number(None), Some("List of numbers"));

        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["type"], "number");
        assert!(schema["items"].get("description").is_none());
        assert_eq!(schema["description"], "List of numbers");
    }

    #[test]
    fn test_parameters_mirror_schema() {
        let params = parameters(&list_schema());
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "numbers");
        assert_eq!(params[0].kind, "array<number>");
        assert!(params[0].required);
        assert_eq!(params[0].description.as_deref(), Some("List of numbers"));

        let params = parameters(&pair_schema());
        let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(params.iter().all(|p| p.kind == "number" && p.required));
    }

    #[test]
    fn test_coerce_numbers() {
        let args = coerce_arguments(&pair_schema(), &json!({"a": 54, "b": "6.5"})).unwrap();
        assert_eq!(args["a"].as_f64(), Some(54.0));
        assert_eq!(args["b"].as_f64(), Some(6.5));
    }

    #[test]
    fn test_coerce_drops_undeclared_keys() {
        let args =
            coerce_arguments(&pair_schema(), &json!({"a": 1, "b": 2, "verbose": true})).unwrap();
        assert!(!args.contains_key("verbose"));
    }

    #[test]
    fn test_missing_field() {
        let err = coerce_arguments(&pair_schema(), &json!({"a": 1})).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("b".to_string()));
        assert_eq!(err.to_string(), "missing required field 'b'");

        let err = coerce_arguments(&pair_schema(), &Value::Null).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("a".to_string()));
    }

    #[test]
    fn test_non_numeric_rejected() {
        for bad in [json!("abc"), json!(true), json!(null), json!({"x": 1}), json!([1])] {
            let err = coerce_arguments(&pair_schema(), &json!({"a": bad, "b": 1})).unwrap_err();
            assert!(matches!(err, SchemaError::InvalidType { ref field, .. } if field == "a"));
        }
    }

    #[test]
    fn test_array_items_checked() {
        let args = coerce_arguments(&list_schema(), &json!({"numbers": [1, "2", 3.5]})).unwrap();
        assert_eq!(args["numbers"], json!([1.0, 2.0, 3.5]));

        let err = coerce_arguments(&list_schema(), &json!({"numbers": [1, "two"]})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field 'numbers' item 1 must be a number, got string \"two\""
        );

        let err = coerce_arguments(&list_schema(), &json!({"numbers": 5})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { expected: "an array", .. }));
    }

    #[test]
    fn test_empty_array_accepted() {
        let args = coerce_arguments(&list_schema(), &json!({"numbers": []})).unwrap();
        assert_eq!(args["numbers"], json!([]));
    }

    #[test]
    fn test_non_object_arguments() {
        let err = coerce_arguments(&pair_schema(), &json!([1, 2])).unwrap_err();
        assert_eq!(err, SchemaError::NotAnObject("array"));
    }
}
