//! Recovery of tool parameters from model-written text.
//!
//! Models emit parameters either as free text after an inline marker or as
//! JSON assembled from streamed fragments. Both are often slightly broken:
//! objects glued together, trailing commas, a bare string where an object
//! was expected.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::ParameterError;
use crate::models::tool::Tool;
use crate::schema;

lazy_static! {
    static ref ADJACENT_OBJECTS: Regex = Regex::new(r"\}\s*\{").unwrap();
    static ref BARE_OBJECT: Regex = Regex::new(r"(?s)^\{(.+)\}$").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([\]}])").unwrap();
}

/// Apply the fixed set of JSON repairs and wrap objects into an array
pub fn repair_json(raw: &str) -> String {
    let text = raw.trim();
    let text = ADJACENT_OBJECTS.replace_all(text, "},{");
    let text = BARE_OBJECT.replace(&text, "[{$1}]");
    TRAILING_COMMA.replace_all(&text, "$1").into_owned()
}

/// Parse and validate the parameters for `tool` from raw model text.
pub fn parse_parameters(tool: &Tool, raw: &str) -> Result<Map<String, Value>, ParameterError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParameterError::Empty);
    }

    let repaired = repair_json(trimmed);
    let mut params = match tool.single_field() {
        Some(field) => parse_single_field(tool, field, trimmed, &repaired),
        None => parse_object(&repaired)?,
    };

    schema::apply_defaults(&tool.parameters, &mut params);
    schema::validate(&tool.parameters, &Value::Object(params.clone()))?;
    Ok(params)
}

fn parse_single_field(tool: &Tool, field: &str, trimmed: &str, repaired: &str) -> Map<String, Value> {
    let value = match serde_json::from_str::<Value>(repaired) {
        Ok(Value::Array(items)) => {
            let mut merged = Map::new();
            for item in items {
                if let Value::Object(object) = item {
                    merged.extend(object);
                }
            }
            match merged.remove(field) {
                Some(value) if is_present(&value) => value,
                Some(value) => {
                    merged.insert(field.to_string(), value);
                    Value::Object(merged)
                }
                None => Value::Object(merged),
            }
        }
        Ok(Value::Object(object)) if object.get(field).is_some_and(is_present) => {
            return object;
        }
        Ok(value) if expects_string(tool, field) && is_scalar(&value) => {
            Value::String(trimmed.to_string())
        }
        Ok(value) => value,
        Err(_) => Value::String(trimmed.to_string()),
    };

    let mut params = Map::new();
    params.insert(field.to_string(), value);
    params
}

fn parse_object(repaired: &str) -> Result<Map<String, Value>, ParameterError> {
    let parsed: Value =
        serde_json::from_str(repaired).map_err(|e| ParameterError::Syntax(e.to_string()))?;
    let candidate = match parsed {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    };
    match candidate {
        Value::Object(object) => Ok(object),
        other => Err(ParameterError::Schema {
            fields: vec!["parameters".to_string()],
            message: format!("expected an object, got {}", other),
        }),
    }
}

/// Mirrors truthiness: null, false, 0 and "" count as absent
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::Bool(_))
}

fn expects_string(tool: &Tool, field: &str) -> bool {
    tool.parameters["properties"][field]["type"] == "string"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn single(field: &str) -> Tool {
        Tool::new(
            "single",
            "one field",
            json!({
                "type": "object",
                "properties": {field: {"type": "string"}},
                "required": [field]
            }),
        )
    }

    fn numeric_single() -> Tool {
        Tool::new(
            "numeric",
            "one numeric field",
            json!({"type": "object", "properties": {"a": {"type": "number"}}, "required": ["a"]}),
        )
    }

    fn multi() -> Tool {
        Tool::new(
            "multi",
            "two fields",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {"type": "string"},
                    "size": {"type": "string", "enum": ["256x256", "512x512"], "default": "512x512"}
                },
                "required": ["prompt"]
            }),
        )
    }

    #[test]
    fn test_repair_json() {
        assert_eq!(repair_json("{\"a\":1}{\"a\":2}"), "[{\"a\":1},{\"a\":2}]");
        assert_eq!(repair_json(" {\"a\":1,} "), "[{\"a\":1}]");
        assert_eq!(repair_json("[1, 2, ]"), "[1, 2]");
        assert_eq!(repair_json("plain text"), "plain text");
    }

    #[test]
    fn test_empty_parameters() {
        assert_eq!(
            parse_parameters(&single("query"), "  \n "),
            Err(ParameterError::Empty)
        );
        assert_eq!(ParameterError::Empty.to_string(), "empty parameters");
    }

    #[test]
    fn test_single_field_free_text() {
        for text in ["https://example.com/page", "  Ada Lovelace  ", "what is {this"] {
            let params = parse_parameters(&single("query"), text).unwrap();
            assert_eq!(params["query"], json!(text.trim()));
        }
    }

    #[test]
    fn test_single_field_merges_glued_objects() {
        let params = parse_parameters(&numeric_single(), "{\"a\":1}{\"a\":2}").unwrap();
        assert_eq!(Value::Object(params), json!({"a": 2}));
    }

    #[test]
    fn test_single_field_object_passthrough() {
        let params = parse_parameters(&single("url"), "{\"url\": \"https://rust-lang.org\",}").unwrap();
        assert_eq!(params["url"], json!("https://rust-lang.org"));
    }

    #[test]
    fn test_single_field_scalar_kept_as_text() {
        let params = parse_parameters(&single("expression"), "42").unwrap();
        assert_eq!(params["expression"], json!("42"));
    }

    #[test]
    fn test_single_field_schema_violation() {
        let err = parse_parameters(&numeric_single(), "{\"b\": 3}").unwrap_err();
        match err {
            ParameterError::Schema { fields, .. } => assert_eq!(fields, vec!["a".to_string()]),
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_field_takes_first_object_and_defaults() {
        let params =
            parse_parameters(&multi(), "{\"prompt\":\"a fox\"}{\"prompt\":\"a dog\"}").unwrap();
        assert_eq!(params["prompt"], json!("a fox"));
        assert_eq!(params["size"], json!("512x512"));
    }

    #[test]
    fn test_multi_field_requires_json() {
        assert!(matches!(
            parse_parameters(&multi(), "draw a fox"),
            Err(ParameterError::Syntax(_))
        ));
    }

    #[test]
    fn test_multi_field_reports_bad_field() {
        match parse_parameters(&multi(), "{\"prompt\":\"x\",\"size\":\"3x3\"}") {
            Err(ParameterError::Schema { fields, .. }) => assert_eq!(fields, vec!["size".to_string()]),
            other => panic!("Expected schema error, got {:?}", other),
        }
    }
}
