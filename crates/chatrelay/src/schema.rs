//! JSON-schema helpers for tool parameters.

use jsonschema::error::ValidationErrorKind;
use serde_json::{Map, Value};

use crate::errors::ParameterError;

/// Check that a parameter schema compiles
pub fn check(schema: &Value) -> Result<(), String> {
    jsonschema::validator_for(schema)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Fill absent top-level properties that declare a `default`
pub fn apply_defaults(schema: &Value, params: &mut Map<String, Value>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    for (name, property) in properties {
        if let Some(default) = property.get("default") {
            params
                .entry(name.clone())
                .or_insert_with(|| default.clone());
        }
    }
}

/// Validate parameters, reporting the top-level fields that failed.
pub fn validate(schema: &Value, params: &Value) -> Result<(), ParameterError> {
    let validator = jsonschema::validator_for(schema).map_err(|e| ParameterError::Schema {
        fields: Vec::new(),
        message: format!("unusable schema: {}", e),
    })?;

    let mut fields: Vec<String> = Vec::new();
    let mut messages = Vec::new();
    for error in validator.iter_errors(params) {
        let field = failing_field(&error.instance_path.to_string(), &error.kind);
        if !fields.contains(&field) {
            fields.push(field);
        }
        messages.push(error.to_string());
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ParameterError::Schema {
            fields,
            message: messages.join("; "),
        })
    }
}

fn failing_field(instance_path: &str, kind: &ValidationErrorKind) -> String {
    let from_path = instance_path
        .trim_start_matches('/')
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(String::from);

    from_path
        .or_else(|| match kind {
            ValidationErrorKind::Required { property } => property.as_str().map(String::from),
            _ => None,
        })
        .unwrap_or_else(|| "parameters".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string"},
                "size": {"type": "string", "enum": ["256x256", "512x512", "1024x1024"], "default": "512x512"}
            },
            "required": ["prompt"]
        })
    }

    #[test]
    fn test_defaults_fill_missing_only() {
        let mut params = Map::new();
        params.insert("prompt".into(), json!("a cat"));
        apply_defaults(&image_schema(), &mut params);
        assert_eq!(params["size"], json!("512x512"));

        let mut params = Map::new();
        params.insert("size".into(), json!("256x256"));
        apply_defaults(&image_schema(), &mut params);
        assert_eq!(params["size"], json!("256x256"));
    }

    #[test]
    fn test_conforming_example_validates() {
        let example = json!({"prompt": "a lighthouse", "size": "1024x1024"});
        assert!(validate(&image_schema(), &example).is_ok());
        assert!(check(&image_schema()).is_ok());
    }

    #[test]
    fn test_reports_failing_fields() {
        let err = validate(&image_schema(), &json!({"size": "9x9"})).unwrap_err();
        match err {
            ParameterError::Schema { mut fields, .. } => {
                fields.sort();
                assert_eq!(fields, vec!["prompt".to_string(), "size".to_string()]);
            }
            other => panic!("Expected schema error, got {:?}", other),
        }
    }
}
