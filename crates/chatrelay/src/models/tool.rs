use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool as described to a model: name, description and JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema for the parameters the tool accepts
    pub parameters: Value,
}

impl Tool {
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names of the declared parameter fields, in schema order
    pub fn field_names(&self) -> Vec<&str> {
        self.parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The field name when the schema declares exactly one
    pub fn single_field(&self) -> Option<&str> {
        match self.field_names().as_slice() {
            [field] => Some(field),
            _ => None,
        }
    }
}

/// A tool call assembled from streamed provider deltas.
///
/// `arguments` is the raw concatenation of argument fragments in arrival
/// order; it is only parsed once the call is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingToolCall {
    pub name: String,
    pub arguments: String,
}

impl PendingToolCall {
    pub fn new<N: Into<String>, A: Into<String>>(name: N, arguments: A) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}
