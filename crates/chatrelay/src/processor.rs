//! Executes the tool markers found in a piece of text.

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{ToolError, ToolResult};
use crate::parameters::parse_parameters;
use crate::schema;
use crate::tools::{ToolOutput, ToolRegistry};

lazy_static! {
    static ref TOOL_MARKER: Regex = Regex::new(r"<tool>(\w+)</tool>([^<]+)").unwrap();
}

/// One marker that was executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub succeeded: bool,
}

/// Text with every marker replaced by its result or an inline error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedText {
    pub text: String,
    pub invocations: Vec<Invocation>,
}

impl ProcessedText {
    pub fn has_failures(&self) -> bool {
        self.invocations.iter().any(|i| !i.succeeded)
    }
}

pub struct ToolProcessor {
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
}

impl ToolProcessor {
    pub fn new(registry: Arc<ToolRegistry>, tool_timeout: Duration) -> Self {
        Self {
            registry,
            tool_timeout,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Replace each marker span, left to right. Never fails: every tool
    /// error becomes replacement text.
    ///
    /// The result is assembled from the original spans, so text produced
    /// by a tool is never scanned for further markers.
    pub async fn process(&self, text: &str) -> ProcessedText {
        let mut output = String::with_capacity(text.len());
        let mut invocations = Vec::new();
        let mut last = 0;

        let markers: Vec<_> = TOOL_MARKER
            .captures_iter(text)
            .filter_map(|captures| {
                let span = captures.get(0)?;
                Some((span.range(), captures.get(1)?.as_str(), captures.get(2)?.as_str()))
            })
            .collect();

        for (span, name, raw) in markers {
            output.push_str(&text[last..span.start]);

            let rendered = match self.invoke(name, raw).await {
                Ok(rendered) => {
                    invocations.push(Invocation {
                        name: name.to_string(),
                        succeeded: true,
                    });
                    rendered
                }
                Err(e) => {
                    warn!(tool = name, error = %e, "tool invocation failed");
                    invocations.push(Invocation {
                        name: name.to_string(),
                        succeeded: false,
                    });
                    render_error(name, &e)
                }
            };
            output.push_str(&rendered);
            last = span.end;
        }
        output.push_str(&text[last..]);

        ProcessedText {
            text: output,
            invocations,
        }
    }

    /// Resolve, parse and run a single call
    pub async fn invoke(&self, name: &str, raw_params: &str) -> ToolResult<String> {
        let handler = self
            .registry
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let params = parse_parameters(handler.tool(), raw_params)?;
        schema::validate(&handler.tool().parameters, &Value::Object(params.clone()))?;
        debug!(tool = name, ?params, "executing tool");

        let output = tokio::time::timeout(self.tool_timeout, handler.execute(params))
            .await
            .map_err(|_| ToolError::Timeout(self.tool_timeout))??;

        match output {
            ToolOutput::Text(text) => Ok(text),
            ToolOutput::Unfinished => Err(ToolError::Incomplete),
            ToolOutput::Structured(_) => Err(ToolError::Unrenderable),
        }
    }
}

fn render_error(name: &str, error: &ToolError) -> String {
    match error {
        ToolError::NotFound(_) | ToolError::Incomplete | ToolError::Unrenderable => {
            format!("Error: {}", error)
        }
        _ => format!("Error executing {}: {}", name, error),
    }
}
