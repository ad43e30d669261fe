//! Tool registry and the built-in tools.
//!
//! Every tool implements [`ToolHandler`]: a provider-facing [`Tool`]
//! description plus an async `execute`. The registry is built once at
//! startup and only read afterwards.

pub mod calculator;
pub mod chart_generator;
pub mod conversation_saver;
pub mod forecast;
pub mod github_review;
pub mod html;
pub mod image_generator;
pub mod urban_dictionary;
pub mod web_browser;
pub mod wikipedia;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{RegistryError, ToolResult};
use crate::models::tool::Tool;
use crate::providers::base::ProviderId;
use crate::schema;

/// What a tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Text(String),
    /// The tool ran but could not produce anything (bad input, upstream down)
    Unfinished,
    /// Structured output the relay does not know how to show
    Structured(Value),
}

impl ToolOutput {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ToolOutput::Text(text.into())
    }
}

/// How a tool's rendered output reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Shown exactly as produced
    Passthrough,
    /// Rewritten by a second, summarizing model call
    Summarize,
}

/// Core trait that defines a tool a model can call
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and parameter schema
    fn tool(&self) -> &Tool;

    fn name(&self) -> &str {
        &self.tool().name
    }

    fn output_policy(&self) -> OutputPolicy {
        OutputPolicy::Summarize
    }

    /// Field whose bare value forms the marker payload for structured calls
    fn marker_field(&self) -> Option<&str> {
        None
    }

    /// Providers whose function calling rejects this tool's schema
    fn unsupported_providers(&self) -> &[ProviderId] {
        &[]
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput>;
}

/// Settings for tools that reach external services.
#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub conversations_dir: PathBuf,
    pub github_token: Option<String>,
    pub image_generation: Option<ImageGenerationConfig>,
}

#[derive(Debug, Clone)]
pub struct ImageGenerationConfig {
    /// Base URL including the API version segment
    pub host: String,
    pub api_key: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            conversations_dir: PathBuf::from("conversations"),
            github_token: None,
            image_generation: None,
        }
    }
}

/// Ordered, name-unique list of tools.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Rejects duplicate names and schemas that do not compile
    pub fn new(handlers: Vec<Arc<dyn ToolHandler>>) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        for handler in &handlers {
            let tool = handler.tool();
            if !names.insert(tool.name.clone()) {
                return Err(RegistryError::DuplicateTool(tool.name.clone()));
            }
            schema::check(&tool.parameters).map_err(|message| RegistryError::InvalidSchema {
                name: tool.name.clone(),
                message,
            })?;
            debug!(tool = %tool.name, "registered tool");
        }
        Ok(Self { handlers })
    }

    /// The standard tool set. Image generation needs its own credentials.
    pub fn builtin(config: &ToolsConfig) -> Result<Self, RegistryError> {
        let mut handlers: Vec<Arc<dyn ToolHandler>> = vec![
            Arc::new(web_browser::WebBrowser::new()),
            Arc::new(wikipedia::Wikipedia::new()),
            Arc::new(calculator::Calculator::new()),
            Arc::new(github_review::GitHubReview::new(config.github_token.clone())),
            Arc::new(urban_dictionary::UrbanDictionary::new()),
            Arc::new(forecast::Forecast::new()),
            Arc::new(chart_generator::ChartGenerator::new()),
            Arc::new(conversation_saver::ConversationSaver::new(
                config.conversations_dir.clone(),
            )),
        ];
        if let Some(image) = &config.image_generation {
            handlers.push(Arc::new(image_generator::ImageGenerator::new(image.clone())));
        }
        Self::new(handlers)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.handlers.iter().find(|handler| handler.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolHandler>> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Every tool description
    pub fn tools(&self) -> Vec<Tool> {
        self.handlers.iter().map(|h| h.tool().clone()).collect()
    }

    /// Tool descriptions a given provider accepts
    pub fn tools_for(&self, provider: ProviderId) -> Vec<Tool> {
        self.handlers
            .iter()
            .filter(|h| !h.unsupported_providers().contains(&provider))
            .map(|h| h.tool().clone())
            .collect()
    }
}
