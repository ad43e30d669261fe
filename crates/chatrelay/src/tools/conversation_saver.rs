use std::path::PathBuf;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use tokio::fs;
use tracing::{error, info};

use super::{OutputPolicy, ToolHandler, ToolOutput};
use crate::errors::ToolResult;
use crate::models::tool::Tool;

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"(?i)[^a-z0-9]").unwrap();
}

/// Writes a markdown summary of the conversation to disk.
pub struct ConversationSaver {
    tool: Tool,
    directory: PathBuf,
}

impl ConversationSaver {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            tool: Tool::new(
                "conversation_summary_saver",
                "Useful for saving a summary of the conversation to a markdown file",
                json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "Title of the conversation"},
                        "markdown": {
                            "type": "string",
                            "description": "The contents of this conversation and summary, in markdown format"
                        }
                    },
                    "required": ["title", "markdown"]
                }),
            ),
            directory,
        }
    }

    async fn save(&self, file_name: &str, markdown: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.directory).await?;
        fs::write(self.directory.join(file_name), markdown).await
    }
}

pub fn file_name_for(title: &str) -> String {
    format!(
        "{}.md",
        UNSAFE_FILENAME_CHARS.replace_all(title, "_").to_lowercase()
    )
}

#[async_trait]
impl ToolHandler for ConversationSaver {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    fn output_policy(&self) -> OutputPolicy {
        OutputPolicy::Passthrough
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let title = params.get("title").and_then(Value::as_str).unwrap_or_default();
        let markdown = params.get("markdown").and_then(Value::as_str).unwrap_or_default();
        let file_name = file_name_for(title);

        match self.save(&file_name, markdown).await {
            Ok(()) => {
                info!(file = %file_name, "saved conversation");
                Ok(ToolOutput::Text(format!("Conversation saved to {}", file_name)))
            }
            Err(e) => {
                error!(error = %e, "could not save conversation");
                Ok(ToolOutput::text("Error: Could not save conversation"))
            }
        }
    }
}
