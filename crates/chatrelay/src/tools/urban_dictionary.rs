use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use url::Url;

use super::web_browser::AGENT;
use super::{html, ToolHandler, ToolOutput};
use crate::errors::ToolResult;
use crate::models::tool::Tool;

const URBAN_DICTIONARY: &str = "https://www.urbandictionary.com";

/// Slang lookups, returned as the text of the definitions page.
pub struct UrbanDictionary {
    tool: Tool,
    client: Client,
    base_url: String,
}

impl Default for UrbanDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl UrbanDictionary {
    pub fn new() -> Self {
        Self::with_base_url(URBAN_DICTIONARY)
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            tool: Tool::new(
                "urban_dictionary",
                "useful for looking up slang definitions and internet culture terms",
                json!({
                    "type": "object",
                    "properties": {
                        "term": {"type": "string", "description": "The term to look up"}
                    },
                    "required": ["term"]
                }),
            ),
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ToolHandler for UrbanDictionary {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let term = params.get("term").and_then(Value::as_str).unwrap_or_default();
        info!(term, "looking up slang");

        let Ok(url) = Url::parse(&format!(
            "{}/define.php?term={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(term)
        )) else {
            return Ok(ToolOutput::Unfinished);
        };

        let response = match self
            .client
            .get(url.clone())
            .header(USER_AGENT, AGENT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(status = %response.status(), "definition fetch failed");
                return Ok(ToolOutput::Unfinished);
            }
            Err(e) => {
                warn!(error = %e, "definition fetch failed");
                return Ok(ToolOutput::Unfinished);
            }
        };

        match response.text().await {
            Ok(body) => Ok(ToolOutput::Text(html::page_text(&body, &url))),
            Err(_) => Ok(ToolOutput::Unfinished),
        }
    }
}
