use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{ToolHandler, ToolOutput};
use crate::errors::ToolResult;
use crate::models::tool::Tool;

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/api/rest_v1";

/// Page summaries from the Wikipedia REST API.
pub struct Wikipedia {
    tool: Tool,
    client: Client,
    base_url: String,
}

impl Default for Wikipedia {
    fn default() -> Self {
        Self::new()
    }
}

impl Wikipedia {
    pub fn new() -> Self {
        Self::with_base_url(WIKIPEDIA_API)
    }

    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            tool: Tool::new(
                "wikipedia",
                "Useful for getting quick summaries from Wikipedia",
                json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string", "description": "The topic to search on Wikipedia"}
                    },
                    "required": ["query"]
                }),
            ),
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn summary(&self, query: &str) -> Result<Value, reqwest::Error> {
        let title = urlencoding::encode(&query.replace(' ', "_")).into_owned();
        let url = format!(
            "{}/page/summary/{}",
            self.base_url.trim_end_matches('/'),
            title
        );
        self.client.get(url).send().await?.json().await
    }
}

#[async_trait]
impl ToolHandler for Wikipedia {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    fn marker_field(&self) -> Option<&str> {
        Some("query")
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let query = params.get("query").and_then(Value::as_str).unwrap_or_default();
        info!(query, "searching wikipedia");

        match self.summary(query).await {
            Ok(data) => match data.get("extract").and_then(Value::as_str) {
                Some(extract) => Ok(ToolOutput::text(extract)),
                None => Ok(ToolOutput::Structured(data)),
            },
            Err(e) => {
                warn!(error = %e, "wikipedia lookup failed");
                Ok(ToolOutput::text("Error: Could not fetch Wikipedia summary"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(query: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("query".into(), json!(query));
        params
    }

    #[tokio::test]
    async fn test_summary_extract() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Ada_Lovelace"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Ada Lovelace",
                "extract": "Ada Lovelace was an English mathematician."
            })))
            .mount(&server)
            .await;

        let output = Wikipedia::with_base_url(server.uri())
            .execute(params("Ada Lovelace"))
            .await
            .unwrap();
        assert_eq!(
            output,
            ToolOutput::text("Ada Lovelace was an English mathematician.")
        );
    }

    #[tokio::test]
    async fn test_missing_extract_is_structured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"type": "not_found"})))
            .mount(&server)
            .await;

        let output = Wikipedia::with_base_url(server.uri())
            .execute(params("Nope"))
            .await
            .unwrap();
        assert!(matches!(output, ToolOutput::Structured(_)));
    }

    #[tokio::test]
    async fn test_unreadable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let output = Wikipedia::with_base_url(server.uri())
            .execute(params("Rust"))
            .await
            .unwrap();
        assert_eq!(
            output,
            ToolOutput::text("Error: Could not fetch Wikipedia summary")
        );
    }
}
