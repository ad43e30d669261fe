use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use url::Url;

use super::{html, ToolHandler, ToolOutput};
use crate::errors::ToolResult;
use crate::models::tool::Tool;

pub const AGENT: &str = "Mozilla/5.0 (compatible; chatrelay/0.1)";

/// Fetches a page and returns its visible text.
pub struct WebBrowser {
    tool: Tool,
    client: Client,
}

impl Default for WebBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl WebBrowser {
    pub fn new() -> Self {
        Self {
            tool: Tool::new(
                "web_browser",
                "useful for when you need to get live information from a webpage.",
                json!({
                    "type": "object",
                    "properties": {
                        "url": {"type": "string", "description": "The URL to browse"}
                    },
                    "required": ["url"]
                }),
            ),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ToolHandler for WebBrowser {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    fn marker_field(&self) -> Option<&str> {
        Some("url")
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let raw = params.get("url").and_then(Value::as_str).unwrap_or_default();
        let url = match Url::parse(&raw.replace('`', "")) {
            Ok(url) if url.host_str().is_some() => url,
            _ => {
                warn!(url = raw, "refusing to browse invalid url");
                return Ok(ToolOutput::Unfinished);
            }
        };

        info!(%url, "browsing");
        let response = match self
            .client
            .get(url.clone())
            .header(USER_AGENT, AGENT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!(%url, status = %response.status(), "page fetch failed");
                return Ok(ToolOutput::Unfinished);
            }
            Err(e) => {
                warn!(%url, error = %e, "page fetch failed");
                return Ok(ToolOutput::Unfinished);
            }
        };

        match response.text().await {
            Ok(body) => Ok(ToolOutput::Text(html::page_text(&body, &url))),
            Err(_) => Ok(ToolOutput::Unfinished),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(url: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("url".into(), json!(url));
        params
    }

    #[tokio::test]
    async fn test_browse_returns_page_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Hello from the page</p></body></html>"),
            )
            .mount(&server)
            .await;

        let output = WebBrowser::new()
            .execute(params(&format!("{}/article", server.uri())))
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::text("Hello from the page"));
    }

    #[tokio::test]
    async fn test_browse_unfinished_on_bad_input() {
        let browser = WebBrowser::new();
        assert_eq!(
            browser.execute(params("not a url")).await.unwrap(),
            ToolOutput::Unfinished
        );

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        assert_eq!(
            browser.execute(params(&server.uri())).await.unwrap(),
            ToolOutput::Unfinished
        );
    }
}
