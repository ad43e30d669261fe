use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{ImageGenerationConfig, OutputPolicy, ToolHandler, ToolOutput};
use crate::errors::ToolResult;
use crate::models::tool::Tool;

pub const GENERATION_FAILED: &str = "Error: Could not generate image";

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: Option<String>,
}

/// Image generation through an OpenAI-style images endpoint.
pub struct ImageGenerator {
    tool: Tool,
    client: Client,
    config: ImageGenerationConfig,
}

impl ImageGenerator {
    pub fn new(config: ImageGenerationConfig) -> Self {
        Self {
            tool: Tool::new(
                "image_generator",
                "Useful for generating images based on text descriptions using DALL-E or similar services",
                json!({
                    "type": "object",
                    "properties": {
                        "prompt": {"type": "string", "description": "Description of the image to generate"},
                        "size": {
                            "type": "string",
                            "enum": ["256x256", "512x512", "1024x1024"],
                            "default": "512x512"
                        }
                    },
                    "required": ["prompt"]
                }),
            ),
            client: Client::new(),
            config,
        }
    }

    async fn generate(&self, prompt: &str, size: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!(
            "{}/images/generations",
            self.config.host.trim_end_matches('/')
        );
        let response: ImagesResponse = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({"prompt": prompt, "size": size, "n": 1}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.data.into_iter().next().and_then(|image| image.url))
    }
}

#[async_trait]
impl ToolHandler for ImageGenerator {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    fn output_policy(&self) -> OutputPolicy {
        OutputPolicy::Passthrough
    }

    async fn execute(&self, params: Map<String, Value>) -> ToolResult<ToolOutput> {
        let prompt = params.get("prompt").and_then(Value::as_str).unwrap_or_default();
        let size = params.get("size").and_then(Value::as_str).unwrap_or("512x512");
        info!(prompt, size, "generating image");

        match self.generate(prompt, size).await {
            Ok(Some(url)) => Ok(ToolOutput::Text(format!("![Generated Image]({})", url))),
            Ok(None) => Ok(ToolOutput::text(GENERATION_FAILED)),
            Err(e) => {
                warn!(error = %e, "image generation failed");
                Ok(ToolOutput::text(GENERATION_FAILED))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer) -> ImageGenerator {
        ImageGenerator::new(ImageGenerationConfig {
            host: format!("{}/v1", server.uri()),
            api_key: "test-key".into(),
        })
    }

    fn params(prompt: &str, size: &str) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("prompt".into(), json!(prompt));
        params.insert("size".into(), json!(size));
        params
    }

    #[tokio::test]
    async fn test_generates_markdown_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(json!({"prompt": "a red fox", "size": "256x256", "n": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1,
                "data": [{"url": "https://images.example/fox.png"}]
            })))
            .mount(&server)
            .await;

        let output = generator(&server)
            .execute(params("a red fox", "256x256"))
            .await
            .unwrap();
        assert_eq!(
            output,
            ToolOutput::text("![Generated Image](https://images.example/fox.png)")
        );
    }

    #[tokio::test]
    async fn test_upstream_error_is_reported_inline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "bad"}})))
            .mount(&server)
            .await;

        let output = generator(&server)
            .execute(params("a red fox", "512x512"))
            .await
            .unwrap();
        assert_eq!(output, ToolOutput::text(GENERATION_FAILED));
    }
}
