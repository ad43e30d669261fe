use crate::error::{to_env_var, ConfigError};
use chatrelay::orchestrator::Limits;
use chatrelay::providers::base::ProviderId;
use chatrelay::providers::configs::{
    AnthropicProviderConfig, OpenAiCompatibleConfig, ProviderConfig,
};
use chatrelay::tools::{ImageGenerationConfig, ToolsConfig};
use config::{Config, Environment};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CHATRELAY";

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

/// Credentials for one vendor. `host` overrides the vendor's default base URL.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCredentials {
    pub api_key: String,
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProvidersSettings {
    pub openai: Option<ProviderCredentials>,
    pub gemini: Option<ProviderCredentials>,
    pub deepseek: Option<ProviderCredentials>,
    pub grok: Option<ProviderCredentials>,
    pub qwen: Option<ProviderCredentials>,
    pub groq: Option<ProviderCredentials>,
    pub cerebras: Option<ProviderCredentials>,
    pub anthropic: Option<ProviderCredentials>,
}

impl ProvidersSettings {
    fn entries(&self) -> [(ProviderId, Option<&ProviderCredentials>); 8] {
        [
            (ProviderId::OpenAi, self.openai.as_ref()),
            (ProviderId::Gemini, self.gemini.as_ref()),
            (ProviderId::DeepSeek, self.deepseek.as_ref()),
            (ProviderId::Grok, self.grok.as_ref()),
            (ProviderId::Qwen, self.qwen.as_ref()),
            (ProviderId::Groq, self.groq.as_ref()),
            (ProviderId::Cerebras, self.cerebras.as_ref()),
            (ProviderId::Anthropic, self.anthropic.as_ref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, creds)| creds.is_none())
    }

    // Convert to the chatrelay ProviderConfig list
    pub fn into_configs(&self, max_tokens: u32) -> Vec<ProviderConfig> {
        self.entries()
            .into_iter()
            .filter_map(|(provider, creds)| creds.map(|creds| (provider, creds)))
            .map(|(provider, creds)| match provider {
                ProviderId::Anthropic => {
                    let mut config = AnthropicProviderConfig::new(creds.api_key.clone());
                    config.max_tokens = max_tokens;
                    if let Some(host) = &creds.host {
                        config = config.with_host(host.clone());
                    }
                    ProviderConfig::Anthropic(config)
                }
                _ => {
                    let mut config = OpenAiCompatibleConfig::new(provider, creds.api_key.clone());
                    if let Some(host) = &creds.host {
                        config = config.with_host(host.clone());
                    }
                    ProviderConfig::OpenAiCompatible(config)
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitsSettings {
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_stream_idle_timeout_secs")]
    pub stream_idle_timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            stream_idle_timeout_secs: default_stream_idle_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LimitsSettings {
    pub fn limits(&self) -> Limits {
        Limits {
            tool_timeout: Duration::from_secs(self.tool_timeout_secs),
            idle_timeout: Duration::from_secs(self.stream_idle_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationSettings {
    pub api_key: String,
    #[serde(default = "default_image_host")]
    pub host: String,
}

#[derive(Debug, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_conversations_dir")]
    pub conversations_dir: PathBuf,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub image_generation: Option<ImageGenerationSettings>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            conversations_dir: default_conversations_dir(),
            github_token: None,
            image_generation: None,
        }
    }
}

impl ToolSettings {
    pub fn tools_config(&self) -> ToolsConfig {
        ToolsConfig {
            conversations_dir: self.conversations_dir.clone(),
            github_token: self.github_token.clone(),
            image_generation: self.image_generation.as_ref().map(|image| {
                ImageGenerationConfig {
                    host: image.host.clone(),
                    api_key: image.api_key.clone(),
                }
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub providers: ProvidersSettings,
    #[serde(default)]
    pub limits: LimitsSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Handle missing field errors specially
        let settings = match result {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `api_key`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .split('`')
                        .next()
                        .unwrap_or_default();
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                } else if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                return Err(ConfigError::Other(err));
            }
        };

        if settings.providers.is_empty() {
            return Err(ConfigError::NoProviders { prefix: ENV_PREFIX });
        }
        Ok(settings)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_stream_idle_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    chatrelay::providers::configs::DEFAULT_MAX_TOKENS
}

fn default_image_host() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_conversations_dir() -> PathBuf {
    PathBuf::from("conversations")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}
