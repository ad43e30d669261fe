use super::base::ProviderId;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

// Unified enum to wrap different provider configurations
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAiCompatible(OpenAiCompatibleConfig),
    Anthropic(AnthropicProviderConfig),
}

impl ProviderConfig {
    pub fn provider_id(&self) -> ProviderId {
        match self {
            ProviderConfig::OpenAiCompatible(config) => config.provider,
            ProviderConfig::Anthropic(_) => ProviderId::Anthropic,
        }
    }
}

/// Any vendor exposing the OpenAI chat completions shape.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    pub provider: ProviderId,
    /// Base URL including the API version segment
    pub host: String,
    pub api_key: String,
}

impl OpenAiCompatibleConfig {
    pub fn new<K: Into<String>>(provider: ProviderId, api_key: K) -> Self {
        Self {
            provider,
            host: provider.default_host().to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub max_tokens: u32,
}

impl AnthropicProviderConfig {
    pub fn new<K: Into<String>>(api_key: K) -> Self {
        Self {
            host: ProviderId::Anthropic.default_host().to_string(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_host<H: Into<String>>(mut self, host: H) -> Self {
        self.host = host.into();
        self
    }
}
