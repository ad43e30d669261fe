use serde::Serialize;

use super::message::Role;
use crate::providers::base::ProviderId;

/// Static description of a chat model and the quirks of serving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "provider")]
    pub provider_id: ProviderId,
    pub supports_streaming: bool,
    pub supports_tools: bool,
    /// Role used for the instructional message; some models reject `system`
    pub system_role: Role,
}

impl ModelDescriptor {
    pub fn new<N: Into<String>, L: Into<String>>(name: N, label: L, provider_id: ProviderId) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            provider_id,
            supports_streaming: true,
            supports_tools: true,
            system_role: Role::System,
        }
    }

    pub fn without_streaming(mut self) -> Self {
        self.supports_streaming = false;
        self
    }

    pub fn without_tools(mut self) -> Self {
        self.supports_tools = false;
        self
    }

    pub fn with_system_role(mut self, role: Role) -> Self {
        self.system_role = role;
        self
    }
}

/// Read-only lookup table of the models the relay can serve.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self { models }
    }

    pub fn builtin() -> Self {
        use ProviderId::*;
        Self::new(vec![
            ModelDescriptor::new("gpt-4o-mini", "GPT-4o Mini", OpenAi),
            ModelDescriptor::new("gpt-4o", "GPT-4o", OpenAi),
            ModelDescriptor::new("o1-mini", "o1 Mini", OpenAi)
                .without_streaming()
                .without_tools()
                .with_system_role(Role::User),
            ModelDescriptor::new("o1-preview", "o1 Preview", OpenAi)
                .without_streaming()
                .without_tools()
                .with_system_role(Role::User),
            ModelDescriptor::new("gemini-1.5-flash", "Gemini 1.5 Flash", Gemini),
            ModelDescriptor::new("gemini-1.5-pro", "Gemini 1.5 Pro", Gemini),
            ModelDescriptor::new(
                "claude-3-5-sonnet-20241022",
                "Claude 3.5 Sonnet",
                Anthropic,
            ),
            ModelDescriptor::new("claude-3-5-haiku-20241022", "Claude 3.5 Haiku", Anthropic),
            ModelDescriptor::new("deepseek-chat", "DeepSeek Chat", DeepSeek),
            ModelDescriptor::new("deepseek-reasoner", "DeepSeek Reasoner", DeepSeek)
                .without_tools()
                .with_system_role(Role::User),
            ModelDescriptor::new("grok-beta", "Grok Beta", Grok),
            ModelDescriptor::new("qwen-plus", "Qwen Plus", Qwen),
            ModelDescriptor::new("llama-3.3-70b-versatile", "Llama 3.3 70B (Groq)", Groq),
            ModelDescriptor::new("llama3.1-8b", "Llama 3.1 8B (Cerebras)", Cerebras).without_tools(),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|model| model.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_names_are_unique() {
        let registry = ModelRegistry::builtin();
        let mut seen = HashSet::new();
        for model in registry.iter() {
            assert!(seen.insert(model.name.clone()), "duplicate {}", model.name);
        }
    }

    #[test]
    fn test_lookup() {
        let registry = ModelRegistry::builtin();
        let o1 = registry.get("o1-mini").unwrap();
        assert!(!o1.supports_streaming);
        assert_eq!(o1.system_role, Role::User);
        assert_eq!(
            registry.get("claude-3-5-sonnet-20241022").unwrap().provider_id,
            ProviderId::Anthropic
        );
        assert!(registry.get("gpt-17").is_none());
    }
}
