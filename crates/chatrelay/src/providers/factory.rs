use std::sync::Arc;

use super::{
    anthropic::AnthropicProvider,
    base::{ProviderHandle, ProviderId, ProviderTable},
    configs::ProviderConfig,
    openai::OpenAiCompatibleProvider,
};
use crate::errors::ProviderError;

pub fn get_provider(config: ProviderConfig) -> Result<ProviderHandle, ProviderError> {
    match config {
        ProviderConfig::OpenAiCompatible(config) => Ok(ProviderHandle::Delta(Arc::new(
            OpenAiCompatibleProvider::new(config)?,
        ))),
        ProviderConfig::Anthropic(config) => Ok(ProviderHandle::Block(Arc::new(
            AnthropicProvider::new(config)?,
        ))),
    }
}

/// Build the provider table from every configured vendor
pub fn build_table<I>(configs: I) -> Result<ProviderTable, ProviderError>
where
    I: IntoIterator<Item = ProviderConfig>,
{
    let mut table = ProviderTable::new();
    for config in configs {
        let provider: ProviderId = config.provider_id();
        let handle = get_provider(config)?;
        if handle.family() != provider.family() {
            return Err(ProviderError::WrongFamily(provider));
        }
        tracing::info!(%provider, "registering provider");
        table.insert(provider, handle);
    }
    Ok(table)
}
