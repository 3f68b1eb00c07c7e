use std::sync::Arc;

use anyhow::Result;

use super::base::Provider;
use super::configs::ProviderConfig;
use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;

/// Construct a provider from its configuration.
///
/// Providers are shared between the agent loop and the response formatter,
/// hence the `Arc`.
pub fn get_provider(config: ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Arc::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Ollama(ollama_config) => Ok(Arc::new(OllamaProvider::new(ollama_config)?)),
    }
}
