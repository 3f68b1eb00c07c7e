use heron::providers::configs::ProviderConfig;
use heron::research::tavily::TavilyConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub provider_config: ProviderConfig,
    pub tavily_config: TavilyConfig,
}
