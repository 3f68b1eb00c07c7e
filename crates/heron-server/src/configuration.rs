use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use heron::providers::configs::{OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig};
use heron::providers::ollama;
use heron::research::tavily::{TavilyConfig, TAVILY_HOST};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Default, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Failed to parse socket address")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    // Convert to the heron ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TavilySettings {
    pub api_key: String,
    #[serde(default = "default_tavily_host")]
    pub host: String,
}

impl TavilySettings {
    pub fn into_config(self) -> TavilyConfig {
        TavilyConfig {
            host: self.host,
            api_key: self.api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub tavily: TavilySettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("HERON")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        // Point at the missing environment variable instead of a serde path
        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // Extract field name from error message "missing field `type`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else if let config::ConfigError::NotFound(field) = &err {
                    let env_var = to_env_var(field);
                    Err(ConfigError::MissingEnvVar { env_var })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}

fn default_tavily_host() -> String {
    TAVILY_HOST.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("HERON_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();

        env::set_var("HERON_PROVIDER__TYPE", "openai");
        env::set_var("HERON_PROVIDER__API_KEY", "test-key");
        env::set_var("HERON_TAVILY__API_KEY", "tvly-test");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.tavily.api_key, "tvly-test");
        assert_eq!(settings.tavily.host, TAVILY_HOST);

        if let ProviderSettings::OpenAi {
            host,
            api_key,
            model,
            temperature,
            max_tokens,
        } = settings.provider
        {
            assert_eq!(host, "https://api.openai.com");
            assert_eq!(api_key, "test-key");
            assert_eq!(model, "gpt-4o");
            assert_eq!(temperature, None);
            assert_eq!(max_tokens, None);
        } else {
            panic!("Expected OpenAI provider");
        }

        env::remove_var("HERON_PROVIDER__TYPE");
        env::remove_var("HERON_PROVIDER__API_KEY");
        env::remove_var("HERON_TAVILY__API_KEY");
    }

    #[test]
    #[serial]
    fn test_ollama_settings() {
        clean_env();
        env::set_var("HERON_PROVIDER__TYPE", "ollama");
        env::set_var("HERON_PROVIDER__HOST", "http://custom.ollama.host");
        env::set_var("HERON_PROVIDER__MODEL", "llama3.2");
        env::set_var("HERON_PROVIDER__TEMPERATURE", "0.7");
        env::set_var("HERON_TAVILY__API_KEY", "tvly-test");

        let settings = Settings::new().unwrap();
        if let ProviderSettings::Ollama {
            host,
            model,
            temperature,
            max_tokens,
        } = settings.provider
        {
            assert_eq!(host, "http://custom.ollama.host");
            assert_eq!(model, "llama3.2");
            assert_eq!(temperature, Some(0.7));
            assert_eq!(max_tokens, None);
        } else {
            panic!("Expected Ollama provider");
        }

        env::remove_var("HERON_PROVIDER__TYPE");
        env::remove_var("HERON_PROVIDER__HOST");
        env::remove_var("HERON_PROVIDER__MODEL");
        env::remove_var("HERON_PROVIDER__TEMPERATURE");
        env::remove_var("HERON_TAVILY__API_KEY");
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("HERON_SERVER__PORT", "9090");
        env::set_var("HERON_PROVIDER__TYPE", "openai");
        env::set_var("HERON_PROVIDER__API_KEY", "test-key");
        env::set_var("HERON_PROVIDER__MODEL", "gpt-4o-mini");
        env::set_var("HERON_TAVILY__API_KEY", "tvly-test");
        env::set_var("HERON_TAVILY__HOST", "https://tavily.test");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.tavily.host, "https://tavily.test");

        if let ProviderSettings::OpenAi { model, .. } = settings.provider {
            assert_eq!(model, "gpt-4o-mini");
        } else {
            panic!("Expected OpenAI provider");
        }

        env::remove_var("HERON_SERVER__PORT");
        env::remove_var("HERON_PROVIDER__TYPE");
        env::remove_var("HERON_PROVIDER__API_KEY");
        env::remove_var("HERON_PROVIDER__MODEL");
        env::remove_var("HERON_TAVILY__API_KEY");
        env::remove_var("HERON_TAVILY__HOST");
    }

    #[test]
    #[serial]
    fn test_missing_tavily_key_is_reported() {
        clean_env();
        env::set_var("HERON_PROVIDER__TYPE", "ollama");

        let err = Settings::new().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { .. }));

        env::remove_var("HERON_PROVIDER__TYPE");
    }

    #[test]
    fn test_socket_addr_conversion() {
        let server_settings = ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 8080,
        };
        let addr = server_settings.socket_addr();
        assert_eq!(addr.to_string(), "127.0.0.1:8080");
    }
}
