use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: set {env_var}")]
    MissingEnvVar { env_var: String },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Map a dotted settings path to the environment variable that supplies it.
pub fn to_env_var(field: &str) -> String {
    format!("HERON_{}", field.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "HERON_PROVIDER__API_KEY");
        assert_eq!(to_env_var("tavily.api_key"), "HERON_TAVILY__API_KEY");
        assert_eq!(to_env_var("type"), "HERON_TYPE");
    }
}
