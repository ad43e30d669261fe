use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("No provider is configured; set at least one {prefix}_PROVIDERS__<ID>__API_KEY")]
    NoProviders { prefix: &'static str },

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that feeds a dotted settings key
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "{}_{}",
        crate::configuration::ENV_PREFIX,
        field_path.to_uppercase().replace('.', "__")
    )
}
