use serde::Deserialize;
use std::env;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_CONTEXT_CHUNK_SIZE: usize = 4000;
const DEFAULT_CONTEXT_TOP_K: usize = 3;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the pagechat server.
///
/// Loaded once at startup and handed to the components that need it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Credential for the Gemini generation API.
    pub gemini_api_key: String,
    /// Gemini model identifier used for answers.
    pub gemini_model: String,
    /// Base URL of the Gemini REST API (overridable for tests and proxies).
    pub gemini_base_url: String,
    /// Maximum characters per document chunk fed to the relevance selector.
    pub context_chunk_size: usize,
    /// Number of chunks selected as model context per question.
    pub context_top_k: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let positive = |key: &str| -> Result<Option<usize>, ConfigError> {
            optional(key)
                .map(|value| match value.trim().parse::<usize>() {
                    Ok(parsed) if parsed > 0 => Ok(parsed),
                    _ => Err(ConfigError::InvalidValue(key.to_string())),
                })
                .transpose()
        };

        Ok(Self {
            gemini_api_key: optional("GEMINI_API_KEY")
                .ok_or_else(|| ConfigError::MissingVariable("GEMINI_API_KEY".into()))?,
            gemini_model: optional("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            gemini_base_url: optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            context_chunk_size: positive("CONTEXT_CHUNK_SIZE")?
                .unwrap_or(DEFAULT_CONTEXT_CHUNK_SIZE),
            context_top_k: positive("CONTEXT_TOP_K")?.unwrap_or(DEFAULT_CONTEXT_TOP_K),
            server_port: optional("SERVER_PORT")
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

/// Load `.env` (when present) and build the configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        model = %config.gemini_model,
        base_url = %config.gemini_base_url,
        chunk_size = config.context_chunk_size,
        top_k = config.context_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
