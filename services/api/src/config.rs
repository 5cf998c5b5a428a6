//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Backend credentials have no defaults:
//! the service refuses to start without them.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which chat-completion API answers tutor questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatProvider {
    Anthropic,
    OpenAi,
}

impl ChatProvider {
    fn default_model(&self) -> &'static str {
        match self {
            ChatProvider::Anthropic => "claude-sonnet-4-20250514",
            ChatProvider::OpenAi => "gpt-4o",
        }
    }
}

impl FromStr for ChatProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ChatProvider::Anthropic),
            "openai" => Ok(ChatProvider::OpenAi),
            other => Err(format!("'{}' is not one of anthropic, openai", other)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub storage_bucket: String,
    pub chat_provider: ChatProvider,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub chat_max_tokens: u32,
    pub cors_origin: String,
    pub expose_provider_errors: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };

        // --- Server and Database Settings ---
        let bind_address_str = get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = required("DATABASE_URL")?;

        let log_level_str = get("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Hosted Backend ---
        let supabase_url = required("SUPABASE_URL")?.trim_end_matches('/').to_string();
        let supabase_anon_key = required("SUPABASE_ANON_KEY")?;
        let storage_bucket = get("STORAGE_BUCKET").unwrap_or_else(|| "uploads".to_string());

        // --- Chat Provider ---
        let chat_provider = match get("CHAT_PROVIDER") {
            Some(value) => value
                .parse::<ChatProvider>()
                .map_err(|e| ConfigError::InvalidValue("CHAT_PROVIDER".to_string(), e))?,
            None => ChatProvider::Anthropic,
        };
        let anthropic_api_key = get("ANTHROPIC_API_KEY").filter(|v| !v.trim().is_empty());
        let openai_api_key = get("OPENAI_API_KEY").filter(|v| !v.trim().is_empty());
        match chat_provider {
            ChatProvider::Anthropic if anthropic_api_key.is_none() => {
                return Err(ConfigError::MissingVar("ANTHROPIC_API_KEY".to_string()))
            }
            ChatProvider::OpenAi if openai_api_key.is_none() => {
                return Err(ConfigError::MissingVar("OPENAI_API_KEY".to_string()))
            }
            _ => {}
        }

        let chat_model =
            get("CHAT_MODEL").unwrap_or_else(|| chat_provider.default_model().to_string());
        let chat_max_tokens = match get("CHAT_MAX_TOKENS") {
            Some(value) => value.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("CHAT_MAX_TOKENS".to_string(), e.to_string())
            })?,
            None => 1024,
        };

        let cors_origin = get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        axum::http::HeaderValue::from_str(&cors_origin).map_err(|e| {
            ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
        })?;
        let expose_provider_errors = match get("EXPOSE_PROVIDER_ERRORS") {
            Some(value) => value.parse::<bool>().map_err(|e| {
                ConfigError::InvalidValue("EXPOSE_PROVIDER_ERRORS".to_string(), e.to_string())
            })?,
            None => false,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            supabase_url,
            supabase_anon_key,
            storage_bucket,
            chat_provider,
            anthropic_api_key,
            openai_api_key,
            chat_model,
            chat_max_tokens,
            cors_origin,
            expose_provider_errors,
        })
    }
}

/// Configuration of the `teech` terminal client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub log_level: Level,
    /// A session token from an earlier run, resumed at startup.
    pub session_token: Option<String>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let api_url = std::env::var("TEECH_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;
        let session_token = std::env::var("TEECH_SESSION")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Ok(Self {
            api_url,
            log_level,
            session_token,
        })
    }
}
