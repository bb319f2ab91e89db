//! services/dashboard/src/config.rs
//!
//! Defines the dashboard's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;
use url::Url;

const DEFAULT_API_URL: &str = "https://bookshare-api.onrender.com/api/";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How the client proves who it is.
#[derive(Clone)]
pub enum Credentials {
    /// A bearer token issued earlier, optionally with the user id it belongs to.
    Token { token: String, user_id: Option<String> },
    /// Log in at startup to obtain the token and user id.
    Login { email: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token { user_id, .. } => f
                .debug_struct("Token")
                .field("user_id", user_id)
                .finish_non_exhaustive(),
            Credentials::Login { email, .. } => f
                .debug_struct("Login")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    pub credentials: Credentials,
    pub request_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load API Settings ---
        let api_url_str = lookup("BOOKSHARE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = parse_base_url(&api_url_str)
            .map_err(|e| ConfigError::InvalidValue("BOOKSHARE_API_URL".to_string(), e))?;

        let timeout_str = lookup("BOOKSHARE_TIMEOUT_SECS").unwrap_or_else(|| "30".to_string());
        let timeout_secs = timeout_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("BOOKSHARE_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Credentials ---
        // A token wins; otherwise both login fields are required.
        let credentials = match lookup("BOOKSHARE_TOKEN") {
            Some(token) if !token.trim().is_empty() => Credentials::Token {
                token,
                user_id: lookup("BOOKSHARE_USER_ID"),
            },
            _ => {
                let email = lookup("BOOKSHARE_EMAIL")
                    .ok_or_else(|| ConfigError::MissingVar("BOOKSHARE_TOKEN or BOOKSHARE_EMAIL".to_string()))?;
                let password = lookup("BOOKSHARE_PASSWORD")
                    .ok_or_else(|| ConfigError::MissingVar("BOOKSHARE_PASSWORD".to_string()))?;
                Credentials::Login { email, password }
            }
        };

        Ok(Self {
            api_url,
            credentials,
            request_timeout: Duration::from_secs(timeout_secs),
            log_level,
        })
    }
}

/// Parses the API base URL, adding the trailing slash `Url::join` needs.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
