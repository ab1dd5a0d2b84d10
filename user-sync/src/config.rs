//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup into [`Config`], which is then shared
//! with every handler through the application state.

use sqlx::postgres::PgConnectOptions;
use std::env;
use thiserror::Error;
use tracing::warn;

/// Default Slack Web API base URL.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret Slack sends in every event envelope
    pub verification_token: String,

    /// Bot token used for the initial `users.list` sync
    pub bot_token: Option<String>,

    /// Signing secret for `X-Slack-Signature` verification
    pub signing_secret: Option<String>,

    /// Maximum age in seconds for signed request timestamps
    pub signature_max_age: u64,

    /// Slack Web API base URL
    pub slack_api_url: String,

    /// Static key required by the user listing endpoint
    pub api_key: String,

    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub db_host: String,
    pub db_port: u16,

    /// Maximum number of pooled database connections
    pub db_max_connections: u32,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            verification_token: required("SLACK_VERIFICATION_TOKEN")?,

            bot_token: optional("SLACK_BOT_TOKEN"),

            signing_secret: optional("SLACK_SIGNING_SECRET"),

            signature_max_age: parse_or("SLACK_SIGNATURE_MAX_AGE", 300), // 5 minutes default

            slack_api_url: env::var("SLACK_API_URL")
                .unwrap_or_else(|_| DEFAULT_SLACK_API_URL.to_string()),

            api_key: required("API_KEY")?,

            db_user: env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            db_password: env::var("DB_PASSWORD").unwrap_or_default(),
            db_name: env::var("DB_NAME").unwrap_or_else(|_| "postgres".to_string()),
            db_host: env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            db_port: parse_or("DB_PORT", 5432),

            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10),

            port: parse_or("PORT", 8080),
        })
    }

    /// Postgres connection options built from the database credentials.
    pub fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.db_host)
            .port(self.db_port)
            .username(&self.db_user)
            .database(&self.db_name);

        if self.db_password.is_empty() {
            options
        } else {
            options.password(&self.db_password)
        }
    }
}

/// Read a variable that must be present and non-empty.
fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Read a variable, treating blank values as unset.
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with fixed secrets for unit tests.
    pub fn for_tests() -> Self {
        Config {
            verification_token: "test-token".to_string(),
            bot_token: None,
            signing_secret: None,
            signature_max_age: 300,
            slack_api_url: DEFAULT_SLACK_API_URL.to_string(),
            api_key: "test-apikey".to_string(),
            db_user: "postgres".to_string(),
            db_password: String::new(),
            db_name: "postgres".to_string(),
            db_host: "localhost".to_string(),
            db_port: 5432,
            db_max_connections: 10,
            port: 8080,
        }
    }
}
