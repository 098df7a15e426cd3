//! Process configuration read from the environment (and `.env`, if present).

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("setting {key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub project_id: String,
    pub admin_token: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub bcrypt_cost: u32,
    /// Per-connection outbound queue depth. Envelopes beyond it are dropped.
    pub outbound_queue: usize,
    pub media: MediaConfig,
    pub identity: IdentityConfig,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        Ok(Config {
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:8080"),
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 16)?,
            bcrypt_cost: parse(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            outbound_queue: parse(&lookup, "OUTBOUND_QUEUE", 64)?,
            media: MediaConfig {
                base_url: or_default("MEDIA_BASE_URL", "https://api.cloudinary.com"),
                cloud_name: required("MEDIA_CLOUD_NAME")?,
                api_key: required("MEDIA_API_KEY")?,
                api_secret: required("MEDIA_API_SECRET")?,
            },
            identity: IdentityConfig {
                base_url: or_default("IDENTITY_BASE_URL", "https://identitytoolkit.googleapis.com"),
                project_id: required("IDENTITY_PROJECT_ID")?,
                admin_token: required("IDENTITY_ADMIN_TOKEN")?,
            },
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}
