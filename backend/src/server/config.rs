//! Environment-driven application configuration.

use std::env;
use std::net::SocketAddr;

use actix_web::cookie::Key;
use thiserror::Error;
use tracing::warn;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Errors raised while loading [`AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent.
    #[error("required environment variable {name} is not set")]
    MissingVar {
        /// Variable name.
        name: &'static str,
    },
    /// A variable is present but unparseable.
    #[error("environment variable {name} is invalid: {message}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Parse failure detail.
        message: String,
    },
    /// The session key file could not be read outside debug builds.
    #[error("failed to read session key at {path}: {message}")]
    SessionKey {
        /// Configured key path.
        path: String,
        /// Read failure detail.
        message: String,
    },
}

/// Resolved application configuration.
pub struct AppConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Socket the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Bucket confirmed uploads land in.
    pub bucket: String,
    /// Endpoint override for S3-compatible stores; `None` uses the SDK's
    /// default resolution.
    pub s3_endpoint: Option<Url>,
    /// Public CDN base fronting the bucket; `None` falls back to presigned
    /// GET URLs.
    pub cdn_base_url: Option<Url>,
    /// Whether session cookies require HTTPS.
    pub cookie_secure: bool,
    /// Whether `google/` models go directly to the Gemini API instead of
    /// via OpenRouter.
    pub gemini_direct: bool,
    /// Session signing key.
    pub session_key: Key,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar { name })
}

fn optional_url(name: &'static str) -> Result<Option<Url>, ConfigError> {
    match env::var(name) {
        Ok(raw) => Url::parse(&raw)
            .map(Some)
            .map_err(|error| ConfigError::InvalidVar {
                name,
                message: error.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn read_session_key(path: &str) -> Result<Key, ConfigError> {
    let bytes = std::fs::read(path).map_err(|error| ConfigError::SessionKey {
        path: path.to_owned(),
        message: error.to_string(),
    })?;
    // Key::derive_from panics below 32 bytes of input.
    if bytes.len() < 32 {
        return Err(ConfigError::SessionKey {
            path: path.to_owned(),
            message: format!("key material too short: {} bytes, need 32", bytes.len()),
        });
    }
    Ok(Key::derive_from(&bytes))
}

fn load_session_key() -> Result<Key, ConfigError> {
    let path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| DEFAULT_SESSION_KEY_FILE.to_owned());
    match read_session_key(&path) {
        Ok(key) => Ok(key),
        Err(error) => {
            let allow_ephemeral = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_ephemeral {
                warn!(path = %path, error = %error, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(error)
            }
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required variable is absent, a value
    /// fails to parse, or the session key cannot be established.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let bucket = required("S3_BUCKET")?;
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_owned())
            .parse()
            .map_err(|error: std::net::AddrParseError| ConfigError::InvalidVar {
                name: "BIND_ADDR",
                message: error.to_string(),
            })?;
        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .map(|value| value != "0")
            .unwrap_or(true);
        let gemini_direct = env::var("GEMINI_DIRECT").ok().as_deref() == Some("1");
        Ok(Self {
            database_url,
            bind_addr,
            bucket,
            s3_endpoint: optional_url("S3_ENDPOINT_URL")?,
            cdn_base_url: optional_url("CDN_BASE_URL")?,
            cookie_secure,
            gemini_direct,
            session_key: load_session_key()?,
        })
    }
}
