//! Server settings read from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LEXAI_BIND` | `127.0.0.1:8000` |
//! | `LEXAI_DATABASE` | `lexai.db` |
//! | `LEXAI_JWT_SECRET` | random per process |
//! | `LEXAI_TOKEN_TTL` | `30m` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

pub const BIND_ENV: &str = "LEXAI_BIND";
pub const DATABASE_ENV: &str = "LEXAI_DATABASE";
pub const JWT_SECRET_ENV: &str = "LEXAI_JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "LEXAI_TOKEN_TTL";

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_DATABASE: &str = "lexai.db";
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Error, Debug)]
pub enum ServerConfigError {
    #[error("Invalid LEXAI_BIND '{0}' (expected host:port)")]
    InvalidBind(String),

    #[error("Invalid LEXAI_TOKEN_TTL '{value}': {reason}")]
    InvalidTokenTtl { value: String, reason: String },
}

#[derive(Debug)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database: PathBuf,
    /// Token signing secret. `None` means a random one per process.
    pub jwt_secret: Option<SecretString>,
    pub token_ttl: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from `lookup`; unset and empty values take the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let bind_text = get(BIND_ENV).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_text
            .parse()
            .map_err(|_| ServerConfigError::InvalidBind(bind_text.clone()))?;

        let token_ttl = match get(TOKEN_TTL_ENV) {
            Some(value) => match humantime::parse_duration(&value) {
                Ok(ttl) if !ttl.is_zero() => ttl,
                Ok(_) => {
                    return Err(ServerConfigError::InvalidTokenTtl {
                        value,
                        reason: "must be greater than zero".to_string(),
                    })
                }
                Err(e) => {
                    return Err(ServerConfigError::InvalidTokenTtl {
                        value,
                        reason: e.to_string(),
                    })
                }
            },
            None => DEFAULT_TOKEN_TTL,
        };

        Ok(Self {
            bind,
            database: get(DATABASE_ENV)
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
                .into(),
            jwt_secret: get(JWT_SECRET_ENV).map(SecretString::from),
            token_ttl,
        })
    }
}
