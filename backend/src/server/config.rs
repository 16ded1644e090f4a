//! Server settings loaded via OrthoConfig and the runtime configuration
//! built from them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::StoragePolicy;
use crate::domain::auth::{DEFAULT_TOKEN_VALIDITY, SigningSecret};
use crate::domain::resilience::{DEFAULT_READ_ATTEMPTS, DEFAULT_TIMEOUT};
use crate::outbound::persistence::DbPool;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BLOB_ROOT: &str = "data/blobs";

/// Settings read from `MARKET_*` environment variables, CLI flags and
/// configuration files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "MARKET")]
pub struct MarketSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL. In-memory adapters are used when absent.
    pub database_url: Option<String>,
    /// Directory holding uploaded covers and materials.
    pub blob_root: Option<PathBuf>,
    /// Lifetime of issued bearer tokens, in seconds.
    pub token_validity_secs: Option<u64>,
    /// Ceiling for a single storage call, in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Attempts made for idempotent storage reads.
    pub read_attempts: Option<u32>,
}

/// A setting that does not describe a usable value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {message}")]
    BindAddr { value: String, message: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

impl MarketSettings {
    /// Return the configured listen address, falling back to the default.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Directory under which uploaded blobs are stored.
    pub fn blob_root(&self) -> PathBuf {
        self.blob_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_ROOT))
    }

    /// Bearer token lifetime, rejecting a zero value.
    pub fn token_validity(&self) -> Result<Duration, SettingsError> {
        match self.token_validity_secs {
            None => Ok(DEFAULT_TOKEN_VALIDITY),
            Some(0) => Err(SettingsError::Zero {
                field: "token_validity_secs",
            }),
            Some(secs) => Ok(Duration::from_secs(secs)),
        }
    }

    /// Timeout and retry policy shared by every domain service.
    pub fn storage_policy(&self) -> Result<StoragePolicy, SettingsError> {
        let timeout = match self.request_timeout_ms {
            None => DEFAULT_TIMEOUT,
            Some(0) => {
                return Err(SettingsError::Zero {
                    field: "request_timeout_ms",
                });
            }
            Some(ms) => Duration::from_millis(ms),
        };
        let attempts = match self.read_attempts {
            None => DEFAULT_READ_ATTEMPTS,
            Some(0) => {
                return Err(SettingsError::Zero {
                    field: "read_attempts",
                });
            }
            Some(attempts) => attempts,
        };
        Ok(StoragePolicy::new(timeout, attempts))
    }
}

/// Everything the HTTP server needs once settings are resolved.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) secret: Arc<SigningSecret>,
    pub(crate) blob_root: PathBuf,
    pub(crate) token_validity: Duration,
    pub(crate) policy: StoragePolicy,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    /// Server configuration with default token validity and storage policy.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, secret: Arc<SigningSecret>, blob_root: PathBuf) -> Self {
        Self {
            bind_addr,
            secret,
            blob_root,
            token_validity: DEFAULT_TOKEN_VALIDITY,
            policy: StoragePolicy::default(),
            db_pool: None,
        }
    }

    /// Attach a database pool; the Diesel adapters replace the in-memory
    /// store.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_token_validity(mut self, validity: Duration) -> Self {
        self.token_validity = validity;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: StoragePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Socket address the HTTP server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
