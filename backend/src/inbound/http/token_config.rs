//! Signing key configuration for bearer tokens.
//!
//! The key is read once at startup from the file named by `TOKEN_KEY_FILE`
//! and validated according to the build mode. Release builds insist on a key
//! of at least [`MIN_SECRET_BYTES`]; debug builds, or any build with
//! `TOKEN_ALLOW_EPHEMERAL=1`, fall back to a random per-process key when the
//! file is unreadable.

use std::path::PathBuf;

use mockable::Env;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::domain::auth::{MIN_SECRET_BYTES, SigningSecret};

const TOKEN_KEY_DEFAULT_PATH: &str = "/var/run/secrets/token_key";
const KEY_FILE_ENV: &str = "TOKEN_KEY_FILE";
const ALLOW_EPHEMERAL_ENV: &str = "TOKEN_ALLOW_EPHEMERAL";
const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";

/// Build mode for key validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds tolerate missing or short keys with a warning.
    Debug,
    /// Release builds require a readable key of sufficient length.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    ///
    /// ```rust
    /// use course_market::inbound::http::token_config::BuildMode;
    ///
    /// let mode = BuildMode::from_debug_assertions();
    /// assert_eq!(mode == BuildMode::Debug, cfg!(debug_assertions));
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Errors raised while loading the signing key.
#[derive(thiserror::Error, Debug)]
pub enum TokenConfigError {
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("failed to read token signing key at {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token signing key at {path} too short: need >= {min_len} bytes, got {length}")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
}

/// Load the process-wide signing secret.
///
/// # Examples
///
/// ```rust
/// use course_market::inbound::http::token_config::{signing_secret_from_env, BuildMode};
/// use mockable::MockEnv;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("token_key_example");
/// std::fs::write(&key_path, vec![b'k'; 32])?;
///
/// let key_path = key_path.to_string_lossy().into_owned();
/// let mut env = MockEnv::new();
/// env.expect_string().returning(move |name| match name {
///     "TOKEN_KEY_FILE" => Some(key_path.clone()),
///     _ => None,
/// });
///
/// let secret = signing_secret_from_env(&env, BuildMode::Release)?;
/// assert_eq!(secret.len(), 32);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TokenConfigError`] when the key is unreadable or too short and
/// no ephemeral fallback is permitted.
pub fn signing_secret_from_env<E: Env>(
    env: &E,
    mode: BuildMode,
) -> Result<SigningSecret, TokenConfigError> {
    let allow_ephemeral = allow_ephemeral_from_env(env)?;
    let path = PathBuf::from(
        env.string(KEY_FILE_ENV)
            .unwrap_or_else(|| TOKEN_KEY_DEFAULT_PATH.to_owned()),
    );

    let secret = match std::fs::read(&path) {
        Ok(mut bytes) => {
            let length = bytes.len();
            if length < MIN_SECRET_BYTES {
                if !mode.is_debug() {
                    bytes.zeroize();
                    return Err(TokenConfigError::KeyTooShort {
                        path,
                        length,
                        min_len: MIN_SECRET_BYTES,
                    });
                }
                warn!(path = %path.display(), length, "token signing key shorter than recommended");
            }
            SigningSecret::from_bytes(bytes)
        }
        Err(error) => {
            if !(mode.is_debug() || allow_ephemeral) {
                return Err(TokenConfigError::KeyRead {
                    path,
                    source: error,
                });
            }
            warn!(
                path = %path.display(),
                error = %error,
                "using ephemeral token signing key; tokens will not survive a restart"
            );
            SigningSecret::generate()
        }
    };

    info!(fingerprint = %secret.fingerprint(), "token signing key loaded");
    Ok(secret)
}

fn allow_ephemeral_from_env<E: Env>(env: &E) -> Result<bool, TokenConfigError> {
    let Some(value) = env.string(ALLOW_EPHEMERAL_ENV) else {
        return Ok(false);
    };
    parse_bool(&value).ok_or(TokenConfigError::InvalidEnv {
        name: ALLOW_EPHEMERAL_ENV,
        value,
        expected: BOOL_EXPECTED,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
