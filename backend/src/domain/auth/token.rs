//! Bearer token issuance and verification.
//!
//! Tokens are compact HS256 JSON Web Signatures: three base64url segments
//! `header.claims.signature`, where the signature is HMAC-SHA256 over
//! `header.claims` keyed with the process-wide [`SigningSecret`]. The claims
//! carry the identity id (`sub`) and the validity window (`iat`, `exp`) in
//! Unix seconds.
//!
//! Verification performs no I/O. It consults only the token, the secret and
//! the clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::AuthError;
use crate::domain::{Error, IdentityId};

type HmacSha256 = Hmac<Sha256>;

/// Validity window applied when none is configured.
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(3600);
/// Shortest secret accepted outside ephemeral development mode.
pub const MIN_SECRET_BYTES: usize = 32;

const ALGORITHM: &str = "HS256";
const FINGERPRINT_BYTES: usize = 8;
const GENERATED_SECRET_BYTES: usize = 64;

/// HMAC key shared by the issuer and the verifier.
///
/// Loaded once at startup and never mutated. The bytes are wiped on drop.
pub struct SigningSecret(Zeroizing<Vec<u8>>);

impl SigningSecret {
    /// Wrap key material read from configuration.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Random 64-byte secret for development runs, drawn from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new(vec![0_u8; GENERATED_SECRET_BYTES]);
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Secret length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Truncated SHA-256 of the key, safe to log.
    ///
    /// ```
    /// use course_market::domain::auth::SigningSecret;
    ///
    /// let fp = SigningSecret::from_bytes(vec![7; 32]).fingerprint();
    /// assert_eq!(fp.len(), 16);
    /// ```
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_slice());
        hex::encode(digest.get(..FINGERPRINT_BYTES).unwrap_or_default())
    }

    fn mac(&self) -> Result<HmacSha256, hmac::digest::InvalidLength> {
        HmacSha256::new_from_slice(self.0.as_slice())
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i64,
    iat: i64,
    exp: i64,
}

/// A freshly minted bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints bearer tokens for authenticated identities.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: Arc<SigningSecret>,
    validity: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Issuer signing with `secret`; tokens expire after `validity`.
    #[must_use]
    pub fn new(secret: Arc<SigningSecret>, validity: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            secret,
            validity,
            clock,
        }
    }

    /// Sign a token for `identity` valid from now for the configured window.
    pub fn issue(&self, identity: IdentityId) -> Result<IssuedToken, Error> {
        let now = self.clock.utc();
        let validity = chrono::Duration::from_std(self.validity)
            .map_err(|_| Error::internal("token validity window out of range"))?;
        let expires_at = now + validity;
        let header = Header {
            alg: ALGORITHM.to_owned(),
            typ: Some("JWT".to_owned()),
        };
        let claims = Claims {
            sub: identity.get(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
        let mut mac = self
            .secret
            .mac()
            .map_err(|err| Error::internal(format!("signing key rejected: {err}")))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(IssuedToken {
            token: format!("{signing_input}.{signature}"),
            expires_at,
        })
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, Error> {
    serde_json::to_vec(value)
        .map(|json| URL_SAFE_NO_PAD.encode(json))
        .map_err(|err| Error::internal(format!("token encoding failed: {err}")))
}

/// Checks bearer tokens and yields the claimed identity.
#[derive(Clone)]
pub struct CredentialVerifier {
    secret: Arc<SigningSecret>,
    clock: Arc<dyn Clock>,
}

impl CredentialVerifier {
    /// Verifier checking signatures against `secret` and expiry against `clock`.
    #[must_use]
    pub fn new(secret: Arc<SigningSecret>, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<IdentityId, AuthError> {
        let raw = header.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Err(AuthError::Missing);
        }
        let (scheme, token) = raw.split_once(' ').unwrap_or((raw, ""));
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::Malformed {
                reason: "expected the Bearer scheme",
            });
        }
        self.verify(token)
    }

    /// Verify a compact token and return the identity it was issued to.
    pub fn verify(&self, token: &str) -> Result<IdentityId, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Missing);
        }
        let mut segments = token.split('.');
        let (Some(header_segment), Some(claims_segment), Some(signature_segment), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(malformed("expected three dot-separated segments"));
        };

        let header: Header = decode_json(header_segment, "header is not valid base64url JSON")?;
        if header.alg != ALGORITHM {
            return Err(malformed("unsupported signing algorithm"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_segment)
            .map_err(|_| malformed("signature is not valid base64url"))?;
        let mut mac = self
            .secret
            .mac()
            .map_err(|_| malformed("signing key rejected"))?;
        mac.update(header_segment.as_bytes());
        mac.update(b".");
        mac.update(claims_segment.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| malformed("signature does not match"))?;

        let claims: Claims = decode_json(claims_segment, "claims are not valid base64url JSON")?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| malformed("expiry is out of range"))?;
        if self.clock.utc() >= expires_at {
            return Err(AuthError::Expired);
        }
        Ok(IdentityId::new(claims.sub))
    }
}

const fn malformed(reason: &'static str) -> AuthError {
    AuthError::Malformed { reason }
}

fn decode_json<T: serde::de::DeserializeOwned>(
    segment: &str,
    reason: &'static str,
) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| malformed(reason))?;
    serde_json::from_slice(&bytes).map_err(|_| malformed(reason))
}

#[cfg(test)]
mod tests;
