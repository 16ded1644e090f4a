//! Identity resolution for authenticated requests.
//!
//! [`IdentityResolver`] turns a verified identity id into the stored record.
//! [`Authenticator`] chains the token verifier and the resolver so a request
//! either carries a resolved identity, carries none, or is rejected before a
//! handler runs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::auth::{AuthError, CredentialVerifier};
use super::ports::{IdentityQuery, IdentityRepository, IdentityRepositoryError};
use super::resilience::{StoragePolicy, TimedOut, Transience};
use super::{Identity, IdentityId};

impl Transience for AuthError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl From<TimedOut> for AuthError {
    fn from(value: TimedOut) -> Self {
        Self::Unavailable {
            message: value.to_string(),
        }
    }
}

impl From<IdentityRepositoryError> for AuthError {
    fn from(value: IdentityRepositoryError) -> Self {
        Self::Unavailable {
            message: value.to_string(),
        }
    }
}

/// Looks identities up in the identity repository.
pub struct IdentityResolver<R> {
    identities: Arc<R>,
    policy: StoragePolicy,
}

impl<R> IdentityResolver<R> {
    /// Resolver over `identities`, bounded by `policy`.
    pub fn new(identities: Arc<R>, policy: StoragePolicy) -> Self {
        Self { identities, policy }
    }
}

#[async_trait]
impl<R> IdentityQuery for IdentityResolver<R>
where
    R: IdentityRepository,
{
    async fn resolve(&self, claimed: IdentityId) -> Result<Identity, AuthError> {
        let found = self
            .policy
            .read("identity lookup", || async {
                self.policy
                    .bounded("identity lookup", self.identities.find_by_id(claimed))
                    .await?
                    .map_err(AuthError::from)
            })
            .await?;
        found.ok_or(AuthError::UnknownIdentity { id: claimed })
    }
}

/// Verifies the bearer header of a request and resolves its identity.
#[derive(Clone)]
pub struct Authenticator {
    verifier: CredentialVerifier,
    identities: Arc<dyn IdentityQuery>,
}

impl Authenticator {
    pub fn new(verifier: CredentialVerifier, identities: Arc<dyn IdentityQuery>) -> Self {
        Self {
            verifier,
            identities,
        }
    }

    /// Resolve the caller behind an `Authorization` header.
    ///
    /// An absent header yields `Ok(None)`: anonymous callers may still read.
    /// A present header must verify and resolve, otherwise the error is
    /// returned and no lookup happens for tokens that fail verification.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Option<Identity>, AuthError> {
        if header.is_none() {
            return Ok(None);
        }
        let claimed = self.verifier.verify_header(header)?;
        let identity = self.identities.resolve(claimed).await?;
        debug!(identity_id = %identity.id, role = %identity.role, "request authenticated");
        Ok(Some(identity))
    }
}
