//! Driving port for registration, login and identity self-service.

use async_trait::async_trait;

use crate::domain::auth::{IssuedToken, LoginCredentials, Registration};
use crate::domain::{Error, Identity, IdentityId, ProfilePatch, Role};

/// Successful login: who logged in and the bearer token to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub token: IssuedToken,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Create an identity; fails with `conflict` when the email is taken.
    async fn register(&self, registration: &Registration) -> Result<Identity, Error>;

    /// Check credentials and mint a bearer token.
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error>;

    /// Change the caller's own display name or phone.
    async fn update_profile(
        &self,
        identity: &Identity,
        patch: &ProfilePatch,
    ) -> Result<Identity, Error>;

    /// Change another identity's role. Only administrators may do this.
    async fn assign_role(
        &self,
        acting: &Identity,
        target: IdentityId,
        role: Role,
    ) -> Result<Identity, Error>;
}
