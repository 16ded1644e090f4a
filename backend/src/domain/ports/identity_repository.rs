//! Driven port for identity persistence.

use async_trait::async_trait;

use crate::domain::{DisplayName, Email, Identity, IdentityId, PhoneNumber, ProfilePatch, Role};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity repository adapters.
    pub enum IdentityRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "identity repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "identity repository query failed: {message}",
        /// Another identity already uses this email.
        DuplicateEmail { email: String } => "email {email} is already registered",
    }
}

/// A validated registration with its password already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub display_name: DisplayName,
    pub email: Email,
    pub role: Role,
    pub phone: Option<PhoneNumber>,
    pub password_hash: String,
}

/// Identity row together with the stored password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub identity: Identity,
    pub password_hash: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Insert a new identity, assigning its id and creation time.
    async fn insert(&self, identity: &NewIdentity) -> Result<Identity, IdentityRepositoryError>;

    async fn find_by_id(&self, id: IdentityId) -> Result<Option<Identity>, IdentityRepositoryError>;

    /// Look up login material by (normalised) email.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<StoredCredentials>, IdentityRepositoryError>;

    /// Apply a profile patch; `None` when the identity does not exist.
    async fn update_profile(
        &self,
        id: IdentityId,
        patch: &ProfilePatch,
    ) -> Result<Option<Identity>, IdentityRepositoryError>;

    async fn update_role(
        &self,
        id: IdentityId,
        role: Role,
    ) -> Result<Option<Identity>, IdentityRepositoryError>;
}
