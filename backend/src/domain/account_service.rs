//! Registration, login and identity self-service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::auth::{LoginCredentials, Registration, TokenIssuer};
use super::ports::{
    AccountService, IdentityRepository, IdentityRepositoryError, LoginOutcome, NewIdentity,
    PasswordHashError, PasswordHasher,
};
use super::resilience::{StoragePolicy, TimedOut};
use super::{Error, Identity, IdentityId, ProfilePatch, Role};

const INVALID_CREDENTIALS: &str = "invalid email or password";

fn map_repository_error(error: IdentityRepositoryError) -> Error {
    match error {
        IdentityRepositoryError::Connection { message } => {
            Error::transient(format!("identity store unavailable: {message}"))
        }
        IdentityRepositoryError::Query { message } => {
            Error::internal(format!("identity store error: {message}"))
        }
        IdentityRepositoryError::DuplicateEmail { email } => {
            Error::conflict(format!("email {email} is already registered"))
        }
    }
}

fn map_timeout(error: TimedOut) -> Error {
    Error::transient(error.to_string())
}

fn map_hash_error(error: PasswordHashError) -> Error {
    Error::internal(error.to_string())
}

/// [`AccountService`] backed by an identity repository and password hasher.
pub struct AccountManager<R, H> {
    identities: Arc<R>,
    hasher: Arc<H>,
    issuer: TokenIssuer,
    policy: StoragePolicy,
}

impl<R, H> AccountManager<R, H>
where
    R: IdentityRepository,
    H: PasswordHasher + 'static,
{
    pub fn new(
        identities: Arc<R>,
        hasher: Arc<H>,
        issuer: TokenIssuer,
        policy: StoragePolicy,
    ) -> Self {
        Self {
            identities,
            hasher,
            issuer,
            policy,
        }
    }

    /// Run the CPU-heavy hasher off the async executor.
    async fn with_hasher<T, F>(&self, op: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&H) -> Result<T, PasswordHashError> + Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || op(hasher.as_ref()))
            .await
            .map_err(|err| Error::internal(format!("password hashing task failed: {err}")))?
            .map_err(map_hash_error)
    }
}

#[async_trait]
impl<R, H> AccountService for AccountManager<R, H>
where
    R: IdentityRepository,
    H: PasswordHasher + 'static,
{
    async fn register(&self, registration: &Registration) -> Result<Identity, Error> {
        let password = Zeroizing::new(registration.password().to_owned());
        let password_hash = self
            .with_hasher(move |hasher| hasher.hash(password.as_str()))
            .await?;
        let new_identity = NewIdentity {
            display_name: registration.display_name.clone(),
            email: registration.email.clone(),
            role: registration.role,
            phone: registration.phone.clone(),
            password_hash,
        };
        let identity = self
            .policy
            .bounded("identity insert", self.identities.insert(&new_identity))
            .await
            .map_err(map_timeout)?
            .map_err(map_repository_error)?;
        info!(identity_id = %identity.id, role = %identity.role, "identity registered");
        Ok(identity)
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginOutcome, Error> {
        let stored = self
            .policy
            .read("credential lookup", || async {
                self.policy
                    .bounded(
                        "credential lookup",
                        self.identities.find_credentials(credentials.email()),
                    )
                    .await
                    .map_err(map_timeout)?
                    .map_err(map_repository_error)
            })
            .await?;
        let Some(stored) = stored else {
            info!("login rejected: unknown email");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let password = Zeroizing::new(credentials.password().to_owned());
        let hash = stored.password_hash;
        let matches = self
            .with_hasher(move |hasher| hasher.verify(password.as_str(), &hash))
            .await?;
        if !matches {
            info!(identity_id = %stored.identity.id, "login rejected: wrong password");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let token = self.issuer.issue(stored.identity.id)?;
        info!(identity_id = %stored.identity.id, expires_at = %token.expires_at, "token issued");
        Ok(LoginOutcome {
            identity: stored.identity,
            token,
        })
    }

    async fn update_profile(
        &self,
        identity: &Identity,
        patch: &ProfilePatch,
    ) -> Result<Identity, Error> {
        if patch.is_empty() {
            return Ok(identity.clone());
        }
        self.policy
            .bounded(
                "profile update",
                self.identities.update_profile(identity.id, patch),
            )
            .await
            .map_err(map_timeout)?
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("identity {} not found", identity.id)))
    }

    async fn assign_role(
        &self,
        acting: &Identity,
        target: IdentityId,
        role: Role,
    ) -> Result<Identity, Error> {
        if !acting.is_admin() {
            warn!(acting = %acting.id, target = %target, "non-admin attempted a role change");
            return Err(Error::forbidden("only administrators may change roles"));
        }
        let updated = self
            .policy
            .bounded("role update", self.identities.update_role(target, role))
            .await
            .map_err(map_timeout)?
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("identity {target} not found")))?;
        info!(acting = %acting.id, target = %target, role = %role, "role changed");
        Ok(updated)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
