//! Driving port used by the authentication middleware to turn a verified
//! identity id into the full record.

use async_trait::async_trait;

use crate::domain::auth::AuthError;
use crate::domain::{Identity, IdentityId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityQuery: Send + Sync {
    /// Load the identity a verified token claims to be.
    async fn resolve(&self, claimed: IdentityId) -> Result<Identity, AuthError>;
}
