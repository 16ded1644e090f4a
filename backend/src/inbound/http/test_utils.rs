//! Test helpers for inbound HTTP components.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;

use crate::domain::auth::{AuthError, CredentialVerifier, SigningSecret, TokenIssuer};
use crate::domain::ports::{
    MockAccountService, MockCourseCommand, MockCourseQuery, MockIdentityQuery,
    MockMaterialCommand, MockMaterialQuery,
};
use crate::domain::{Authenticator, Identity, IdentityId};
use crate::inbound::http::state::HttpState;
use crate::middleware::Authenticate;

/// Mocked driving ports, converted into [`HttpState`] once configured.
#[derive(Default)]
pub struct MockPorts {
    pub accounts: MockAccountService,
    pub courses: MockCourseCommand,
    pub course_query: MockCourseQuery,
    pub materials: MockMaterialCommand,
    pub material_query: MockMaterialQuery,
}

impl MockPorts {
    /// Handler state backed by these mocks.
    pub fn into_state(self) -> HttpState {
        HttpState {
            accounts: Arc::new(self.accounts),
            courses: Arc::new(self.courses),
            course_query: Arc::new(self.course_query),
            materials: Arc::new(self.materials),
            material_query: Arc::new(self.material_query),
        }
    }
}

/// Real token verification over a fixed set of known identities.
pub struct TestAuth {
    secret: Arc<SigningSecret>,
    known: Vec<Identity>,
}

impl TestAuth {
    /// Token issuer that resolves only the `known` identities.
    pub fn new(known: Vec<Identity>) -> Self {
        Self {
            secret: Arc::new(SigningSecret::from_bytes(vec![3; 32])),
            known,
        }
    }

    /// `Authorization` header value for `id`.
    pub fn bearer(&self, id: i64) -> String {
        let issued = TokenIssuer::new(
            Arc::clone(&self.secret),
            Duration::from_secs(600),
            Arc::new(DefaultClock),
        )
        .issue(IdentityId::new(id))
        .expect("token issued");
        format!("Bearer {}", issued.token)
    }

    /// Authentication middleware sharing this issuer's secret.
    pub fn middleware(&self) -> Authenticate {
        let known = self.known.clone();
        let mut identities = MockIdentityQuery::new();
        identities.expect_resolve().returning(move |claimed| {
            known
                .iter()
                .find(|identity| identity.id == claimed)
                .cloned()
                .ok_or(AuthError::UnknownIdentity { id: claimed })
        });
        let verifier = CredentialVerifier::new(Arc::clone(&self.secret), Arc::new(DefaultClock));
        Authenticate::new(Authenticator::new(verifier, Arc::new(identities)))
    }
}

pub use crate::test_support::multipart::{multipart_body, multipart_content_type};
