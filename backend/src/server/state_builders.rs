//! Builders wiring repositories, the blob store and the domain services into
//! the HTTP state and the authentication middleware.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::domain::auth::{CredentialVerifier, SigningSecret, TokenIssuer};
use crate::domain::ports::{
    BlobStore, CourseRepository, IdentityQuery, IdentityRepository, MaterialCascade,
    MaterialRepository,
};
use crate::domain::{
    AccountManager, Authenticator, CourseAccess, CourseService, IdentityResolver,
    MaterialService, StoragePolicy,
};
use crate::inbound::http::state::HttpState;
use crate::outbound::crypto::Argon2PasswordHasher;
use crate::outbound::memory::InMemoryStore;
use crate::outbound::persistence::{
    DbPool, DieselCourseRepository, DieselIdentityRepository, DieselMaterialRepository,
};

/// Driven adapters handed to [`wire_services`].
pub struct Adapters<I, C, M, B> {
    pub identities: Arc<I>,
    pub courses: Arc<C>,
    pub materials: Arc<M>,
    pub blobs: Arc<B>,
}

/// Process-wide settings shared by the services.
#[derive(Clone)]
pub struct ServiceSettings {
    pub secret: Arc<SigningSecret>,
    pub token_validity: std::time::Duration,
    pub policy: StoragePolicy,
    pub clock: Arc<dyn Clock>,
}

impl ServiceSettings {
    /// Builder seeded with the token secret and validity.
    pub fn new(secret: Arc<SigningSecret>, token_validity: std::time::Duration) -> Self {
        Self {
            secret,
            token_validity,
            policy: StoragePolicy::default(),
            clock: Arc::new(DefaultClock),
        }
    }

    /// Replace the storage retry and timeout policy.
    #[must_use]
    pub fn with_policy(mut self, policy: StoragePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the wall clock, mainly for tests.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Driving ports for the handlers plus the request authenticator.
#[derive(Clone)]
pub struct AppServices {
    pub http_state: HttpState,
    pub authenticator: Authenticator,
}

/// Construct every domain service over the given adapters.
pub fn wire_services<I, C, M, B>(
    adapters: Adapters<I, C, M, B>,
    settings: &ServiceSettings,
) -> AppServices
where
    I: IdentityRepository + 'static,
    C: CourseRepository + 'static,
    M: MaterialRepository + 'static,
    B: BlobStore + 'static,
{
    let Adapters {
        identities,
        courses,
        materials,
        blobs,
    } = adapters;
    let policy = settings.policy.clone();

    let issuer = TokenIssuer::new(
        Arc::clone(&settings.secret),
        settings.token_validity,
        Arc::clone(&settings.clock),
    );
    let accounts = Arc::new(AccountManager::new(
        Arc::clone(&identities),
        Arc::new(Argon2PasswordHasher::default()),
        issuer,
        policy.clone(),
    ));

    let resolver: Arc<dyn IdentityQuery> =
        Arc::new(IdentityResolver::new(identities, policy.clone()));
    let verifier =
        CredentialVerifier::new(Arc::clone(&settings.secret), Arc::clone(&settings.clock));
    let authenticator = Authenticator::new(verifier, resolver);

    let access = Arc::new(CourseAccess::new(Arc::clone(&courses), policy.clone()));
    let material_service = Arc::new(MaterialService::new(
        materials,
        Arc::clone(&access),
        Arc::clone(&blobs),
        Arc::clone(&settings.clock),
        policy.clone(),
    ));
    let course_service = Arc::new(CourseService::new(
        access,
        courses,
        blobs,
        Arc::clone(&material_service) as Arc<dyn MaterialCascade>,
        policy,
    ));

    AppServices {
        http_state: HttpState {
            accounts,
            courses: course_service.clone(),
            course_query: course_service,
            materials: material_service.clone(),
            material_query: material_service,
        },
        authenticator,
    }
}

/// Wire the Diesel repositories when a pool is configured, otherwise a
/// shared in-memory store.
pub fn build_services<B>(
    db_pool: Option<&DbPool>,
    blobs: Arc<B>,
    settings: &ServiceSettings,
) -> AppServices
where
    B: BlobStore + 'static,
{
    match db_pool {
        Some(pool) => wire_services(
            Adapters {
                identities: Arc::new(DieselIdentityRepository::new(pool.clone())),
                courses: Arc::new(DieselCourseRepository::new(pool.clone())),
                materials: Arc::new(DieselMaterialRepository::new(pool.clone())),
                blobs,
            },
            settings,
        ),
        None => {
            let store = Arc::new(InMemoryStore::new(Arc::clone(&settings.clock)));
            wire_services(
                Adapters {
                    identities: Arc::clone(&store),
                    courses: Arc::clone(&store),
                    materials: store,
                    blobs,
                },
                settings,
            )
        }
    }
}
