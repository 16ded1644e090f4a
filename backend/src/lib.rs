//! Course marketplace backend.
//!
//! - [`domain`]: identities, courses, materials and the services enforcing
//!   who may do what to them.
//! - [`inbound`]: the actix-web REST adapter under `/api/v1`.
//! - [`outbound`]: PostgreSQL, in-memory, blob and password-hashing adapters.
//! - [`client`]: the consumer-side material cache and its reconciler.
//! - [`server`]: settings and wiring for the `course-market` binary.

pub mod client;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod server;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
