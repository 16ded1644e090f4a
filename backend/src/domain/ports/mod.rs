//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`BlobStore`], [`PasswordHasher`]) are
//! implemented by outbound adapters. Driving ports (`*Command`, `*Query`,
//! [`AccountService`]) are implemented by domain services and called by
//! inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_service;
mod blob_store;
mod course_command;
mod course_repository;
mod identity_query;
mod identity_repository;
mod material_command;
mod material_repository;
mod password_hasher;

#[cfg(test)]
pub use account_service::MockAccountService;
pub use account_service::{AccountService, LoginOutcome};
#[cfg(test)]
pub use blob_store::MockBlobStore;
pub use blob_store::{BlobStore, BlobStoreError};
#[cfg(test)]
pub use course_command::{MockCourseCommand, MockCourseQuery};
pub use course_command::{CourseCommand, CourseQuery, CourseRevision, CourseSubmission};
#[cfg(test)]
pub use course_repository::MockCourseRepository;
pub use course_repository::{CourseRepository, CourseRepositoryError};
#[cfg(test)]
pub use identity_query::MockIdentityQuery;
pub use identity_query::IdentityQuery;
#[cfg(test)]
pub use identity_repository::MockIdentityRepository;
pub use identity_repository::{
    IdentityRepository, IdentityRepositoryError, NewIdentity, StoredCredentials,
};
#[cfg(test)]
pub use material_command::{MockMaterialCascade, MockMaterialCommand, MockMaterialQuery};
pub use material_command::{MaterialCascade, MaterialCommand, MaterialQuery};
#[cfg(test)]
pub use material_repository::MockMaterialRepository;
pub use material_repository::{MaterialRemoval, MaterialRepository, MaterialRepositoryError};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
