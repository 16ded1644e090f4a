//! Domain primitives, services and ports.
//!
//! Purpose: hold the marketplace rules independent of HTTP and storage.
//! Entities validate their invariants at construction; services depend only
//! on the port traits in [`ports`] and never on an adapter.
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload and stable code.
//! - Identity, Course, MaterialRef: the three aggregates.
//! - auth, identity_resolver, authorization: who is calling and what they
//!   may do.
//! - CourseService, MaterialService, AccountManager: use-case implementations
//!   of the driving ports.

pub mod account_service;
pub mod auth;
pub mod authorization;
pub mod course;
pub mod course_service;
pub mod error;
pub mod identity;
pub mod identity_resolver;
pub mod material;
pub mod material_service;
pub mod ports;
pub mod resilience;
pub mod trace_id;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use self::account_service::AccountManager;
pub use self::auth::{AuthError, LoginCredentials, Registration, RegistrationForm};
pub use self::authorization::{CourseAction, Forbidden, authorize, require};
pub use self::course::{
    Course, CourseDetails, CourseFields, CourseId, CoursePatch, CourseValidationError, NewCourse,
    Price, Rating, RawCoursePatch,
};
pub use self::course_service::{CourseAccess, CourseDeleted, CourseService, OwnershipError};
pub use self::error::{Error, ErrorCode};
pub use self::identity::{
    DisplayName, Email, Identity, IdentityId, IdentityValidationError, PhoneNumber, ProfilePatch,
    Role,
};
pub use self::identity_resolver::{Authenticator, IdentityResolver};
pub use self::material::{
    ContentType, FileUpload, FileUploadError, MaterialId, MaterialKey, MaterialRef,
    MaterialSource, UnknownContentType,
};
pub use self::material_service::{MaterialError, MaterialService};
pub use self::resilience::StoragePolicy;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use course_market::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
