//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their serialised shape and are registered with
//! utoipa under the domain type's path.

#![expect(
    dead_code,
    reason = "Schema mirrors are only read by utoipa during OpenAPI generation"
)]

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    #[schema(rename = "unauthorized")]
    Unauthorized,
    #[schema(rename = "token_missing")]
    TokenMissing,
    #[schema(rename = "token_expired")]
    TokenExpired,
    #[schema(rename = "token_malformed")]
    TokenMalformed,
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    #[schema(rename = "conflict")]
    Conflict,
    /// Storage timed out or was unreachable; retrying may succeed.
    #[schema(rename = "transient")]
    Transient,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    #[schema(example = "price must be a non-negative decimal")]
    message: String,
    /// Correlation identifier matching the `trace-id` response header.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::Role`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Role, rename_all = "lowercase")]
pub enum RoleSchema {
    Student,
    Instructor,
    Admin,
}

/// OpenAPI schema for [`crate::domain::Identity`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Identity, rename_all = "camelCase")]
pub struct IdentitySchema {
    #[schema(example = 7)]
    id: i64,
    #[schema(example = "Ada Lovelace")]
    display_name: String,
    #[schema(example = "ada@example.com")]
    email: String,
    role: RoleSchema,
    phone: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    created_at: String,
}

/// OpenAPI schema for [`crate::domain::ContentType`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ContentType, rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentTypeSchema {
    Pdf,
    Image,
    Document,
    Presentation,
    Other,
}

/// OpenAPI schema for [`crate::domain::MaterialSource`].
///
/// `kind` is `durable` with a course-scoped `uri`, or `cached` with a local
/// cache `key`.
#[derive(ToSchema)]
#[schema(as = crate::domain::MaterialSource)]
pub struct MaterialSourceSchema {
    #[schema(example = "durable")]
    kind: String,
    #[schema(example = "courses/4/3f2a9c1e-week1.pdf")]
    uri: Option<String>,
    key: Option<String>,
}

/// OpenAPI schema for [`crate::domain::MaterialRef`].
#[derive(ToSchema)]
#[schema(as = crate::domain::MaterialRef, rename_all = "camelCase")]
pub struct MaterialRefSchema {
    #[schema(value_type = String, format = Uuid)]
    id: String,
    #[schema(example = "week1.pdf")]
    name: String,
    source: MaterialSourceSchema,
    content_type: ContentTypeSchema,
    size_bytes: u64,
    #[schema(value_type = String, format = DateTime)]
    uploaded_at: String,
    /// Always the course owner at upload time.
    uploaded_by: i64,
}

/// OpenAPI schema for [`crate::domain::Course`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Course, rename_all = "camelCase")]
pub struct CourseSchema {
    id: i64,
    owner_id: i64,
    #[schema(example = "Intro to pottery")]
    name: String,
    description: String,
    category: String,
    /// Decimal string with two fractional digits.
    #[schema(example = "25.00")]
    price: String,
    #[schema(example = "in person")]
    delivery_mode: String,
    schedule: String,
    cover_image_ref: Option<String>,
    #[schema(minimum = 0, maximum = 5)]
    rating: f64,
    reviews: Vec<String>,
    materials: Vec<MaterialRefSchema>,
    #[schema(value_type = String, format = DateTime)]
    created_at: String,
}
