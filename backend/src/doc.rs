//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health checks and the
//! schema mirrors from [`crate::inbound::http::schemas`], which keep utoipa
//! out of the domain types. The document backs Swagger UI in debug builds
//! and is printed by the `openapi-dump` binary.

use crate::inbound::http::courses::{CourseFormSchema, CoursePatchRequest, CourseRequest};
use crate::inbound::http::materials::MaterialUploadSchema;
use crate::inbound::http::schemas::{
    ContentTypeSchema, CourseSchema, ErrorCodeSchema, ErrorSchema, IdentitySchema,
    MaterialRefSchema, MaterialSourceSchema, RoleSchema,
};
use crate::inbound::http::users::{
    LoginRequest, LoginResponse, ProfileRequest, RegisterRequest, RoleRequest,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Register the bearer token scheme issued by `POST /api/v1/login`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Token issued by POST /api/v1/login."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Course marketplace API",
        description = "Accounts, courses and course materials with bearer-token access control."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::register,
        crate::inbound::http::users::login,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::update_current_user,
        crate::inbound::http::users::assign_role,
        crate::inbound::http::courses::list_courses,
        crate::inbound::http::courses::get_course,
        crate::inbound::http::courses::create_course,
        crate::inbound::http::courses::update_course,
        crate::inbound::http::courses::delete_course,
        crate::inbound::http::materials::list_materials,
        crate::inbound::http::materials::append_materials,
        crate::inbound::http::materials::remove_material,
        crate::inbound::http::materials::remove_materials_by_name,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        RoleSchema,
        IdentitySchema,
        ContentTypeSchema,
        MaterialSourceSchema,
        MaterialRefSchema,
        CourseSchema,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        ProfileRequest,
        RoleRequest,
        CourseRequest,
        CoursePatchRequest,
        CourseFormSchema,
        MaterialUploadSchema,
    )),
    tags(
        (name = "users", description = "Registration, login and identity management"),
        (name = "courses", description = "Course catalogue and ownership"),
        (name = "materials", description = "Files attached to courses"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
