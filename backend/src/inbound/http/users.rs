//! Registration, login and identity self-service handlers.
//!
//! ```text
//! POST /api/v1/register {"displayName":"Ada","email":"ada@example.com","password":"..."}
//! POST /api/v1/login {"email":"ada@example.com","password":"..."}
//! GET /api/v1/users/me
//! PATCH /api/v1/users/me {"phone":null}
//! PUT /api/v1/users/7/role {"role":"admin"}
//! ```

use actix_web::{HttpResponse, get, patch, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;

use crate::domain::auth::{LoginCredentials, Registration, RegistrationForm};
use crate::domain::{
    DisplayName, Error, Identity, IdentityId, IdentityValidationError, PhoneNumber, ProfilePatch,
    Role,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedIdentity;
use crate::inbound::http::schemas::{ErrorSchema, IdentitySchema, RoleSchema};
use crate::inbound::http::state::HttpState;

/// Body of `POST /api/v1/register`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
    /// `student` (default) or `instructor`.
    pub role: Option<String>,
    pub phone: Option<String>,
}

/// Body of `POST /api/v1/login`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Bearer token issued on login.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[schema(value_type = String, format = DateTime)]
    pub expires_at: DateTime<Utc>,
    #[schema(value_type = IdentitySchema)]
    pub identity: Identity,
}

/// Body of `PATCH /api/v1/users/me`. `phone: null` clears the number.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
}

/// Body of `PUT /api/v1/users/{id}/role`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct RoleRequest {
    #[schema(value_type = RoleSchema)]
    pub role: String,
}

/// Distinguish an explicit `null` from an absent field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn field_error(field: &'static str, err: &IdentityValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field }))
}

impl TryFrom<ProfileRequest> for ProfilePatch {
    type Error = Error;

    fn try_from(value: ProfileRequest) -> Result<Self, Self::Error> {
        let display_name = value
            .display_name
            .map(DisplayName::new)
            .transpose()
            .map_err(|err| field_error("displayName", &err))?;
        let phone = match value.phone {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(
                PhoneNumber::new(raw).map_err(|err| field_error("phone", &err))?,
            )),
        };
        Ok(Self {
            display_name,
            phone,
        })
    }
}

/// Create an identity. Administrators cannot be self-registered.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Identity created", body = IdentitySchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "register",
    security([])
)]
#[post("/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let form = RegistrationForm {
        display_name: &payload.display_name,
        email: &payload.email,
        password: &payload.password,
        role: payload.role.as_deref(),
        phone: payload.phone.as_deref(),
    };
    let registration = Registration::try_from_form(&form)?;
    let identity = state.accounts.register(&registration).await?;
    Ok(HttpResponse::Created().json(identity))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let credentials = LoginCredentials::try_from_parts(&payload.email, &payload.password)?;
    let outcome = state.accounts.login(&credentials).await?;
    Ok(web::Json(LoginResponse {
        token: outcome.token.token,
        expires_at: outcome.token.expires_at,
        identity: outcome.identity,
    }))
}

/// The caller's own identity.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current identity", body = IdentitySchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser",
    security(("bearer" = []))
)]
#[get("/users/me")]
pub async fn current_user(
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
) -> web::Json<Identity> {
    web::Json(identity)
}

/// Update the caller's display name or phone number.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Updated identity", body = IdentitySchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "updateCurrentUser",
    security(("bearer" = []))
)]
#[patch("/users/me")]
pub async fn update_current_user(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    payload: web::Json<ProfileRequest>,
) -> ApiResult<web::Json<Identity>> {
    let patch = ProfilePatch::try_from(payload.into_inner())?;
    let updated = state.accounts.update_profile(&identity, &patch).await?;
    Ok(web::Json(updated))
}

/// Change another identity's role. Administrators only.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/role",
    params(("id" = i64, Path, description = "Identity id")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Updated identity", body = IdentitySchema),
        (status = 400, description = "Unknown role", body = ErrorSchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller is not an administrator", body = ErrorSchema),
        (status = 404, description = "Identity not found", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "assignRole",
    security(("bearer" = []))
)]
#[put("/users/{id}/role")]
pub async fn assign_role(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(acting): AuthenticatedIdentity,
    path: web::Path<i64>,
    payload: web::Json<RoleRequest>,
) -> ApiResult<web::Json<Identity>> {
    let role: Role = payload
        .role
        .parse()
        .map_err(|err| field_error("role", &err))?;
    let target = IdentityId::new(path.into_inner());
    let updated = state.accounts.assign_role(&acting, target, role).await?;
    Ok(web::Json(updated))
}
