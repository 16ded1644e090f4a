//! Course material handlers.
//!
//! ```text
//! GET /api/v1/courses/4/materials
//! POST /api/v1/courses/4/materials (multipart, one or more `files` parts)
//! DELETE /api/v1/courses/4/materials/3f2a9c1e-...
//! DELETE /api/v1/courses/4/materials?name=week1.pdf
//! ```

use actix_multipart::form::MultipartForm;
use actix_multipart::form::bytes::Bytes;
use actix_web::{delete, get, post, web};
use serde::Deserialize;
use serde_json::json;

use crate::domain::{CourseId, Error, MaterialId, MaterialKey, MaterialRef};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedIdentity;
use crate::inbound::http::multipart::file_upload;
use crate::inbound::http::schemas::{ErrorSchema, MaterialRefSchema};
use crate::inbound::http::state::HttpState;

/// Multipart body of `POST /api/v1/courses/{id}/materials`.
#[derive(MultipartForm)]
pub struct MaterialUpload {
    files: Vec<Bytes>,
}

/// OpenAPI view of [`MaterialUpload`].
#[derive(utoipa::ToSchema)]
#[expect(dead_code, reason = "read only by utoipa")]
pub struct MaterialUploadSchema {
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

/// Query of `DELETE /api/v1/courses/{id}/materials`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RemoveByName {
    /// Every material carrying this name is removed.
    pub name: Option<String>,
}

/// Materials attached to a course, in upload order. Unknown or deleted
/// courses list no materials.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/materials",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Materials", body = [MaterialRefSchema]),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "listMaterials",
    security([])
)]
#[get("/courses/{id}/materials")]
pub async fn list_materials(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<Vec<MaterialRef>>> {
    let materials = state
        .material_query
        .list(CourseId::new(path.into_inner()))
        .await?;
    Ok(web::Json(materials))
}

/// Upload files and attach them to a course.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/materials",
    params(("id" = i64, Path, description = "Course id")),
    request_body(content = MaterialUploadSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Materials after the upload", body = [MaterialRefSchema]),
        (status = 400, description = "No files or an invalid file name", body = ErrorSchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller does not own the course", body = ErrorSchema),
        (status = 404, description = "Course not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "appendMaterials",
    security(("bearer" = []))
)]
#[post("/courses/{id}/materials")]
pub async fn append_materials(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    path: web::Path<i64>,
    MultipartForm(upload): MultipartForm<MaterialUpload>,
) -> ApiResult<web::Json<Vec<MaterialRef>>> {
    let files = upload
        .files
        .into_iter()
        .map(file_upload)
        .collect::<Result<Vec<_>, _>>()?;
    let materials = state
        .materials
        .append(&identity, CourseId::new(path.into_inner()), files)
        .await?;
    Ok(web::Json(materials))
}

/// Remove one material by id.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/materials/{material_id}",
    params(
        ("id" = i64, Path, description = "Course id"),
        ("material_id" = String, Path, format = Uuid, description = "Material id")
    ),
    responses(
        (status = 200, description = "Remaining materials", body = [MaterialRefSchema]),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller does not own the course", body = ErrorSchema),
        (status = 404, description = "Course or material not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "removeMaterial",
    security(("bearer" = []))
)]
#[delete("/courses/{id}/materials/{material_id}")]
pub async fn remove_material(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    path: web::Path<(i64, String)>,
) -> ApiResult<web::Json<Vec<MaterialRef>>> {
    let (course_id, raw_id) = path.into_inner();
    let material_id: MaterialId = raw_id.parse().map_err(|_| {
        Error::invalid_request("material id must be a UUID")
            .with_details(json!({ "field": "materialId", "value": raw_id }))
    })?;
    let materials = state
        .materials
        .remove(&identity, CourseId::new(course_id), &MaterialKey::Id(material_id))
        .await?;
    Ok(web::Json(materials))
}

/// Remove every material with the given name. Unmatched names change nothing.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}/materials",
    params(("id" = i64, Path, description = "Course id"), RemoveByName),
    responses(
        (status = 200, description = "Remaining materials", body = [MaterialRefSchema]),
        (status = 400, description = "Missing name", body = ErrorSchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller does not own the course", body = ErrorSchema),
        (status = 404, description = "Course not found", body = ErrorSchema)
    ),
    tags = ["materials"],
    operation_id = "removeMaterialsByName",
    security(("bearer" = []))
)]
#[delete("/courses/{id}/materials")]
pub async fn remove_materials_by_name(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    path: web::Path<i64>,
    query: web::Query<RemoveByName>,
) -> ApiResult<web::Json<Vec<MaterialRef>>> {
    let name = query
        .into_inner()
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| {
            Error::invalid_request("name is required").with_details(json!({ "field": "name" }))
        })?;
    let materials = state
        .materials
        .remove(&identity, CourseId::new(path.into_inner()), &MaterialKey::Name(name))
        .await?;
    Ok(web::Json(materials))
}
