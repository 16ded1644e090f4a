//! Course catalogue and ownership handlers.
//!
//! Create and update accept either a JSON body or `multipart/form-data`
//! carrying the same fields plus an optional `cover` file part. The multipart
//! handlers are selected by a content-type guard and registered ahead of the
//! JSON ones.
//!
//! ```text
//! GET /api/v1/courses
//! POST /api/v1/courses {"name":"Pottery","category":"craft","price":"25.00","deliveryMode":"in person"}
//! PATCH /api/v1/courses/4 {"price":30}
//! DELETE /api/v1/courses/4
//! ```

use actix_multipart::form::MultipartForm;
use actix_multipart::form::bytes::Bytes;
use actix_multipart::form::text::Text;
use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{CourseRevision, CourseSubmission};
use crate::domain::{Course, CourseFields, CourseId, Error, RawCoursePatch};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::AuthenticatedIdentity;
use crate::inbound::http::multipart::{is_multipart, optional_file_upload};
use crate::inbound::http::schemas::{CourseSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;

/// A price given either as a decimal string or a JSON number.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PriceInput {
    Text(String),
    Number(serde_json::Number),
}

impl PriceInput {
    fn into_raw(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// JSON body of `POST /api/v1/courses`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[schema(value_type = String, example = "25.00")]
    pub price: PriceInput,
    pub delivery_mode: String,
    #[serde(default)]
    pub schedule: String,
}

impl From<CourseRequest> for CourseFields {
    fn from(value: CourseRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            category: value.category,
            price: value.price.into_raw(),
            delivery_mode: value.delivery_mode,
            schedule: value.schedule,
        }
    }
}

/// JSON body of `PATCH /api/v1/courses/{id}`. Absent fields are untouched.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoursePatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[schema(value_type = Option<String>, example = "30.00")]
    pub price: Option<PriceInput>,
    pub delivery_mode: Option<String>,
    pub schedule: Option<String>,
}

impl From<CoursePatchRequest> for RawCoursePatch {
    fn from(value: CoursePatchRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            category: value.category,
            price: value.price.map(PriceInput::into_raw),
            delivery_mode: value.delivery_mode,
            schedule: value.schedule,
        }
    }
}

/// Multipart variant of the create and update bodies.
#[derive(MultipartForm)]
pub struct CourseForm {
    name: Option<Text<String>>,
    description: Option<Text<String>>,
    category: Option<Text<String>>,
    price: Option<Text<String>>,
    #[multipart(rename = "deliveryMode")]
    delivery_mode: Option<Text<String>>,
    schedule: Option<Text<String>>,
    cover: Option<Bytes>,
}

/// OpenAPI view of [`CourseForm`].
#[derive(utoipa::ToSchema)]
#[schema(rename_all = "camelCase")]
#[expect(dead_code, reason = "read only by utoipa")]
pub struct CourseFormSchema {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    #[schema(example = "25.00")]
    price: Option<String>,
    delivery_mode: Option<String>,
    schedule: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    cover: Option<Vec<u8>>,
}

fn text(field: Option<Text<String>>) -> Option<String> {
    field.map(Text::into_inner)
}

impl CourseForm {
    fn into_patch(self) -> (RawCoursePatch, Option<Bytes>) {
        let fields = RawCoursePatch {
            name: text(self.name),
            description: text(self.description),
            category: text(self.category),
            price: text(self.price),
            delivery_mode: text(self.delivery_mode),
            schedule: text(self.schedule),
        };
        (fields, self.cover)
    }
}

fn fields_from_patch(raw: RawCoursePatch) -> CourseFields {
    CourseFields {
        name: raw.name.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        category: raw.category.unwrap_or_default(),
        price: raw.price.unwrap_or_default(),
        delivery_mode: raw.delivery_mode.unwrap_or_default(),
        schedule: raw.schedule.unwrap_or_default(),
    }
}

fn created(course: &Course) -> HttpResponse {
    HttpResponse::Created()
        .insert_header(("Location", format!("/api/v1/courses/{}", course.id)))
        .json(course)
}

/// Public catalogue, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/courses",
    responses(
        (status = 200, description = "All courses", body = [CourseSchema]),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "listCourses",
    security([])
)]
#[get("/courses")]
pub async fn list_courses(state: web::Data<HttpState>) -> ApiResult<web::Json<Vec<Course>>> {
    Ok(web::Json(state.course_query.list().await?))
}

/// A single course including its materials.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseSchema),
        (status = 404, description = "Course not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "getCourse",
    security([])
)]
#[get("/courses/{id}")]
pub async fn get_course(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<web::Json<Course>> {
    let course_id = CourseId::new(path.into_inner());
    state
        .course_query
        .get(course_id)
        .await?
        .map(web::Json)
        .ok_or_else(|| Error::not_found(format!("course {course_id} not found")))
}

#[post("/courses", guard = "is_multipart")]
pub async fn create_course_multipart(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    MultipartForm(form): MultipartForm<CourseForm>,
) -> ApiResult<HttpResponse> {
    let (raw, cover) = form.into_patch();
    let submission = CourseSubmission {
        fields: fields_from_patch(raw),
        cover: optional_file_upload(cover)?,
    };
    let course = state.courses.create(&identity, submission).await?;
    Ok(created(&course))
}

/// Create a course owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body(content(
        (CourseRequest = "application/json"),
        (CourseFormSchema = "multipart/form-data")
    )),
    responses(
        (status = 201, description = "Course created", body = CourseSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller may not create courses", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "createCourse",
    security(("bearer" = []))
)]
#[post("/courses")]
pub async fn create_course(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    payload: web::Json<CourseRequest>,
) -> ApiResult<HttpResponse> {
    let submission = CourseSubmission {
        fields: payload.into_inner().into(),
        cover: None,
    };
    let course = state.courses.create(&identity, submission).await?;
    Ok(created(&course))
}

#[patch("/courses/{id}", guard = "is_multipart")]
pub async fn update_course_multipart(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    path: web::Path<i64>,
    MultipartForm(form): MultipartForm<CourseForm>,
) -> ApiResult<web::Json<Course>> {
    let (fields, cover) = form.into_patch();
    let revision = CourseRevision {
        fields,
        cover: optional_file_upload(cover)?,
    };
    let course = state
        .courses
        .update(&identity, CourseId::new(path.into_inner()), revision)
        .await?;
    Ok(web::Json(course))
}

/// Partially update a course. Owner or administrator only.
#[utoipa::path(
    patch,
    path = "/api/v1/courses/{id}",
    params(("id" = i64, Path, description = "Course id")),
    request_body(content(
        (CoursePatchRequest = "application/json"),
        (CourseFormSchema = "multipart/form-data")
    )),
    responses(
        (status = 200, description = "Updated course", body = CourseSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller does not own the course", body = ErrorSchema),
        (status = 404, description = "Course not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "updateCourse",
    security(("bearer" = []))
)]
#[patch("/courses/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    path: web::Path<i64>,
    payload: web::Json<CoursePatchRequest>,
) -> ApiResult<web::Json<Course>> {
    let revision = CourseRevision {
        fields: payload.into_inner().into(),
        cover: None,
    };
    let course = state
        .courses
        .update(&identity, CourseId::new(path.into_inner()), revision)
        .await?;
    Ok(web::Json(course))
}

/// Delete a course and every material attached to it.
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = i64, Path, description = "Course id")),
    responses(
        (status = 204, description = "Course deleted"),
        (status = 401, description = "Missing or invalid token", body = ErrorSchema),
        (status = 403, description = "Caller does not own the course", body = ErrorSchema),
        (status = 404, description = "Course not found", body = ErrorSchema)
    ),
    tags = ["courses"],
    operation_id = "deleteCourse",
    security(("bearer" = []))
)]
#[delete("/courses/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    AuthenticatedIdentity(identity): AuthenticatedIdentity,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    state
        .courses
        .delete(&identity, CourseId::new(path.into_inner()))
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests;
