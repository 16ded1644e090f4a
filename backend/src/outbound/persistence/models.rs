//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types validate
//! every column and report failures as plain messages, which repositories
//! map to their query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    ContentType, Course, CourseDetails, CourseId, DisplayName, Email, Identity, IdentityId,
    MaterialId, MaterialRef, MaterialSource, PhoneNumber, Price, Rating, Role,
};

use super::schema::{course_materials, courses, identities};

const DURABLE: &str = "durable";
const CACHED: &str = "cached";

// ---------------------------------------------------------------------------
// Identity models
// ---------------------------------------------------------------------------

/// Row struct for reading from the identities table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = identities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct IdentityRow {
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl IdentityRow {
    pub(crate) fn to_identity(&self) -> Result<Identity, String> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|err| format!("identity {}: {err}", self.id))?;
        Ok(Identity {
            id: IdentityId::new(self.id),
            display_name: DisplayName::new(self.display_name.clone())
                .map_err(|err| format!("identity {}: {err}", self.id))?,
            email: Email::new(&self.email).map_err(|err| format!("identity {}: {err}", self.id))?,
            role,
            phone: self
                .phone
                .as_deref()
                .map(PhoneNumber::new)
                .transpose()
                .map_err(|err| format!("identity {}: {err}", self.id))?,
            created_at: self.created_at,
        })
    }
}

/// Insertable struct for new identities.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = identities)]
pub(crate) struct NewIdentityRow<'a> {
    pub display_name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
}

/// Self-service profile changes. `phone: Some(None)` clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = identities)]
pub(crate) struct IdentityProfileChanges<'a> {
    pub display_name: Option<&'a str>,
    pub phone: Option<Option<&'a str>>,
}

// ---------------------------------------------------------------------------
// Course models
// ---------------------------------------------------------------------------

/// Row struct for reading from the courses table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price_minor: i64,
    pub delivery_mode: String,
    pub schedule: String,
    pub cover_image_ref: Option<String>,
    pub rating: f64,
    pub reviews: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl CourseRow {
    /// Assemble the course aggregate from its row and ordered materials.
    pub(crate) fn into_course(self, materials: Vec<MaterialRef>) -> Result<Course, String> {
        let price = u64::try_from(self.price_minor)
            .map(Price::from_minor_units)
            .map_err(|_| format!("course {}: negative price", self.id))?;
        let rating = Rating::new(self.rating).map_err(|err| format!("course {}: {err}", self.id))?;
        Ok(Course {
            id: CourseId::new(self.id),
            owner_id: IdentityId::new(self.owner_id),
            details: CourseDetails {
                name: self.name,
                description: self.description,
                category: self.category,
                price,
                delivery_mode: self.delivery_mode,
                schedule: self.schedule,
            },
            cover_image_ref: self.cover_image_ref,
            rating,
            reviews: self.reviews,
            materials,
            created_at: self.created_at,
        })
    }
}

/// Insertable struct for new courses; rating and reviews take column defaults.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = courses)]
pub(crate) struct NewCourseRow<'a> {
    pub owner_id: i64,
    pub name: &'a str,
    pub description: &'a str,
    pub category: &'a str,
    pub price_minor: i64,
    pub delivery_mode: &'a str,
    pub schedule: &'a str,
    pub cover_image_ref: Option<&'a str>,
}

/// Partial course update; `None` columns are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = courses)]
pub(crate) struct CourseChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub price_minor: Option<i64>,
    pub delivery_mode: Option<&'a str>,
    pub schedule: Option<&'a str>,
    pub cover_image_ref: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Material models
// ---------------------------------------------------------------------------

/// Row struct for reading from the course_materials table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = course_materials)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MaterialRow {
    pub id: Uuid,
    #[expect(dead_code, reason = "ordering column; read only by ORDER BY")]
    pub seq: i64,
    pub course_id: i64,
    pub name: String,
    pub source_kind: String,
    pub location: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: i64,
}

impl MaterialRow {
    pub(crate) fn into_material(self) -> Result<MaterialRef, String> {
        let source = match self.source_kind.as_str() {
            DURABLE => MaterialSource::Durable { uri: self.location },
            CACHED => MaterialSource::Cached { key: self.location },
            other => return Err(format!("material {}: unknown source kind `{other}`", self.id)),
        };
        let content_type = self
            .content_type
            .parse::<ContentType>()
            .map_err(|err| format!("material {}: {err}", self.id))?;
        let size_bytes = u64::try_from(self.size_bytes)
            .map_err(|_| format!("material {}: negative size", self.id))?;
        Ok(MaterialRef {
            id: MaterialId::from_uuid(self.id),
            name: self.name,
            source,
            content_type,
            size_bytes,
            uploaded_at: self.uploaded_at,
            uploaded_by: IdentityId::new(self.uploaded_by),
        })
    }
}

/// Insertable struct for new material rows; `seq` is assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = course_materials)]
pub(crate) struct NewMaterialRow<'a> {
    pub id: Uuid,
    pub course_id: i64,
    pub name: &'a str,
    pub source_kind: &'static str,
    pub location: &'a str,
    pub content_type: &'static str,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: i64,
}

impl<'a> NewMaterialRow<'a> {
    pub(crate) fn from_material(course_id: CourseId, material: &'a MaterialRef) -> Self {
        let (source_kind, location) = match &material.source {
            MaterialSource::Durable { uri } => (DURABLE, uri.as_str()),
            MaterialSource::Cached { key } => (CACHED, key.as_str()),
        };
        Self {
            id: *material.id.as_uuid(),
            course_id: course_id.get(),
            name: &material.name,
            source_kind,
            location,
            content_type: material.content_type.as_str(),
            size_bytes: i64::try_from(material.size_bytes).unwrap_or(i64::MAX),
            uploaded_at: material.uploaded_at,
            uploaded_by: material.uploaded_by.get(),
        }
    }
}
