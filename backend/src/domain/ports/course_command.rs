//! Driving ports for course creation, mutation and lookup.

use async_trait::async_trait;

use crate::domain::{
    Course, CourseFields, CourseId, FileUpload, Identity, OwnershipError, RawCoursePatch,
};

/// Fields and optional cover image for a new course.
#[derive(Debug, Clone, Default)]
pub struct CourseSubmission {
    pub fields: CourseFields,
    pub cover: Option<FileUpload>,
}

/// Partial update with an optional replacement cover image.
#[derive(Debug, Clone, Default)]
pub struct CourseRevision {
    pub fields: RawCoursePatch,
    pub cover: Option<FileUpload>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseCommand: Send + Sync {
    /// Create a course owned by `identity`.
    async fn create(
        &self,
        identity: &Identity,
        submission: CourseSubmission,
    ) -> Result<Course, OwnershipError>;

    async fn update(
        &self,
        identity: &Identity,
        course_id: CourseId,
        revision: CourseRevision,
    ) -> Result<Course, OwnershipError>;

    /// Delete a course together with all of its materials.
    async fn delete(&self, identity: &Identity, course_id: CourseId)
    -> Result<(), OwnershipError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseQuery: Send + Sync {
    async fn get(&self, course_id: CourseId) -> Result<Option<Course>, OwnershipError>;

    /// Public catalogue, oldest first.
    async fn list(&self) -> Result<Vec<Course>, OwnershipError>;
}
