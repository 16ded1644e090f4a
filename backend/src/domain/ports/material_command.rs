//! Driving ports for course materials.

use async_trait::async_trait;

use crate::domain::{
    CourseDeleted, CourseId, FileUpload, Identity, MaterialError, MaterialKey, MaterialRef,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaterialCommand: Send + Sync {
    /// Store `files` and attach them to the course, returning the new list.
    async fn append(
        &self,
        identity: &Identity,
        course_id: CourseId,
        files: Vec<FileUpload>,
    ) -> Result<Vec<MaterialRef>, MaterialError>;

    /// Detach every material matching `key`, returning what remains.
    async fn remove(
        &self,
        identity: &Identity,
        course_id: CourseId,
        key: &MaterialKey,
    ) -> Result<Vec<MaterialRef>, MaterialError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaterialQuery: Send + Sync {
    /// Materials in insertion order; empty when the course does not exist.
    async fn list(&self, course_id: CourseId) -> Result<Vec<MaterialRef>, MaterialError>;
}

/// Cleanup hook run by the course gateway after a course row is deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaterialCascade: Send + Sync {
    async fn discard_course(&self, deleted: &CourseDeleted) -> Result<(), MaterialError>;
}
