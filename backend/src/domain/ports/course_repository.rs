//! Driven port for course persistence.
//!
//! Mutating methods are conditional on the `(id, owner_id)` pair loaded by
//! the caller: if the row was deleted, or never matched, they report `None` /
//! `false` instead of writing.

use async_trait::async_trait;

use crate::domain::{Course, CourseId, CoursePatch, IdentityId, NewCourse};

use super::define_port_error;

define_port_error! {
    /// Errors raised by course repository adapters.
    pub enum CourseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "course repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "course repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course with zero rating, no reviews and no materials.
    async fn insert(&self, course: &NewCourse) -> Result<Course, CourseRepositoryError>;

    /// Fetch a course with its materials in insertion order.
    async fn find_by_id(&self, id: CourseId) -> Result<Option<Course>, CourseRepositoryError>;

    /// Every course, oldest first.
    async fn list(&self) -> Result<Vec<Course>, CourseRepositoryError>;

    async fn update_owned(
        &self,
        id: CourseId,
        owner: IdentityId,
        patch: &CoursePatch,
    ) -> Result<Option<Course>, CourseRepositoryError>;

    /// Delete the course and, through the foreign key, its material rows.
    async fn delete_owned(
        &self,
        id: CourseId,
        owner: IdentityId,
    ) -> Result<bool, CourseRepositoryError>;
}
