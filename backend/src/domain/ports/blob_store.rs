//! Driven port for durable file bytes.
//!
//! Locations returned by the store are relative, course-scoped paths such as
//! `courses/12/<uuid>-syllabus.pdf`; they double as the durable URI exposed
//! to clients.

use async_trait::async_trait;

use crate::domain::{CourseId, MaterialId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by blob store adapters.
    pub enum BlobStoreError {
        /// Reading or writing the underlying storage failed.
        Io { message: String } => "blob store I/O failed: {message}",
        /// The location does not belong to this store.
        InvalidLocation { location: String } => "invalid blob location: {location}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a material's bytes and return its location.
    async fn put_material(
        &self,
        course_id: CourseId,
        material_id: MaterialId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, BlobStoreError>;

    /// Store a cover image and return its location.
    async fn put_cover(&self, file_name: &str, bytes: &[u8]) -> Result<String, BlobStoreError>;

    /// Delete one stored blob; deleting a missing blob succeeds.
    async fn delete(&self, location: &str) -> Result<(), BlobStoreError>;

    /// Delete every blob stored for a course.
    async fn delete_course(&self, course_id: CourseId) -> Result<(), BlobStoreError>;
}
