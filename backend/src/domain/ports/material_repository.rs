//! Driven port for course material rows.
//!
//! Materials are child rows of a course. Appends and removals lock the
//! owning course row for their duration so concurrent writers serialise per
//! course and neither loses the other's rows.

use async_trait::async_trait;

use crate::domain::{CourseId, IdentityId, MaterialKey, MaterialRef};

use super::define_port_error;

define_port_error! {
    /// Errors raised by material repository adapters.
    pub enum MaterialRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "material repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "material repository query failed: {message}",
    }
}

/// Outcome of a removal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MaterialRemoval {
    pub removed: Vec<MaterialRef>,
    pub remaining: Vec<MaterialRef>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// Append rows while holding the course lock.
    ///
    /// Returns the full ordered list afterwards, or `None` when no course
    /// with this id and owner exists any more.
    async fn append(
        &self,
        course_id: CourseId,
        owner: IdentityId,
        materials: &[MaterialRef],
    ) -> Result<Option<Vec<MaterialRef>>, MaterialRepositoryError>;

    /// Remove every row matching `key` while holding the course lock.
    async fn remove(
        &self,
        course_id: CourseId,
        owner: IdentityId,
        key: &MaterialKey,
    ) -> Result<Option<MaterialRemoval>, MaterialRepositoryError>;

    /// Ordered materials of a course, or `None` when the course is absent.
    async fn list(
        &self,
        course_id: CourseId,
    ) -> Result<Option<Vec<MaterialRef>>, MaterialRepositoryError>;

    /// Drop any rows left for a course; returns what was removed.
    async fn clear(&self, course_id: CourseId) -> Result<Vec<MaterialRef>, MaterialRepositoryError>;
}
