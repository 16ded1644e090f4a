//! Course ownership gateway.
//!
//! Every mutation follows the same shape: load the course, authorize the
//! caller against it, then write conditionally on the `(id, owner_id)` pair
//! that was loaded. A course deleted between the load and the write is
//! reported as not found rather than resurrected or half-updated.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::authorization::{CourseAction, Forbidden, require};
use super::ports::{
    BlobStore, BlobStoreError, CourseCommand, CourseQuery, CourseRepository,
    CourseRepositoryError, CourseRevision, CourseSubmission, MaterialCascade,
};
use super::resilience::{StoragePolicy, TimedOut, Transience};
use super::{
    Course, CourseId, CoursePatch, CourseValidationError, Error, FileUpload, Identity,
    IdentityId, NewCourse,
};

/// Why a course operation did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    #[error("course {course_id} not found")]
    NotFound { course_id: CourseId },
    #[error(transparent)]
    Forbidden(#[from] Forbidden),
    #[error(transparent)]
    Invalid(#[from] CourseValidationError),
    #[error("course storage unavailable: {message}")]
    Transient { message: String },
    #[error("course storage failed: {message}")]
    Storage { message: String },
}

impl Transience for OwnershipError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<CourseRepositoryError> for OwnershipError {
    fn from(value: CourseRepositoryError) -> Self {
        match value {
            CourseRepositoryError::Connection { message } => Self::Transient { message },
            CourseRepositoryError::Query { message } => Self::Storage { message },
        }
    }
}

impl From<BlobStoreError> for OwnershipError {
    fn from(value: BlobStoreError) -> Self {
        Self::Storage {
            message: value.to_string(),
        }
    }
}

impl From<TimedOut> for OwnershipError {
    fn from(value: TimedOut) -> Self {
        Self::Transient {
            message: value.to_string(),
        }
    }
}

impl From<OwnershipError> for Error {
    fn from(value: OwnershipError) -> Self {
        match value {
            OwnershipError::NotFound { .. } => Self::not_found(value.to_string()),
            OwnershipError::Forbidden(_) => Self::forbidden(value.to_string()),
            OwnershipError::Invalid(inner) => Self::invalid_request(inner.to_string()),
            OwnershipError::Transient { .. } => Self::transient(value.to_string()),
            OwnershipError::Storage { .. } => Self::internal(value.to_string()),
        }
    }
}

/// Proof that a course row was deleted by the gateway.
///
/// Only the gateway constructs it, so material cleanup can only be triggered
/// for courses that really went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDeleted {
    course_id: CourseId,
    owner_id: IdentityId,
}

impl CourseDeleted {
    pub(crate) const fn new(course_id: CourseId, owner_id: IdentityId) -> Self {
        Self {
            course_id,
            owner_id,
        }
    }

    #[must_use]
    pub const fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub const fn owner_id(&self) -> IdentityId {
        self.owner_id
    }
}

/// Loads courses and checks callers against them.
///
/// Shared by the gateway and the material manager so both apply the same
/// permission check.
pub struct CourseAccess<C> {
    courses: Arc<C>,
    policy: StoragePolicy,
}

impl<C: CourseRepository> CourseAccess<C> {
    /// Service over `courses`, with every call bounded by `policy`.
    pub fn new(courses: Arc<C>, policy: StoragePolicy) -> Self {
        Self { courses, policy }
    }

    /// Fetch a course, retrying transient failures.
    pub async fn load(&self, course_id: CourseId) -> Result<Option<Course>, OwnershipError> {
        self.policy
            .read("course lookup", || async {
                let found = self
                    .policy
                    .bounded("course lookup", self.courses.find_by_id(course_id))
                    .await??;
                Ok::<_, OwnershipError>(found)
            })
            .await
    }

    /// Load the course and require `identity` to be allowed `action` on it.
    pub async fn check(
        &self,
        identity: &Identity,
        course_id: CourseId,
        action: CourseAction,
    ) -> Result<Course, OwnershipError> {
        let course = self
            .load(course_id)
            .await?
            .ok_or(OwnershipError::NotFound { course_id })?;
        if let Err(denied) = require(Some(identity), &course, action) {
            info!(
                identity_id = %identity.id,
                course_id = %course_id,
                owner_id = %course.owner_id,
                action = %action,
                "course action denied"
            );
            return Err(denied.into());
        }
        Ok(course)
    }
}

/// Course gateway implementing [`CourseCommand`] and [`CourseQuery`].
pub struct CourseService<C, B> {
    access: Arc<CourseAccess<C>>,
    courses: Arc<C>,
    blobs: Arc<B>,
    materials: Arc<dyn MaterialCascade>,
    policy: StoragePolicy,
}

impl<C, B> CourseService<C, B>
where
    C: CourseRepository,
    B: BlobStore,
{
    pub fn new(
        access: Arc<CourseAccess<C>>,
        courses: Arc<C>,
        blobs: Arc<B>,
        materials: Arc<dyn MaterialCascade>,
        policy: StoragePolicy,
    ) -> Self {
        Self {
            access,
            courses,
            blobs,
            materials,
            policy,
        }
    }

    async fn store_cover(
        &self,
        cover: Option<&FileUpload>,
    ) -> Result<Option<String>, OwnershipError> {
        let Some(cover) = cover else {
            return Ok(None);
        };
        let location = self
            .policy
            .bounded("cover upload", self.blobs.put_cover(cover.name(), cover.bytes()))
            .await??;
        Ok(Some(location))
    }

    async fn discard_cover(&self, location: Option<&str>) {
        let Some(location) = location else {
            return;
        };
        match self.policy.bounded("cover cleanup", self.blobs.delete(location)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%location, error = %err, "orphaned cover image"),
            Err(err) => warn!(%location, error = %err, "orphaned cover image"),
        }
    }
}

#[async_trait]
impl<C, B> CourseCommand for CourseService<C, B>
where
    C: CourseRepository,
    B: BlobStore,
{
    async fn create(
        &self,
        identity: &Identity,
        submission: CourseSubmission,
    ) -> Result<Course, OwnershipError> {
        let details = submission.fields.validate()?;
        let cover_image_ref = self.store_cover(submission.cover.as_ref()).await?;
        let new_course = NewCourse {
            owner_id: identity.id,
            details,
            cover_image_ref,
        };
        let inserted = match self
            .policy
            .bounded("course insert", self.courses.insert(&new_course))
            .await
        {
            Ok(Ok(course)) => course,
            Ok(Err(err)) => {
                self.discard_cover(new_course.cover_image_ref.as_deref()).await;
                return Err(err.into());
            }
            Err(err) => {
                self.discard_cover(new_course.cover_image_ref.as_deref()).await;
                return Err(err.into());
            }
        };
        info!(course_id = %inserted.id, owner_id = %inserted.owner_id, "course created");
        Ok(inserted)
    }

    async fn update(
        &self,
        identity: &Identity,
        course_id: CourseId,
        revision: CourseRevision,
    ) -> Result<Course, OwnershipError> {
        let course = self
            .access
            .check(identity, course_id, CourseAction::Update)
            .await?;
        let mut patch = CoursePatch::from_raw(revision.fields, None)?;
        patch.cover_image_ref = self.store_cover(revision.cover.as_ref()).await?;
        if patch.is_empty() {
            return Ok(course);
        }
        let outcome = match self
            .policy
            .bounded(
                "course update",
                self.courses.update_owned(course_id, course.owner_id, &patch),
            )
            .await
        {
            Ok(Ok(Some(updated))) => Ok(updated),
            Ok(Ok(None)) => Err(OwnershipError::NotFound { course_id }),
            Ok(Err(err)) => Err(err.into()),
            Err(err) => Err(err.into()),
        };
        let updated = match outcome {
            Ok(updated) => updated,
            Err(err) => {
                self.discard_cover(patch.cover_image_ref.as_deref()).await;
                return Err(err);
            }
        };
        info!(
            course_id = %course_id,
            acting = %identity.id,
            owner_id = %course.owner_id,
            "course updated"
        );
        Ok(updated)
    }

    async fn delete(&self, identity: &Identity, course_id: CourseId) -> Result<(), OwnershipError> {
        let course = self
            .access
            .check(identity, course_id, CourseAction::Delete)
            .await?;
        let deleted = self
            .policy
            .bounded(
                "course delete",
                self.courses.delete_owned(course_id, course.owner_id),
            )
            .await??;
        if !deleted {
            return Err(OwnershipError::NotFound { course_id });
        }
        let receipt = CourseDeleted::new(course_id, course.owner_id);
        if let Err(err) = self.materials.discard_course(&receipt).await {
            error!(
                course_id = %course_id,
                error = %err,
                "course deleted but material cleanup failed"
            );
        }
        info!(course_id = %course_id, acting = %identity.id, "course deleted");
        Ok(())
    }
}

#[async_trait]
impl<C, B> CourseQuery for CourseService<C, B>
where
    C: CourseRepository,
    B: BlobStore,
{
    async fn get(&self, course_id: CourseId) -> Result<Option<Course>, OwnershipError> {
        self.access.load(course_id).await
    }

    async fn list(&self) -> Result<Vec<Course>, OwnershipError> {
        self.policy
            .read("course list", || async {
                let found = self
                    .policy
                    .bounded("course list", self.courses.list())
                    .await??;
                Ok::<_, OwnershipError>(found)
            })
            .await
    }
}

#[cfg(test)]
#[path = "course_service_tests.rs"]
mod tests;
