//! Material attachment manager.
//!
//! Blobs are written before rows so a row never points at missing bytes.
//! When the row insert fails the freshly written blobs are removed again;
//! removal runs the other way round, deleting blobs only after their rows
//! are gone.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{info, warn};

use super::authorization::{CourseAction, Forbidden};
use super::course_service::{CourseAccess, CourseDeleted, OwnershipError};
use super::ports::{
    BlobStore, BlobStoreError, CourseRepository, MaterialCascade, MaterialCommand,
    MaterialQuery, MaterialRepository, MaterialRepositoryError,
};
use super::resilience::{StoragePolicy, TimedOut, Transience};
use super::{
    ContentType, CourseId, Error, FileUpload, Identity, IdentityId, MaterialId, MaterialKey,
    MaterialRef, MaterialSource,
};

/// Why a material operation did not go through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MaterialError {
    #[error(transparent)]
    Forbidden(#[from] Forbidden),
    #[error("course {course_id} not found")]
    NotFound { course_id: CourseId },
    #[error("material {material_id} not found")]
    MaterialNotFound { material_id: MaterialId },
    #[error("{message}")]
    Invalid { message: String },
    #[error("material storage unavailable: {message}")]
    Transient { message: String },
    #[error("material storage failed: {message}")]
    StorageFailure { message: String },
}

impl Transience for MaterialError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

impl From<OwnershipError> for MaterialError {
    fn from(value: OwnershipError) -> Self {
        match value {
            OwnershipError::NotFound { course_id } => Self::NotFound { course_id },
            OwnershipError::Forbidden(denied) => Self::Forbidden(denied),
            OwnershipError::Invalid(inner) => Self::Invalid {
                message: inner.to_string(),
            },
            OwnershipError::Transient { message } => Self::Transient { message },
            OwnershipError::Storage { message } => Self::StorageFailure { message },
        }
    }
}

impl From<MaterialRepositoryError> for MaterialError {
    fn from(value: MaterialRepositoryError) -> Self {
        match value {
            MaterialRepositoryError::Connection { message } => Self::Transient { message },
            MaterialRepositoryError::Query { message } => Self::StorageFailure { message },
        }
    }
}

impl From<BlobStoreError> for MaterialError {
    fn from(value: BlobStoreError) -> Self {
        Self::StorageFailure {
            message: value.to_string(),
        }
    }
}

impl From<TimedOut> for MaterialError {
    fn from(value: TimedOut) -> Self {
        Self::Transient {
            message: value.to_string(),
        }
    }
}

impl From<MaterialError> for Error {
    fn from(value: MaterialError) -> Self {
        match value {
            MaterialError::Forbidden(_) => Self::forbidden(value.to_string()),
            MaterialError::NotFound { .. } | MaterialError::MaterialNotFound { .. } => {
                Self::not_found(value.to_string())
            }
            MaterialError::Invalid { message } => Self::invalid_request(message),
            MaterialError::Transient { .. } => Self::transient(value.to_string()),
            MaterialError::StorageFailure { .. } => Self::internal(value.to_string()),
        }
    }
}

/// Implements [`MaterialCommand`], [`MaterialQuery`] and [`MaterialCascade`].
pub struct MaterialService<M, C, B> {
    materials: Arc<M>,
    access: Arc<CourseAccess<C>>,
    blobs: Arc<B>,
    clock: Arc<dyn Clock>,
    policy: StoragePolicy,
}

impl<M, C, B> MaterialService<M, C, B>
where
    M: MaterialRepository,
    C: CourseRepository,
    B: BlobStore,
{
    /// Service keeping metadata in `materials` and bytes in `blobs`.
    pub fn new(
        materials: Arc<M>,
        access: Arc<CourseAccess<C>>,
        blobs: Arc<B>,
        clock: Arc<dyn Clock>,
        policy: StoragePolicy,
    ) -> Self {
        Self {
            materials,
            access,
            blobs,
            clock,
            policy,
        }
    }

    /// Best-effort deletion of durable blobs; failures are logged only.
    async fn discard_blobs(&self, course_id: CourseId, stored: &[MaterialRef]) {
        for material in stored {
            let MaterialSource::Durable { uri } = &material.source else {
                continue;
            };
            let outcome = self
                .policy
                .bounded("material blob cleanup", self.blobs.delete(uri))
                .await
                .map_err(MaterialError::from)
                .and_then(|inner| inner.map_err(MaterialError::from));
            if let Err(err) = outcome {
                warn!(
                    course_id = %course_id,
                    material_id = %material.id,
                    error = %err,
                    "orphaned material blob"
                );
            }
        }
    }

    async fn store_blobs(
        &self,
        course_id: CourseId,
        course_owner: IdentityId,
        files: &[FileUpload],
    ) -> Result<Vec<MaterialRef>, MaterialError> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            let id = MaterialId::random();
            let put = self
                .policy
                .bounded(
                    "material upload",
                    self.blobs
                        .put_material(course_id, id, file.name(), file.bytes()),
                )
                .await
                .map_err(MaterialError::from)
                .and_then(|inner| inner.map_err(MaterialError::from));
            let uri = match put {
                Ok(uri) => uri,
                Err(err) => {
                    self.discard_blobs(course_id, &stored).await;
                    return Err(err);
                }
            };
            stored.push(MaterialRef {
                id,
                name: file.name().to_owned(),
                source: MaterialSource::Durable { uri },
                content_type: ContentType::classify(file.name()),
                size_bytes: file.size_bytes(),
                uploaded_at: self.clock.utc(),
                uploaded_by: course_owner,
            });
        }
        Ok(stored)
    }
}

#[async_trait]
impl<M, C, B> MaterialCommand for MaterialService<M, C, B>
where
    M: MaterialRepository,
    C: CourseRepository,
    B: BlobStore,
{
    async fn append(
        &self,
        identity: &Identity,
        course_id: CourseId,
        files: Vec<FileUpload>,
    ) -> Result<Vec<MaterialRef>, MaterialError> {
        let course = self
            .access
            .check(identity, course_id, CourseAction::AddMaterial)
            .await?;
        if files.is_empty() {
            return Err(MaterialError::Invalid {
                message: "at least one file is required".to_owned(),
            });
        }
        let stored = self.store_blobs(course_id, course.owner_id, &files).await?;

        let appended = self
            .policy
            .bounded(
                "material append",
                self.materials.append(course_id, course.owner_id, &stored),
            )
            .await
            .map_err(MaterialError::from)
            .and_then(|inner| inner.map_err(MaterialError::from))
            .and_then(|list| list.ok_or(MaterialError::NotFound { course_id }));
        let list = match appended {
            Ok(list) => list,
            Err(err) => {
                self.discard_blobs(course_id, &stored).await;
                return Err(err);
            }
        };

        if identity.id == course.owner_id {
            info!(course_id = %course_id, added = stored.len(), "materials appended");
        } else {
            info!(
                course_id = %course_id,
                added = stored.len(),
                owner_id = %course.owner_id,
                acting_admin = %identity.id,
                "materials appended on behalf of owner"
            );
        }
        Ok(list)
    }

    async fn remove(
        &self,
        identity: &Identity,
        course_id: CourseId,
        key: &MaterialKey,
    ) -> Result<Vec<MaterialRef>, MaterialError> {
        let course = self
            .access
            .check(identity, course_id, CourseAction::RemoveMaterial)
            .await?;
        let removal = self
            .policy
            .bounded(
                "material removal",
                self.materials.remove(course_id, course.owner_id, key),
            )
            .await??
            .ok_or(MaterialError::NotFound { course_id })?;

        if removal.removed.is_empty() {
            if let MaterialKey::Id(material_id) = key {
                return Err(MaterialError::MaterialNotFound {
                    material_id: *material_id,
                });
            }
            return Ok(removal.remaining);
        }
        self.discard_blobs(course_id, &removal.removed).await;
        info!(
            course_id = %course_id,
            acting = %identity.id,
            removed = removal.removed.len(),
            %key,
            "materials removed"
        );
        Ok(removal.remaining)
    }
}

#[async_trait]
impl<M, C, B> MaterialQuery for MaterialService<M, C, B>
where
    M: MaterialRepository,
    C: CourseRepository,
    B: BlobStore,
{
    async fn list(&self, course_id: CourseId) -> Result<Vec<MaterialRef>, MaterialError> {
        let listed = self
            .policy
            .read("material list", || async {
                let listed = self
                    .policy
                    .bounded("material list", self.materials.list(course_id))
                    .await??;
                Ok::<_, MaterialError>(listed)
            })
            .await?;
        // A deleted or unknown course has no materials.
        Ok(listed.unwrap_or_default())
    }
}

#[async_trait]
impl<M, C, B> MaterialCascade for MaterialService<M, C, B>
where
    M: MaterialRepository,
    C: CourseRepository,
    B: BlobStore,
{
    async fn discard_course(&self, deleted: &CourseDeleted) -> Result<(), MaterialError> {
        let course_id = deleted.course_id();
        let leftovers = self
            .policy
            .bounded("material clear", self.materials.clear(course_id))
            .await??;
        self.policy
            .bounded("course blob cleanup", self.blobs.delete_course(course_id))
            .await??;
        info!(
            course_id = %course_id,
            owner_id = %deleted.owner_id(),
            leftover_rows = leftovers.len(),
            "course materials discarded"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "material_service_tests.rs"]
mod tests;
