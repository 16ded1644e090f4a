//! Local cache reconciler.
//!
//! Presents durable and cached materials as one list and promotes cached
//! entries to durable storage on request. Merging never deduplicates: a file
//! that is both cached and durable appears twice, once per source.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::cache::{CacheError, CachedMaterial, LocalMaterialCache};
use crate::domain::ports::MaterialCommand;
use crate::domain::{
    ContentType, CourseId, Error, FileUploadError, Identity, MaterialError, MaterialId,
    MaterialRef, MaterialSource,
};

/// One row of the merged material list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialView {
    /// Durable id; cached entries have none until promoted.
    pub id: Option<MaterialId>,
    pub name: String,
    pub source: MaterialSource,
    pub content_type: ContentType,
    pub size_bytes: u64,
    /// Upload time for durable entries, cache time otherwise.
    pub added_at: DateTime<Utc>,
}

impl From<&MaterialRef> for MaterialView {
    fn from(material: &MaterialRef) -> Self {
        Self {
            id: Some(material.id),
            name: material.name.clone(),
            source: material.source.clone(),
            content_type: material.content_type,
            size_bytes: material.size_bytes,
            added_at: material.uploaded_at,
        }
    }
}

impl From<&CachedMaterial> for MaterialView {
    fn from(material: &CachedMaterial) -> Self {
        Self {
            id: None,
            name: material.name().to_owned(),
            source: MaterialSource::Cached {
                key: material.name().to_owned(),
            },
            content_type: material.content_type(),
            size_bytes: material.size_bytes(),
            added_at: material.cached_at(),
        }
    }
}

/// Durable entries first, then cached ones, each in their own order.
#[must_use]
pub fn merge(durable: &[MaterialRef], cached: &[CachedMaterial]) -> Vec<MaterialView> {
    durable
        .iter()
        .map(MaterialView::from)
        .chain(cached.iter().map(MaterialView::from))
        .collect()
}

/// Why a promotion did not go through. The cache is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoteError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("cached material cannot be uploaded: {0}")]
    InvalidEntry(#[from] FileUploadError),
    #[error(transparent)]
    Material(#[from] MaterialError),
}

impl From<PromoteError> for Error {
    fn from(value: PromoteError) -> Self {
        match value {
            PromoteError::Cache(inner) => Self::internal(inner.to_string()),
            PromoteError::InvalidEntry(inner) => Self::invalid_request(inner.to_string()),
            PromoteError::Material(inner) => inner.into(),
        }
    }
}

/// Result of a successful promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// Names moved to durable storage, in cache order.
    pub promoted: Vec<String>,
    /// The course's durable list after the append; `None` when the cache was
    /// empty and nothing was sent.
    pub materials: Option<Vec<MaterialRef>>,
    /// `false` when the append succeeded but the promoted entries could not
    /// be dropped from the cache.
    pub cache_cleared: bool,
}

/// Reads and writes the local cache and moves entries to durable storage.
pub struct CacheReconciler<C> {
    cache: Arc<C>,
}

impl<C: LocalMaterialCache> CacheReconciler<C> {
    /// Reconciler over a local material cache.
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    pub async fn load(&self, course_id: CourseId) -> Result<Vec<CachedMaterial>, CacheError> {
        self.cache.load(course_id).await
    }

    pub async fn save(
        &self,
        course_id: CourseId,
        materials: &[CachedMaterial],
    ) -> Result<(), CacheError> {
        self.cache.save(course_id, materials).await
    }

    /// Add `material` to the course cache, replacing an entry of the same
    /// name in place.
    pub async fn stage(
        &self,
        course_id: CourseId,
        material: CachedMaterial,
    ) -> Result<Vec<CachedMaterial>, CacheError> {
        let mut cached = self.cache.load(course_id).await?;
        match cached.iter_mut().find(|entry| entry.name() == material.name()) {
            Some(existing) => *existing = material,
            None => cached.push(material),
        }
        self.cache.save(course_id, &cached).await?;
        Ok(cached)
    }

    /// Drop the cached entry called `name`. Unknown names change nothing.
    pub async fn discard(
        &self,
        course_id: CourseId,
        name: &str,
    ) -> Result<Vec<CachedMaterial>, CacheError> {
        let mut cached = self.cache.load(course_id).await?;
        let before = cached.len();
        cached.retain(|entry| entry.name() != name);
        if cached.len() != before {
            self.cache.save(course_id, &cached).await?;
        }
        Ok(cached)
    }

    /// Load the cache and merge it behind `durable`.
    pub async fn view(
        &self,
        course_id: CourseId,
        durable: &[MaterialRef],
    ) -> Result<Vec<MaterialView>, CacheError> {
        let cached = self.cache.load(course_id).await?;
        Ok(merge(durable, &cached))
    }

    /// Append every cached entry through `command`, then remove those
    /// entries from the cache.
    ///
    /// # Errors
    ///
    /// Any failure before the append completes leaves the cache untouched.
    pub async fn promote(
        &self,
        identity: &Identity,
        course_id: CourseId,
        command: &dyn MaterialCommand,
    ) -> Result<Promotion, PromoteError> {
        let cached = self.cache.load(course_id).await?;
        if cached.is_empty() {
            return Ok(Promotion {
                promoted: Vec::new(),
                materials: None,
                cache_cleared: true,
            });
        }
        let uploads = cached
            .iter()
            .map(CachedMaterial::to_upload)
            .collect::<Result<Vec<_>, _>>()?;
        let materials = command.append(identity, course_id, uploads).await?;
        let promoted: Vec<String> = cached.iter().map(|entry| entry.name().to_owned()).collect();
        info!(
            course_id = %course_id,
            identity_id = %identity.id,
            count = promoted.len(),
            "cached materials promoted"
        );

        let cache_cleared = match self.remove_promoted(course_id, &cached).await {
            Ok(()) => true,
            Err(err) => {
                warn!(course_id = %course_id, error = %err, "promoted entries left in cache");
                false
            }
        };
        Ok(Promotion {
            promoted,
            materials: Some(materials),
            cache_cleared,
        })
    }

    /// Re-read the cache so entries staged during the append survive.
    async fn remove_promoted(
        &self,
        course_id: CourseId,
        promoted: &[CachedMaterial],
    ) -> Result<(), CacheError> {
        let mut current = self.cache.load(course_id).await?;
        current.retain(|entry| !promoted.contains(entry));
        self.cache.save(course_id, &current).await
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
