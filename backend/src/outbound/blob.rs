//! Durable blob storage rooted in a capability-scoped directory.
//!
//! Every write lands in a hidden staging file beside its target and is then
//! renamed into place, so readers never observe a partially written blob.
//! Locations are relative paths below the root; absolute paths and `..`
//! components are refused before touching the filesystem.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{BlobStore, BlobStoreError};
use crate::domain::{CourseId, MaterialId};

const COURSES_DIR: &str = "courses";
const COVERS_DIR: &str = "covers";

/// `BlobStore` adapter writing through `cap_std::fs::Dir`.
#[derive(Clone)]
pub struct CapStdBlobStore {
    root: Arc<Dir>,
}

impl CapStdBlobStore {
    /// Open (creating when needed) the blob root at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be created
    /// or opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let root = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self::from_dir(root))
    }

    /// Store rooted at an already opened directory.
    pub fn from_dir(root: Dir) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    async fn run<T, F>(&self, work: F) -> Result<T, BlobStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> io::Result<T> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || work(&root))
            .await
            .map_err(|error| BlobStoreError::io(error.to_string()))?
            .map_err(|error| BlobStoreError::io(error.to_string()))
    }

    async fn write_staged(
        &self,
        location: String,
        bytes: Vec<u8>,
    ) -> Result<String, BlobStoreError> {
        let target = checked_location(&location)?;
        self.run(move |root| {
            let parent = target.parent().unwrap_or_else(|| Path::new(""));
            if !parent.as_os_str().is_empty() {
                root.create_dir_all(parent)?;
            }
            let staged = parent.join(format!(".tmp-{}", Uuid::new_v4().simple()));
            root.write(&staged, &bytes)?;
            if let Err(error) = root.rename(&staged, root, &target) {
                let _cleanup = root.remove_file(&staged);
                return Err(error);
            }
            Ok(())
        })
        .await?;
        debug!(location = %location, "blob stored");
        Ok(location)
    }
}

/// Reduce a client-supplied file name to a safe single path segment.
fn sanitise(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn checked_location(location: &str) -> Result<PathBuf, BlobStoreError> {
    let path = Path::new(location);
    let relative = !location.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if relative {
        Ok(path.to_path_buf())
    } else {
        Err(BlobStoreError::invalid_location(location))
    }
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[async_trait]
impl BlobStore for CapStdBlobStore {
    async fn put_material(
        &self,
        course_id: CourseId,
        material_id: MaterialId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, BlobStoreError> {
        let location = format!(
            "{COURSES_DIR}/{course_id}/{material_id}-{}",
            sanitise(file_name)
        );
        self.write_staged(location, bytes.to_vec()).await
    }

    async fn put_cover(&self, file_name: &str, bytes: &[u8]) -> Result<String, BlobStoreError> {
        let location = format!(
            "{COVERS_DIR}/{}-{}",
            Uuid::new_v4().simple(),
            sanitise(file_name)
        );
        self.write_staged(location, bytes.to_vec()).await
    }

    async fn delete(&self, location: &str) -> Result<(), BlobStoreError> {
        let target = checked_location(location)?;
        self.run(move |root| ignore_missing(root.remove_file(&target)))
            .await
    }

    async fn delete_course(&self, course_id: CourseId) -> Result<(), BlobStoreError> {
        let directory = PathBuf::from(COURSES_DIR).join(course_id.to_string());
        self.run(move |root| ignore_missing(root.remove_dir_all(&directory)))
            .await
    }
}
