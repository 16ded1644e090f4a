//! Consumer-side material cache.
//!
//! Each course has one JSON document holding its cached materials in
//! insertion order, with file content inline as base64. Entries are keyed by
//! name within the course.

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::domain::ports::define_port_error;
use crate::domain::{ContentType, CourseId, FileUpload, FileUploadError};

define_port_error! {
    /// Errors raised by local cache adapters.
    pub enum CacheError {
        /// Reading or writing the cache document failed.
        Io { message: String } => "material cache I/O failed: {message}",
        /// The cache document could not be decoded.
        Corrupt { course_id: i64, message: String } =>
            "material cache for course {course_id} is corrupt: {message}",
    }
}

/// A material held only in the local cache.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedMaterial {
    name: String,
    content_type: ContentType,
    #[serde(serialize_with = "encode_content", deserialize_with = "decode_content")]
    content: Vec<u8>,
    cached_at: DateTime<Utc>,
}

fn encode_content<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(content))
}

fn decode_content<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

impl CachedMaterial {
    /// Cache a file under its validated name.
    pub fn new(
        name: impl Into<String>,
        content: Vec<u8>,
        cached_at: DateTime<Utc>,
    ) -> Result<Self, FileUploadError> {
        let upload = FileUpload::new(name, content)?;
        Ok(Self::from_upload(&upload, cached_at))
    }

    #[must_use]
    pub fn from_upload(upload: &FileUpload, cached_at: DateTime<Utc>) -> Self {
        Self {
            name: upload.name().to_owned(),
            content_type: ContentType::classify(upload.name()),
            content: upload.bytes().to_vec(),
            cached_at,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        self.content_type
    }

    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    #[must_use]
    pub const fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.content.len()).unwrap_or(u64::MAX)
    }

    /// The upload that promotes this entry to durable storage.
    pub fn to_upload(&self) -> Result<FileUpload, FileUploadError> {
        FileUpload::new(self.name.clone(), self.content.clone())
    }
}

impl std::fmt::Debug for CachedMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedMaterial")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.content.len())
            .field("cached_at", &self.cached_at)
            .finish()
    }
}

/// Course-scoped store of cached materials.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocalMaterialCache: Send + Sync {
    /// Cached materials for the course, oldest first. Empty when nothing is
    /// cached.
    async fn load(&self, course_id: CourseId) -> Result<Vec<CachedMaterial>, CacheError>;

    /// Replace the cached list for the course.
    async fn save(&self, course_id: CourseId, materials: &[CachedMaterial])
    -> Result<(), CacheError>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheDocument {
    course_id: i64,
    materials: Vec<CachedMaterial>,
}

/// [`LocalMaterialCache`] keeping one JSON document per course in a
/// `cap_std` directory.
#[derive(Clone)]
pub struct FsMaterialCache {
    root: Arc<Dir>,
}

impl FsMaterialCache {
    /// Open (creating when needed) the cache directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the directory cannot be created
    /// or opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let root = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    fn document_name(course_id: CourseId) -> String {
        format!("course-{course_id}.json")
    }

    async fn run<T, F>(&self, work: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, CacheError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        tokio::task::spawn_blocking(move || work(&root))
            .await
            .map_err(|err| CacheError::io(err.to_string()))?
    }
}

#[async_trait]
impl LocalMaterialCache for FsMaterialCache {
    async fn load(&self, course_id: CourseId) -> Result<Vec<CachedMaterial>, CacheError> {
        let name = Self::document_name(course_id);
        self.run(move |root| {
            let raw = match root.read(&name) {
                Ok(raw) => raw,
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(CacheError::io(err.to_string())),
            };
            let document: CacheDocument = serde_json::from_slice(&raw)
                .map_err(|err| CacheError::corrupt(course_id.get(), err.to_string()))?;
            Ok(document.materials)
        })
        .await
    }

    async fn save(
        &self,
        course_id: CourseId,
        materials: &[CachedMaterial],
    ) -> Result<(), CacheError> {
        let name = Self::document_name(course_id);
        if materials.is_empty() {
            return self
                .run(move |root| match root.remove_file(&name) {
                    Ok(()) => Ok(()),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
                    Err(err) => Err(CacheError::io(err.to_string())),
                })
                .await;
        }
        let document = CacheDocument {
            course_id: course_id.get(),
            materials: materials.to_vec(),
        };
        let bytes =
            serde_json::to_vec_pretty(&document).map_err(|err| CacheError::io(err.to_string()))?;
        self.run(move |root| {
            let staged = format!(".tmp-{}", Uuid::new_v4());
            root.write(&staged, &bytes)
                .and_then(|()| root.rename(&staged, root, &name))
                .map_err(|err| {
                    let _ = root.remove_file(&staged);
                    CacheError::io(err.to_string())
                })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::fixed_clock;
    use crate::test_support::cap_fs::{path_exists, read_file_to_string, write_file};
    use mockable::Clock as _;
    use rstest::{fixture, rstest};

    struct TempCache {
        cache: FsMaterialCache,
        dir: tempfile::TempDir,
    }

    #[fixture]
    fn temp_cache() -> TempCache {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = FsMaterialCache::open(dir.path()).expect("cache root");
        TempCache { cache, dir }
    }

    fn cached(name: &str, content: &[u8]) -> CachedMaterial {
        CachedMaterial::new(name, content.to_vec(), fixed_clock().utc()).expect("valid name")
    }

    #[rstest]
    #[tokio::test]
    async fn uncached_course_loads_empty(temp_cache: TempCache) {
        let loaded = temp_cache
            .cache
            .load(CourseId::new(1))
            .await
            .expect("load succeeds");
        assert!(loaded.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn saved_materials_come_back_in_order(temp_cache: TempCache) {
        let course = CourseId::new(4);
        let materials = vec![cached("b.pdf", b"\x00\xffbinary"), cached("a.png", b"png")];
        temp_cache
            .cache
            .save(course, &materials)
            .await
            .expect("save succeeds");

        let loaded = temp_cache.cache.load(course).await.expect("load succeeds");
        assert_eq!(loaded, materials);
        assert_eq!(loaded[0].content_type(), ContentType::Pdf);
        assert!(
            temp_cache
                .cache
                .load(CourseId::new(5))
                .await
                .expect("other course")
                .is_empty()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn content_is_stored_as_base64(temp_cache: TempCache) {
        let course = CourseId::new(4);
        temp_cache
            .cache
            .save(course, &[cached("notes.txt", b"hi")])
            .await
            .expect("save succeeds");

        let raw = read_file_to_string(&temp_cache.dir.path().join("course-4.json"))
            .expect("document written");
        assert!(raw.contains("\"content\": \"aGk=\""));
    }

    #[rstest]
    #[tokio::test]
    async fn saving_nothing_removes_the_document(temp_cache: TempCache) {
        let course = CourseId::new(4);
        temp_cache
            .cache
            .save(course, &[cached("notes.txt", b"hi")])
            .await
            .expect("save succeeds");
        temp_cache.cache.save(course, &[]).await.expect("cleared");

        assert!(!path_exists(&temp_cache.dir.path().join("course-4.json")));
    }

    #[rstest]
    #[tokio::test]
    async fn corrupt_documents_are_reported(temp_cache: TempCache) {
        write_file(&temp_cache.dir.path().join("course-9.json"), b"{not json")
            .expect("write garbage");

        let err = temp_cache
            .cache
            .load(CourseId::new(9))
            .await
            .expect_err("corrupt");
        assert!(matches!(err, CacheError::Corrupt { course_id: 9, .. }));
    }
}
