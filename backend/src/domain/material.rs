//! Course material references.
//!
//! A [`MaterialRef`] points at a file attached to a course. The bytes live
//! either in the durable blob store on the server or in a consumer's local
//! cache; [`MaterialSource`] records which.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::IdentityId;

/// Stable material key generated at upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(Uuid);

impl MaterialId {
    /// Fresh random v4 key.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MaterialId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Coarse file category derived from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Pdf,
    Image,
    Document,
    Presentation,
    Other,
}

impl ContentType {
    /// Classify a file by its extension, ignoring case.
    ///
    /// ```
    /// use course_market::domain::ContentType;
    ///
    /// assert_eq!(ContentType::classify("Syllabus.PDF"), ContentType::Pdf);
    /// assert_eq!(ContentType::classify("notes"), ContentType::Other);
    /// ```
    #[must_use]
    pub fn classify(file_name: &str) -> Self {
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            return Self::Other;
        };
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "jpg" | "jpeg" | "png" | "gif" => Self::Image,
            "doc" | "docx" => Self::Document,
            "ppt" | "pptx" => Self::Presentation,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Image => "IMAGE",
            Self::Document => "DOCUMENT",
            Self::Presentation => "PRESENTATION",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PDF" => Ok(Self::Pdf),
            "IMAGE" => Ok(Self::Image),
            "DOCUMENT" => Ok(Self::Document),
            "PRESENTATION" => Ok(Self::Presentation),
            "OTHER" => Ok(Self::Other),
            other => Err(UnknownContentType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type `{0}`")]
pub struct UnknownContentType(pub String);

/// Where a material's bytes currently live.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MaterialSource {
    /// Stored by the server; `uri` is the course-scoped blob path.
    Durable { uri: String },
    /// Held only in a consumer's local cache under `key`.
    Cached { key: String },
}

impl MaterialSource {
    /// True once the bytes live in server storage.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::Durable { .. })
    }
}

/// Metadata for one attached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRef {
    pub id: MaterialId,
    pub name: String,
    pub source: MaterialSource,
    pub content_type: ContentType,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
    pub uploaded_by: IdentityId,
}

/// An uploaded file before it is stored.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    name: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileUploadError {
    #[error("file name must not be empty")]
    EmptyName,
    #[error("file name must not contain path separators or control characters")]
    InvalidName,
}

impl FileUpload {
    /// Accept a client-provided file, keeping the original name for display.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, FileUploadError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(FileUploadError::EmptyName);
        }
        if trimmed.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(FileUploadError::InvalidName);
        }
        Ok(Self {
            name: trimmed.to_owned(),
            bytes,
        })
    }

    /// Original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        u64::try_from(self.bytes.len()).unwrap_or(u64::MAX)
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// How a removal request identifies its targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialKey {
    /// Exactly the material with this id.
    Id(MaterialId),
    /// Every material carrying this name.
    Name(String),
}

impl MaterialKey {
    #[must_use]
    pub fn matches(&self, material: &MaterialRef) -> bool {
        match self {
            Self::Id(id) => material.id == *id,
            Self::Name(name) => material.name == *name,
        }
    }
}

impl fmt::Display for MaterialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name {name:?}"),
        }
    }
}
