//! Shared helpers for `multipart/form-data` bodies.

use actix_multipart::form::MultipartFormConfig;
use actix_multipart::form::bytes::Bytes;
use actix_web::guard::GuardContext;
use actix_web::http::header;

use crate::domain::{Error, FileUpload};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Route guard selecting handlers that read multipart bodies.
pub fn is_multipart(ctx: &GuardContext<'_>) -> bool {
    ctx.header::<header::ContentType>()
        .is_some_and(|content_type| content_type.0.essence_str() == "multipart/form-data")
}

/// Upload limits, with extraction failures reported as domain errors.
pub fn form_config() -> MultipartFormConfig {
    MultipartFormConfig::default()
        .total_limit(MAX_UPLOAD_BYTES)
        .memory_limit(MAX_UPLOAD_BYTES)
        .error_handler(|err, _req| Error::invalid_request(err.to_string()).into())
}

/// Convert a file part into a validated upload.
pub fn file_upload(part: Bytes) -> Result<FileUpload, Error> {
    let name = part
        .file_name
        .ok_or_else(|| Error::invalid_request("uploaded file has no file name"))?;
    FileUpload::new(name, part.data.to_vec()).map_err(|err| Error::invalid_request(err.to_string()))
}

/// Like [`file_upload`], but treat an empty file input as no upload.
pub fn optional_file_upload(part: Option<Bytes>) -> Result<Option<FileUpload>, Error> {
    match part {
        Some(part)
            if part.data.is_empty() && part.file_name.as_deref().is_none_or(str::is_empty) =>
        {
            Ok(None)
        }
        Some(part) => file_upload(part).map(Some),
        None => Ok(None),
    }
}
