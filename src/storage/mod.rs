//! Object storage for motorcycle photos.
//!
//! Objects are addressed by relative keys such as `motorcycles/7/1718035200000-front.jpg`
//! and served back through `GET /api/files/{key}`.

use async_trait::async_trait;
use axum::body::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;

mod local;
mod memory;

pub use local::LocalImageStore;
pub use memory::InMemoryImageStore;

/// Route prefix under which stored objects are served.
pub const FILES_ROUTE_PREFIX: &str = "/api/files";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", FILES_ROUTE_PREFIX, key)
    }
}

/// Builds the store selected by `storage_backend`.
pub fn from_config(cfg: &AppConfig) -> Arc<dyn ImageStore> {
    match cfg.storage_backend.as_str() {
        "memory" => Arc::new(InMemoryImageStore::new()),
        _ => Arc::new(LocalImageStore::new(&cfg.upload_dir)),
    }
}

/// Keys must be relative and free of traversal segments.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        Err(StorageError::InvalidKey(key.to_string()))
    } else {
        Ok(())
    }
}

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid filename pattern"));

/// Reduces an uploaded filename to a safe single path segment.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "imagem".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn motorcycle_image_key(motorcycle_id: i32, filename: &str, timestamp_millis: i64) -> String {
    format!(
        "motorcycles/{}/{}-{}",
        motorcycle_id,
        timestamp_millis,
        sanitize_filename(filename)
    )
}

/// Raster formats accepted for upload and served inline.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
];

/// Normalizes a declared content type and checks it against [`ALLOWED_IMAGE_TYPES`].
pub fn allowed_image_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" { "image/jpeg".to_string() } else { essence };
    ALLOWED_IMAGE_TYPES.iter().copied().find(|t| *t == essence)
}

pub fn content_type_for(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("motorcycles/1/a.jpg", true)]
    #[case("", false)]
    #[case("/etc/passwd", false)]
    #[case("motorcycles/../secret", false)]
    #[case("motorcycles//a.jpg", false)]
    #[case("motorcycles\\1\\a.jpg", false)]
    fn key_validation(#[case] key: &str, #[case] valid: bool) {
        assert_eq!(validate_key(key).is_ok(), valid);
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("Foto Frente (1).JPG"), "Foto_Frente_1_.JPG");
        assert_eq!(sanitize_filename("../../evil.png"), "evil.png");
        assert_eq!(sanitize_filename(".."), "imagem");
    }

    #[test]
    fn image_keys_are_scoped_by_motorcycle() {
        let key = motorcycle_image_key(42, "lateral.webp", 1_700_000_000_000);
        assert_eq!(key, "motorcycles/42/1700000000000-lateral.webp");
        assert!(validate_key(&key).is_ok());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("a/b.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a/b.webp"), "image/webp");
        assert_eq!(content_type_for("a/b"), "application/octet-stream");
        assert_eq!(content_type_for("a/b.svg"), "application/octet-stream");
    }

    #[rstest]
    #[case("image/png", Some("image/png"))]
    #[case("IMAGE/JPEG; charset=binary", Some("image/jpeg"))]
    #[case("image/jpg", Some("image/jpeg"))]
    #[case("image/svg+xml", None)]
    #[case("text/html", None)]
    fn only_raster_types_are_allowed(#[case] declared: &str, #[case] expected: Option<&str>) {
        assert_eq!(allowed_image_type(declared), expected);
    }
}
