//! File intake: type and size checks, then an in-memory [`EncodedImage`].
//!
//! Validation runs on the *declared* metadata of a [`FileHandle`] before any
//! bytes are read: the type comes from the file extension and the size from
//! file metadata. Only a handle that passes both checks is read.

use crate::types::EncodedImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncReadExt;

/// Upper bound on accepted uploads (10 MiB, inclusive).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("unsupported file type '{0}': please choose an image file")]
    UnsupportedType(String),
    #[error("image is {size} bytes; the limit is {limit} bytes (10 MiB)")]
    TooLarge { size: u64, limit: u64 },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A user-supplied file with its declared type and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub declared_type: String,
    pub declared_size: u64,
}

impl FileHandle {
    /// Describe a file on disk. The type is declared from the extension, the
    /// size from file metadata.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ValidationError> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|source| ValidationError::Read {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            declared_type: declared_type_for(&path),
            declared_size: metadata.len(),
            path,
        })
    }
}

/// MIME type implied by the file name.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn declared_type_for(path: &Path) -> String {
    image::ImageFormat::from_path(path)
        .map(|fmt| fmt.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

/// Check the declared metadata without touching the file.
pub fn check(file: &FileHandle) -> Result<(), ValidationError> {
    if !file.declared_type.starts_with("image/") {
        return Err(ValidationError::UnsupportedType(file.declared_type.clone()));
    }
    if file.declared_size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size: file.declared_size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Validate a file and read it into an [`EncodedImage`].
pub async fn validate(file: &FileHandle) -> Result<EncodedImage, ValidationError> {
    check(file)?;

    let read_err = |source| ValidationError::Read {
        path: file.path.clone(),
        source,
    };
    // The file may have grown between stat and read; never pull in more
    // than one byte past the limit.
    let mut bytes = Vec::new();
    tokio::fs::File::open(&file.path)
        .await
        .map_err(read_err)?
        .take(MAX_UPLOAD_BYTES + 1)
        .read_to_end(&mut bytes)
        .await
        .map_err(read_err)?;

    let actual = bytes.len() as u64;
    if actual > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size: actual,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    tracing::debug!(path = %file.path.display(), mime = %file.declared_type, bytes = actual, "file accepted");
    Ok(EncodedImage::new(file.declared_type.clone(), bytes))
}
