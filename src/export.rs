//! Export renderer: generated image → print-size JPEG.
//!
//! The image is scaled (never cropped) to exactly the preset's pixel size,
//! encoded as JPEG at [`EXPORT_QUALITY`] and named
//! `<label>_<width>x<height>.jpg`. [`save`] is the download step: it writes
//! the artifact into an output directory.

use crate::config::ExportConfig;
use crate::imaging::{BackendError, ImageBackend, Quality, RenderParams, RustBackend};
use crate::locale::Locale;
use crate::types::{EncodedFile, EncodedImage, PrintSize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const JPEG_MIME: &str = "image/jpeg";

/// Every export is encoded at this quality.
pub const EXPORT_QUALITY: Quality = Quality(90);

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("could not decode the generated image: {0}")]
    Decode(String),
    #[error("could not encode the exported photo: {0}")]
    Encode(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<BackendError> for ExportError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Decode(msg) => Self::Decode(msg),
            BackendError::Encode(msg) => Self::Encode(msg),
        }
    }
}

/// Label used when the config does not set one.
pub fn default_label(locale: Locale) -> &'static str {
    match locale {
        Locale::ZhCn => "证件照",
        Locale::En | Locale::Fr | Locale::Ja => "id_photo",
    }
}

/// Artifact file name for a preset.
pub fn file_name(label: &str, size: PrintSize) -> String {
    format!("{}_{}x{}.jpg", label, size.width(), size.height())
}

pub struct ExportRenderer<B: ImageBackend = RustBackend> {
    backend: B,
    label: String,
}

impl ExportRenderer<RustBackend> {
    pub fn from_config(config: &ExportConfig, locale: Locale) -> Self {
        Self::with_backend(RustBackend::new(), config, locale)
    }
}

impl<B: ImageBackend> ExportRenderer<B> {
    pub fn with_backend(backend: B, config: &ExportConfig, locale: Locale) -> Self {
        let label = config
            .label
            .clone()
            .unwrap_or_else(|| default_label(locale).to_string());
        Self { backend, label }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Render `image` at `size`. Does not touch the filesystem.
    pub fn export(&self, image: &EncodedImage, size: PrintSize) -> Result<EncodedFile, ExportError> {
        let source = self.backend.identify(image.bytes())?;
        tracing::debug!(
            source_width = source.width,
            source_height = source.height,
            target_width = size.width(),
            target_height = size.height(),
            "exporting"
        );

        let bytes = self.backend.render(&RenderParams {
            source: image.bytes(),
            width: size.width(),
            height: size.height(),
            quality: EXPORT_QUALITY,
        })?;

        Ok(EncodedFile {
            file_name: file_name(&self.label, size),
            mime_type: JPEG_MIME,
            bytes,
        })
    }
}

/// Write the artifact into `dir`, creating it if needed. An existing file with
/// the same name is replaced.
pub fn save(file: &EncodedFile, dir: &Path) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = file.bytes.len(), "saved export");
    Ok(path)
}
