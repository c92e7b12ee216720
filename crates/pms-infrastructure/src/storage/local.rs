// ============================================================================
// PMS Infrastructure - Local Attachment Storage
// File: crates/pms-infrastructure/src/storage/local.rs
// ============================================================================

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;
use uuid::Uuid;

use pms_core::attachment::{AttachmentKind, AttachmentPolicy, AttachmentStorage, UploadedFile};
use pms_core::error::DomainError;
use pms_shared::config::StorageSettings;
use pms_shared::constants::MAX_IMAGE_DIMENSION;

const JPEG_QUALITY: u8 = 85;

/// Detected upload content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detected {
    Image,
    Pdf,
}

/// Writes uploads under `upload_dir` and serves them from `public_path`.
/// Images are downscaled to fit `MAX_IMAGE_DIMENSION` and re-encoded as
/// JPEG; PDFs are stored untouched.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStorage {
    upload_dir: PathBuf,
    public_path: String,
    max_file_size: usize,
}

impl LocalAttachmentStorage {
    pub fn new(settings: &StorageSettings) -> Self {
        Self {
            upload_dir: PathBuf::from(&settings.upload_dir),
            public_path: settings.public_path.trim_end_matches('/').to_string(),
            max_file_size: settings.max_file_size,
        }
    }

    fn detect(bytes: &[u8], kind: AttachmentKind) -> Result<Detected, DomainError> {
        let detected = match infer::get(bytes).map(|t| t.mime_type()) {
            Some("image/jpeg") | Some("image/png") => Detected::Image,
            Some("application/pdf") => Detected::Pdf,
            _ => return Err(rejected(kind)),
        };
        match (kind, detected) {
            (AttachmentKind::Image, Detected::Pdf) => Err(rejected(kind)),
            _ => Ok(detected),
        }
    }
}

fn rejected(kind: AttachmentKind) -> DomainError {
    DomainError::Attachment(match kind {
        AttachmentKind::Image => "Hanya file JPG atau PNG yang diizinkan".to_string(),
        AttachmentKind::Document => "Hanya file JPG, PNG, atau PDF yang diizinkan".to_string(),
    })
}

/// Fit inside the bounding box without upscaling, then encode as JPEG
fn transcode_image(bytes: &[u8]) -> Result<Vec<u8>, DomainError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| DomainError::Attachment(format!("Gambar tidak valid: {}", e)))?;
    let img = if img.width() > MAX_IMAGE_DIMENSION || img.height() > MAX_IMAGE_DIMENSION {
        img.resize(MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION, FilterType::Lanczos3)
    } else {
        img
    };

    let mut out = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| DomainError::StorageError(e.to_string()))?;
    Ok(out.into_inner())
}

#[async_trait]
impl AttachmentStorage for LocalAttachmentStorage {
    async fn store(&self, file: &UploadedFile, policy: AttachmentPolicy) -> Result<String, DomainError> {
        if file.bytes.is_empty() {
            return Err(DomainError::Attachment("File kosong".to_string()));
        }
        if file.bytes.len() > self.max_file_size {
            return Err(DomainError::Attachment(format!(
                "Ukuran file maksimal {} MB",
                self.max_file_size / (1024 * 1024)
            )));
        }

        let (bytes, ext) = match Self::detect(&file.bytes, policy.kind)? {
            Detected::Pdf => (file.bytes.clone(), "pdf"),
            Detected::Image => {
                let source = file.bytes.clone();
                let encoded = tokio::task::spawn_blocking(move || transcode_image(&source))
                    .await
                    .map_err(|e| DomainError::InternalError(e.to_string()))??;
                (encoded, "jpg")
            }
        };

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| DomainError::StorageError(e.to_string()))?;
        let name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(self.upload_dir.join(&name), &bytes)
            .await
            .map_err(|e| DomainError::StorageError(e.to_string()))?;

        debug!(field = policy.field, file = %name, size = bytes.len(), "attachment stored");
        Ok(format!("{}/{}", self.public_path, name))
    }

    async fn remove(&self, path: &str) -> Result<(), DomainError> {
        let name = path
            .strip_prefix(self.public_path.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && !name.starts_with('.'))
            .ok_or_else(|| DomainError::StorageError(format!("Bukan path unggahan: {}", path)))?;

        match tokio::fs::remove_file(self.upload_dir.join(name)).await {
            Ok(()) => {
                debug!(file = %name, "attachment removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::StorageError(e.to_string())),
        }
    }
}
