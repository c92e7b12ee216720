//! Attachment storage port and per-field upload policies

use async_trait::async_trait;
use tracing::warn;

use crate::error::DomainError;

/// Accepted content for an upload field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// JPEG or PNG, re-encoded before storage
    Image,
    /// Images plus PDF
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentPolicy {
    pub field: &'static str,
    pub max_files: usize,
    pub kind: AttachmentKind,
}

pub const AVATAR: AttachmentPolicy = AttachmentPolicy {
    field: "avatar",
    max_files: 1,
    kind: AttachmentKind::Image,
};

pub const TENANT_LOGO: AttachmentPolicy = AttachmentPolicy {
    field: "logo",
    max_files: 1,
    kind: AttachmentKind::Image,
};

pub const PROPERTY_IMAGES: AttachmentPolicy = AttachmentPolicy {
    field: "images",
    max_files: 5,
    kind: AttachmentKind::Image,
};

pub const UNIT_IMAGES: AttachmentPolicy = PROPERTY_IMAGES;

pub const MAINTENANCE_IMAGES: AttachmentPolicy = PROPERTY_IMAGES;

pub const ANNOUNCEMENT_ATTACHMENTS: AttachmentPolicy = AttachmentPolicy {
    field: "attachments",
    max_files: 5,
    kind: AttachmentKind::Document,
};

pub const COMPLAINT_ATTACHMENTS: AttachmentPolicy = AttachmentPolicy {
    field: "attachments",
    max_files: 3,
    kind: AttachmentKind::Document,
};

pub const PAYMENT_ATTACHMENTS: AttachmentPolicy = COMPLAINT_ATTACHMENTS;

/// A file part received from a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl AttachmentPolicy {
    /// Files meant for this policy's field; more than `max_files` is rejected
    pub fn select<'a>(&self, files: &'a [UploadedFile]) -> Result<Vec<&'a UploadedFile>, DomainError> {
        let selected: Vec<&UploadedFile> = files.iter().filter(|f| f.field == self.field).collect();
        if selected.len() > self.max_files {
            return Err(DomainError::Attachment(format!(
                "Maksimal {} file untuk field {}",
                self.max_files, self.field
            )));
        }
        Ok(selected)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Validate, transform and persist one file; returns its public path
    async fn store(&self, file: &UploadedFile, policy: AttachmentPolicy) -> Result<String, DomainError>;

    /// Delete a file previously returned by `store`. Unknown paths are not an error.
    async fn remove(&self, path: &str) -> Result<(), DomainError>;
}

/// Store every file of `policy.field`, in upload order. Either all files
/// are stored or none are: a failure removes the ones already written.
pub async fn store_all(
    storage: &dyn AttachmentStorage,
    files: &[UploadedFile],
    policy: AttachmentPolicy,
) -> Result<Vec<String>, DomainError> {
    let selected = policy.select(files)?;
    let mut paths = Vec::with_capacity(selected.len());
    for file in selected {
        match storage.store(file, policy).await {
            Ok(path) => paths.push(path),
            Err(e) => {
                discard(storage, &paths).await;
                return Err(e);
            }
        }
    }
    Ok(paths)
}

/// Remove stored files whose owning write did not happen
pub async fn discard(storage: &dyn AttachmentStorage, paths: &[String]) {
    for path in paths {
        if let Err(e) = storage.remove(path).await {
            warn!(path = %path, error = %e, "failed to remove orphaned attachment");
        }
    }
}
