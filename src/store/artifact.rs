//! Artifact definitions
//!
//! The four kinds of side files kept per document, the metadata written for
//! uploads, and the upload itself.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};
use crate::DocumentId;

/// Content type that triggers preview generation
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Content type served for JSON artifacts
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type served for everything else
pub const OCTET_STREAM_CONTENT_TYPE: &str = "application/octet-stream";

/// Extension given to uploads whose filename has none
pub const FALLBACK_ATTACHMENT_EXTENSION: &str = "bin";

/// One kind of per-document file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Original JSON body (`.json`)
    Body,

    /// Attachment metadata (`.meta`)
    Meta,

    /// JPEG thumbnail (`.preview.jpg`)
    Preview,

    /// Uploaded binary, keyed by its original extension (without the dot)
    Attachment(String),
}

impl ArtifactKind {
    /// File extension including the leading dot
    pub fn extension(&self) -> String {
        match self {
            ArtifactKind::Body => ".json".to_string(),
            ArtifactKind::Meta => ".meta".to_string(),
            ArtifactKind::Preview => ".preview.jpg".to_string(),
            ArtifactKind::Attachment(ext) => format!(".{}", ext),
        }
    }

    /// Parse a fetch selector (`json`, `meta`, `preview.jpg`, or an extension)
    ///
    /// A leading dot is ignored. Selectors that could escape the shard
    /// directory are rejected.
    pub fn from_selector(selector: &str) -> Result<Self> {
        let selector = selector.strip_prefix('.').unwrap_or(selector);
        match selector {
            "json" => Ok(ArtifactKind::Body),
            "meta" => Ok(ArtifactKind::Meta),
            "preview.jpg" => Ok(ArtifactKind::Preview),
            other => {
                validate_extension(other)?;
                Ok(ArtifactKind::Attachment(other.to_string()))
            }
        }
    }

    /// Content type to serve this artifact with
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::Body | ArtifactKind::Meta => JSON_CONTENT_TYPE,
            ArtifactKind::Preview => JPEG_CONTENT_TYPE,
            ArtifactKind::Attachment(ext) if ext == "jpg" || ext == "jpeg" => JPEG_CONTENT_TYPE,
            ArtifactKind::Attachment(_) => OCTET_STREAM_CONTENT_TYPE,
        }
    }
}

fn validate_extension(ext: &str) -> Result<()> {
    if ext.is_empty() || ext.contains(['/', '\\', '\0']) || ext.contains("..") {
        return Err(VaultError::InvalidArgument(format!(
            "Invalid artifact type '{}'",
            ext
        )));
    }
    Ok(())
}

/// Metadata stored next to an attachment
///
/// Field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    pub id: DocumentId,

    /// Filename as uploaded
    pub filename: String,

    /// Size in bytes
    pub size: u64,

    /// Declared content type
    pub filetype: String,
}

/// A binary uploaded together with a document insert
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Artifact kind this upload is stored under
    ///
    /// Keeps the original extension; `.bin` when the filename has none.
    /// Extensions that would overwrite the body or metadata are refused.
    pub fn artifact_kind(&self) -> Result<ArtifactKind> {
        let ext = Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(FALLBACK_ATTACHMENT_EXTENSION);

        validate_extension(ext)?;
        if ext == "json" || ext == "meta" {
            return Err(VaultError::InvalidArgument(format!(
                "Attachment extension '.{}' is reserved",
                ext
            )));
        }
        Ok(ArtifactKind::Attachment(ext.to_string()))
    }

    /// Whether a preview should be generated for this upload
    pub fn wants_preview(&self) -> bool {
        self.content_type == JPEG_CONTENT_TYPE
    }

    pub fn meta(&self, id: DocumentId) -> AttachmentMeta {
        AttachmentMeta {
            id,
            filename: self.filename.clone(),
            size: self.data.len() as u64,
            filetype: self.content_type.clone(),
        }
    }
}
