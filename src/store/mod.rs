//! Store Module
//!
//! Filesystem side storage for documents.
//!
//! ## Responsibilities
//! - Derive a deterministic sharded path from (collection, document ID)
//! - Save/read artifacts under that path
//! - Delete all artifacts of a document together
//!
//! ## Layout
//! ```text
//! {root}/
//!   └── {collection}/
//!         └── AB/                   first two digits of the padded ID
//!               └── CD/             next two digits
//!                     ├── ABCD….json          JSON body
//!                     ├── ABCD….meta          attachment metadata (JSON)
//!                     ├── ABCD….<ext>         attachment, original extension
//!                     └── ABCD….preview.jpg   JPEG preview
//! ```

mod artifact;
mod content;
pub mod path;

pub use artifact::{
    ArtifactKind, AttachmentMeta, Upload, FALLBACK_ATTACHMENT_EXTENSION, JPEG_CONTENT_TYPE,
    JSON_CONTENT_TYPE, OCTET_STREAM_CONTENT_TYPE,
};
pub use content::ContentStore;
pub use path::{artifact_path, shard_digits, shard_directory, DocumentArtifactSet};
