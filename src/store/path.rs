//! Shard path resolution
//!
//! Maps (collection, document ID) to a directory and a file stem.
//!
//! ```text
//! id 1234567, collection "notes"
//!   digits = "1234567"
//!   {root}/notes/12/34/1234567.json
//!
//! id 7 (padded to 4 digits)
//!   digits = "0007"
//!   {root}/notes/00/00/0007.json
//! ```
//!
//! The two shard levels bound any single directory to 100 subdirectories,
//! spreading documents over 100×100 leaves as IDs grow.

use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};
use crate::DocumentId;

use super::ArtifactKind;

/// Minimum width of the decimal ID string used for sharding
pub const MIN_ID_DIGITS: usize = 4;

/// Decimal form of `id`, zero-padded to [`MIN_ID_DIGITS`]
///
/// Used both for the shard levels and for the file stem, so IDs of four or
/// more digits keep their plain decimal names.
pub fn shard_digits(id: DocumentId) -> String {
    format!("{:0width$}", id, width = MIN_ID_DIGITS)
}

/// Directory holding every artifact of `id`: `root/collection/D[0..2]/D[2..4]`
pub fn shard_directory(root: &Path, id: DocumentId, collection: &str) -> PathBuf {
    let digits = shard_digits(id);
    root.join(collection).join(&digits[0..2]).join(&digits[2..4])
}

/// Full path of one artifact file; `extension` carries its leading dot
pub fn artifact_path(root: &Path, id: DocumentId, collection: &str, extension: &str) -> PathBuf {
    let digits = shard_digits(id);
    shard_directory(root, id, collection).join(format!("{}{}", digits, extension))
}

/// Check that a collection name is usable as a single directory name
pub fn validate_collection_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if bad {
        return Err(VaultError::InvalidArgument(format!(
            "Invalid collection name '{}'",
            name
        )));
    }
    Ok(())
}

/// All artifact paths of one document
///
/// The artifacts of a document are only linked by their shared directory and
/// stem; this value is the one place that knows how to derive them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentArtifactSet {
    id: DocumentId,
    collection: String,
    directory: PathBuf,
    stem: String,
}

impl DocumentArtifactSet {
    pub fn new(root: &Path, id: DocumentId, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let directory = shard_directory(root, id, &collection);
        Self {
            id,
            collection,
            directory,
            stem: shard_digits(id),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Shard directory shared by every artifact
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File stem shared by every artifact
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Path of one artifact kind
    pub fn path(&self, kind: &ArtifactKind) -> PathBuf {
        self.path_for_extension(&kind.extension())
    }

    pub fn body(&self) -> PathBuf {
        self.path(&ArtifactKind::Body)
    }

    pub fn meta(&self) -> PathBuf {
        self.path(&ArtifactKind::Meta)
    }

    pub fn preview(&self) -> PathBuf {
        self.path(&ArtifactKind::Preview)
    }

    pub fn path_for_extension(&self, extension: &str) -> PathBuf {
        self.directory.join(format!("{}{}", self.stem, extension))
    }

    /// Whether `file_name` belongs to this document
    ///
    /// Matches the bare stem or `stem.<anything>`. A plain prefix match would
    /// also catch `12345.json` when looking for `1234`, and both live in
    /// shard `12/34`.
    pub fn owns_file_name(&self, file_name: &str) -> bool {
        match file_name.strip_prefix(self.stem.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}
