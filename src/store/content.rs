//! Content Store
//!
//! Saves, reads and deletes per-document artifacts under their shard paths.
//!
//! ## Concurrency
//! - No locks and no in-process state beyond the immutable root path
//! - Every call goes straight to the filesystem
//! - A purge followed by a save for the same document is not atomic; a
//!   concurrent reader may see the file missing in between

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::config::StoreConfig;
use crate::error::{Result, VaultError};
use crate::DocumentId;

use super::path::validate_collection_name;
use super::{ArtifactKind, DocumentArtifactSet};

/// Filesystem-backed store of document artifacts
#[derive(Debug, Clone)]
pub struct ContentStore {
    config: StoreConfig,
}

impl ContentStore {
    /// Create a store over `config.root`
    ///
    /// The root itself is created lazily by the first save.
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Root directory all paths are resolved against
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Artifact paths of one document
    pub fn artifacts(&self, id: DocumentId, collection: &str) -> DocumentArtifactSet {
        DocumentArtifactSet::new(&self.config.root, id, collection)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `bytes` to the artifact, creating the shard directory if needed
    ///
    /// An existing file is truncated.
    pub fn save_artifact(
        &self,
        id: DocumentId,
        collection: &str,
        kind: &ArtifactKind,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let (path, mut file) = self.create_artifact(id, collection, kind)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(
            collection,
            id,
            path = %path.display(),
            size = bytes.len(),
            "content_store: saved artifact"
        );
        Ok(path)
    }

    /// Stream an artifact from `reader`; returns the number of bytes written
    pub fn save_artifact_from<R: Read>(
        &self,
        id: DocumentId,
        collection: &str,
        kind: &ArtifactKind,
        reader: &mut R,
    ) -> Result<u64> {
        let (path, mut file) = self.create_artifact(id, collection, kind)?;
        let written = io::copy(reader, &mut file)?;
        file.flush()?;

        tracing::debug!(
            collection,
            id,
            path = %path.display(),
            size = written,
            "content_store: streamed artifact"
        );
        Ok(written)
    }

    fn create_artifact(
        &self,
        id: DocumentId,
        collection: &str,
        kind: &ArtifactKind,
    ) -> Result<(PathBuf, File)> {
        validate_collection_name(collection)?;
        let set = self.artifacts(id, collection);
        create_shard_dir(set.directory())?;

        let path = set.path(kind);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "content_store: create failed");
                e
            })?;
        Ok((path, file))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read the whole artifact
    ///
    /// Returns `ArtifactNotFound` if the file does not exist.
    pub fn read_artifact(
        &self,
        id: DocumentId,
        collection: &str,
        kind: &ArtifactKind,
    ) -> Result<Vec<u8>> {
        let (mut file, len) = self.open_artifact(id, collection, kind)?;
        let mut buf = Vec::with_capacity(len as usize);
        file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Open the artifact for streaming; returns the handle and its length
    pub fn open_artifact(
        &self,
        id: DocumentId,
        collection: &str,
        kind: &ArtifactKind,
    ) -> Result<(File, u64)> {
        validate_collection_name(collection)?;
        let path = self.artifacts(id, collection).path(kind);
        let not_found = || VaultError::ArtifactNotFound {
            collection: collection.to_string(),
            id,
            artifact: kind.extension().trim_start_matches('.').to_string(),
        };

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(not_found());
        }
        Ok((file, metadata.len()))
    }

    /// Whether the artifact exists as a regular file
    ///
    /// False for collection names that are not a single directory name.
    pub fn artifact_exists(&self, id: DocumentId, collection: &str, kind: &ArtifactKind) -> bool {
        if validate_collection_name(collection).is_err() {
            return false;
        }
        self.artifacts(id, collection).path(kind).is_file()
    }

    /// Every file currently stored for the document, sorted by path
    pub fn list_artifacts(&self, id: DocumentId, collection: &str) -> Result<Vec<PathBuf>> {
        validate_collection_name(collection)?;
        let set = self.artifacts(id, collection);
        let mut paths = owned_files(&set)?;
        paths.sort();
        Ok(paths)
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    /// Remove every artifact of the document, whatever its extension
    ///
    /// Returns how many files were removed. A missing shard directory means
    /// there is nothing to delete.
    pub fn delete_all_artifacts(&self, id: DocumentId, collection: &str) -> Result<usize> {
        validate_collection_name(collection)?;
        let set = self.artifacts(id, collection);

        let mut removed = 0;
        for path in owned_files(&set)? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                // Raced with another delete of the same document
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "content_store: remove failed");
                    return Err(e.into());
                }
            }
        }

        tracing::debug!(collection, id, removed, "content_store: purged artifacts");
        Ok(removed)
    }

    /// Remove the whole directory tree of a collection
    pub fn drop_collection(&self, collection: &str) -> Result<()> {
        validate_collection_name(collection)?;
        let dir = self.config.root.join(collection);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(collection, dir = %dir.display(), "content_store: dropped collection");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Files in the shard directory that belong to `set`
fn owned_files(set: &DocumentArtifactSet) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(set.directory()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if set.owns_file_name(name) && entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    Ok(paths)
}

/// Create the shard directory recursively with permissive mode
fn create_shard_dir(dir: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o777);
    }

    builder.create(dir).map_err(|e| {
        tracing::warn!(dir = %dir.display(), error = %e, "content_store: create_dir_all failed");
        e.into()
    })
}
