//! Database
//!
//! Owns every collection of one instance.
//!
//! On-disk layout:
//! ```text
//! {data_dir}/
//!   ├── notes.log
//!   └── photos.log
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{SyncPolicy, DEFAULT_COMPACT_AFTER_RECORDS};
use crate::error::{Result, VaultError};
use crate::store::path::validate_collection_name;

use super::{Collection, CollectionEngine};

const LOG_EXTENSION: &str = ".log";

/// Registry of named collections
pub struct Database {
    /// None when nothing is persisted
    data_dir: Option<PathBuf>,

    sync_policy: SyncPolicy,

    /// Automatic compaction threshold handed to every collection
    compact_after: u64,

    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Database {
    /// Open a database in `dir`, replaying every `<name>.log` found there
    pub fn open(dir: &Path, sync_policy: SyncPolicy) -> Result<Self> {
        Self::open_with_compaction(dir, sync_policy, DEFAULT_COMPACT_AFTER_RECORDS)
    }

    /// Like [`Database::open`], compacting any log that reaches
    /// `compact_after` records (0 = only on [`Database::compact_all`])
    pub fn open_with_compaction(dir: &Path, sync_policy: SyncPolicy, compact_after: u64) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut collections = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }
            let Some(name) = Self::parse_collection_name(&file_path) else {
                continue;
            };

            let collection = Collection::open(name.clone(), &file_path, sync_policy, compact_after)?;
            collections.insert(name, Arc::new(collection));
        }

        tracing::info!(
            dir = %dir.display(),
            collections = collections.len(),
            "database: opened"
        );

        Ok(Self {
            data_dir: Some(dir.to_path_buf()),
            sync_policy,
            compact_after,
            collections: RwLock::new(collections),
        })
    }

    /// A database that keeps everything in memory
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            sync_policy: SyncPolicy::EveryWrite,
            compact_after: 0,
            collections: RwLock::new(HashMap::new()),
        }
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Compact the log of every collection
    pub fn compact_all(&self) -> Result<()> {
        let collections: Vec<Arc<Collection>> = self.collections.read().values().cloned().collect();
        for collection in collections {
            collection.compact()?;
        }
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn log_path(&self, name: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}{}", name, LOG_EXTENSION)))
    }

    /// "notes.log" → Some("notes")
    fn parse_collection_name(path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        let name = file_name.strip_suffix(LOG_EXTENSION)?;
        validate_collection_name(name).ok()?;
        Some(name.to_string())
    }
}

impl CollectionEngine for Database {
    type Collection = Collection;

    fn use_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    fn create_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;

        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(VaultError::CollectionExists(name.to_string()));
        }

        let collection = match self.log_path(name) {
            Some(path) => Collection::open(name, &path, self.sync_policy, self.compact_after)?,
            None => Collection::in_memory(name),
        };
        collections.insert(name.to_string(), Arc::new(collection));

        tracing::info!(collection = name, "database: created collection");
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> Result<()> {
        let removed = self.collections.write().remove(name);
        if removed.is_none() {
            return Err(VaultError::CollectionNotFound(name.to_string()));
        }

        if let Some(path) = self.log_path(name) {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(collection = name, "database: dropped collection");
        Ok(())
    }

    fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Fsync every collection log
    fn sync_all(&self) -> Result<()> {
        for collection in self.collections.read().values() {
            collection.sync()?;
        }
        Ok(())
    }
}
