//! Configuration for shardvault
//!
//! Centralized configuration with sensible defaults. Built once at startup and
//! never mutated afterwards; components receive the slice they need.

use std::path::PathBuf;

/// Main configuration for a shardvault instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the collection engine (one log file per collection)
    pub data_dir: PathBuf,

    /// Root directory of the content store
    /// Internal structure:
    ///   {store_dir}/
    ///     └── {collection}/AB/CD/{id}.json|.meta|.preview.jpg|.<ext>
    pub store_dir: PathBuf,

    /// How often collection logs are fsynced
    pub sync_policy: SyncPolicy,

    /// Log records that trigger an automatic compaction (0 = never)
    pub compact_after_records: u64,

    // -------------------------------------------------------------------------
    // Preview Configuration
    // -------------------------------------------------------------------------
    /// Width in pixels of generated JPEG previews
    pub preview_width: u32,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// Collection log sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// fsync after every record (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced records
    EveryNEntries { count: usize },
}

/// Default automatic compaction threshold, in log records
pub const DEFAULT_COMPACT_AFTER_RECORDS: u64 = 10_000;

/// Default preview width in pixels
pub const DEFAULT_PREVIEW_WIDTH: u32 = 150;

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./shardvault_data"),
            store_dir: PathBuf::from("./shardvault_data/contentstore"),
            sync_policy: SyncPolicy::EveryNEntries { count: 100 },
            compact_after_records: DEFAULT_COMPACT_AFTER_RECORDS,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            listen_addr: "127.0.0.1:8087".to_string(),
            max_connections: 1024,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The part of the config the content store needs
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.store_dir.clone(),
        }
    }
}

/// Immutable content-store settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root directory all shard paths are resolved against
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the collection engine directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the content store root
    pub fn store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_dir = path.into();
        self
    }

    /// Set the collection log sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the automatic compaction threshold (0 disables it)
    pub fn compact_after_records(mut self, records: u64) -> Self {
        self.config.compact_after_records = records;
        self
    }

    /// Set the preview width (pixels)
    pub fn preview_width(mut self, width: u32) -> Self {
        self.config.preview_width = width;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
