//! # shardvault
//!
//! A per-document content store beside a JSON document collection:
//! - Original JSON body of every document kept on disk
//! - Optional binary attachment with metadata
//! - Width-150 JPEG preview for JPEG attachments
//! - Deterministic two-level sharded layout derived from the document ID
//! - Thread-per-connection TCP server and client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  DocumentService                             │
//! │     (engine mutation first, then side-file effects)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐     ┌─────────────┐
//!   │ Collection  │          │ ContentStore │────▶│  Thumbnail  │
//!   │   Engine    │          │  (sharded)   │     │  Generator  │
//!   └─────────────┘          └──────────────┘     └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod preview;
pub mod collection;
pub mod service;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorClass, Result, VaultError};
pub use config::{Config, StoreConfig};
pub use store::{ArtifactKind, ContentStore, DocumentArtifactSet, Upload};
pub use preview::ThumbnailGenerator;
pub use service::{DocumentService, Fetched, Mutation};

/// Numeric key assigned to a document by its collection
pub type DocumentId = u64;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of shardvault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
