//! Collection Module
//!
//! The document collection engine the content store sits beside.
//!
//! ## Responsibilities
//! - Assign document IDs on insert
//! - Keep the authoritative JSON record of every document
//! - Page through documents and estimate counts
//!
//! The rest of the crate only talks to it through [`CollectionEngine`] and
//! [`DocumentCollection`]; [`Database`] is the bundled implementation
//! (in-memory maps made durable by one append-only log per collection).

mod database;
pub mod log;
mod table;

use std::sync::Arc;

use crate::error::Result;
use crate::DocumentId;

pub use database::Database;
pub use log::{DocLog, LogRecord, RecoveryStats};
pub use table::Collection;

/// A JSON document: always a top-level object
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Operations on one collection
pub trait DocumentCollection: Send + Sync {
    /// Store a new document and return its assigned ID
    fn insert(&self, doc: &Document) -> Result<DocumentId>;

    /// Read a document; `None` if there is no such ID
    fn read(&self, id: DocumentId) -> Result<Option<Document>>;

    /// Replace a document (`DocumentNotFound` if absent)
    fn update(&self, id: DocumentId, doc: &Document) -> Result<()>;

    /// Remove a document (`DocumentNotFound` if absent)
    fn delete(&self, id: DocumentId) -> Result<()>;

    /// Visit the documents of page `page` out of `total_pages`
    ///
    /// The visitor receives the ID and raw JSON bytes and returns whether to
    /// continue.
    fn for_each_doc_in_page(
        &self,
        page: u64,
        total_pages: u64,
        visitor: &mut dyn FnMut(DocumentId, &[u8]) -> bool,
    ) -> Result<()>;

    /// Cardinality estimate
    fn approx_doc_count(&self) -> u64;
}

/// Resolves and manages named collections
pub trait CollectionEngine: Send + Sync {
    type Collection: DocumentCollection;

    /// Look up a collection by name
    fn use_collection(&self, name: &str) -> Option<Arc<Self::Collection>>;

    /// Create an empty collection
    fn create_collection(&self, name: &str) -> Result<()>;

    /// Remove a collection and all its documents
    fn drop_collection(&self, name: &str) -> Result<()>;

    /// Names of all collections, sorted
    fn collection_names(&self) -> Vec<String>;

    /// Make every acknowledged write durable
    fn sync_all(&self) -> Result<()> {
        Ok(())
    }
}
