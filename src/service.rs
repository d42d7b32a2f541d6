//! Service Module
//!
//! Runs each document mutation against the collection engine first, then
//! brings the side files in the content store in line with it.
//!
//! ## Lifecycle
//! ```text
//! insert:  engine.insert → save .json → [save .<ext>, save .meta, [save .preview.jpg]]
//! update:  engine.update → purge all artifacts → save .json
//! delete:  engine.delete → purge all artifacts
//! ```
//!
//! ## Failure Policy
//! The engine result is authoritative. Once it has committed, content-store
//! failures are logged and reported in [`Mutation::artifact_error`] but the
//! engine mutation is never rolled back.

use std::sync::Arc;

use serde_json::Value;

use crate::collection::{CollectionEngine, Database, Document, DocumentCollection};
use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::preview::ThumbnailGenerator;
use crate::store::path::validate_collection_name;
use crate::store::{ArtifactKind, ContentStore, Upload};
use crate::DocumentId;

/// Outcome of a committed mutation
#[derive(Debug)]
pub struct Mutation {
    /// Document the mutation applied to
    pub id: DocumentId,

    /// First content-store failure after the engine committed, if any
    pub artifact_error: Option<VaultError>,
}

impl Mutation {
    /// True if side files match the engine record
    pub fn is_consistent(&self) -> bool {
        self.artifact_error.is_none()
    }
}

/// An artifact read back for a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Parse a decimal document ID supplied by a client
pub fn parse_document_id(raw: &str) -> Result<DocumentId> {
    raw.trim()
        .parse::<DocumentId>()
        .map_err(|_| VaultError::InvalidDocumentId(raw.to_string()))
}

/// Parse a JSON body that must be an object
pub fn parse_document(body: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(doc)) => Ok(doc),
        _ => Err(VaultError::InvalidDocument(body.to_string())),
    }
}

/// Coordinates the collection engine and the content store
pub struct DocumentService<E: CollectionEngine> {
    engine: Arc<E>,
    store: ContentStore,
    thumbnails: ThumbnailGenerator,
}

impl DocumentService<Database> {
    /// Open the bundled database and content store described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        let engine = Database::open_with_compaction(
            &config.data_dir,
            config.sync_policy,
            config.compact_after_records,
        )?;
        let store = ContentStore::new(config.store_config());
        let thumbnails = ThumbnailGenerator::new(config.preview_width)?;
        Ok(Self::new(Arc::new(engine), store, thumbnails))
    }
}

impl<E: CollectionEngine> DocumentService<E> {
    pub fn new(engine: Arc<E>, store: ContentStore, thumbnails: ThumbnailGenerator) -> Self {
        Self {
            engine,
            store,
            thumbnails,
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a document, with an optional attachment
    ///
    /// Input is fully validated before the engine is touched. The body is
    /// saved before the attachment so a document always has its `.json`
    /// even if attachment persistence fails part way.
    pub fn insert(&self, collection: &str, body: &str, upload: Option<Upload>) -> Result<Mutation> {
        let doc = parse_document(body)?;
        let attachment_kind = upload.as_ref().map(Upload::artifact_kind).transpose()?;
        let col = self.collection(collection)?;

        let id = col.insert(&doc)?;
        tracing::debug!(collection, id, attachment = upload.is_some(), "service: inserted");

        let side_effects = self
            .store
            .save_artifact(id, collection, &ArtifactKind::Body, body.as_bytes())
            .and_then(|_| match (&upload, &attachment_kind) {
                (Some(upload), Some(kind)) => self.save_attachment(id, collection, upload, kind),
                _ => Ok(()),
            });

        Ok(self.committed(id, collection, "insert", side_effects))
    }

    /// Replace a document's JSON
    ///
    /// Every previous artifact (attachment, metadata and preview included) is
    /// purged; only the new body is written back.
    pub fn update(&self, collection: &str, id: DocumentId, body: &str) -> Result<Mutation> {
        let doc = parse_document(body)?;
        let col = self.collection(collection)?;

        col.update(id, &doc)?;
        tracing::debug!(collection, id, "service: updated");

        let side_effects = self
            .store
            .delete_all_artifacts(id, collection)
            .and_then(|_| {
                self.store
                    .save_artifact(id, collection, &ArtifactKind::Body, body.as_bytes())
            })
            .map(|_| ());

        Ok(self.committed(id, collection, "update", side_effects))
    }

    /// Delete a document and all of its artifacts
    ///
    /// Artifacts are purged even when the engine has no such document, so
    /// orphaned side files can be cleaned up; the engine's error is still
    /// returned in that case, even if the purge itself fails.
    pub fn delete(&self, collection: &str, id: DocumentId) -> Result<Mutation> {
        let col = self.collection(collection)?;

        match col.delete(id) {
            Ok(()) => {
                tracing::debug!(collection, id, "service: deleted");
                let side_effects = self.store.delete_all_artifacts(id, collection).map(|_| ());
                Ok(self.committed(id, collection, "delete", side_effects))
            }
            Err(VaultError::DocumentNotFound(missing)) => {
                match self.store.delete_all_artifacts(id, collection) {
                    Ok(0) => {}
                    Ok(removed) => {
                        tracing::info!(collection, id, removed, "service: removed orphaned artifacts");
                    }
                    Err(e) => {
                        tracing::warn!(collection, id, error = %e, "service: orphan cleanup failed");
                    }
                }
                Err(VaultError::DocumentNotFound(missing))
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read a document from the engine
    pub fn get(&self, collection: &str, id: DocumentId) -> Result<Document> {
        self.collection(collection)?
            .read(id)?
            .ok_or(VaultError::DocumentNotFound(id))
    }

    /// Documents of one page, keyed by decimal ID
    ///
    /// Records that fail to parse as JSON objects are skipped.
    pub fn get_page(&self, collection: &str, page: u64, total_pages: u64) -> Result<Document> {
        let col = self.collection(collection)?;

        let mut docs = Document::new();
        col.for_each_doc_in_page(page, total_pages, &mut |id, bytes| {
            if let Ok(Value::Object(doc)) = serde_json::from_slice::<Value>(bytes) {
                docs.insert(id.to_string(), Value::Object(doc));
            }
            true
        })?;
        Ok(docs)
    }

    pub fn approx_doc_count(&self, collection: &str) -> Result<u64> {
        Ok(self.collection(collection)?.approx_doc_count())
    }

    /// Read one artifact by fetch selector (`json`, `meta`, `preview.jpg`, or
    /// the attachment's extension)
    pub fn fetch(&self, collection: &str, id: DocumentId, selector: &str) -> Result<Fetched> {
        validate_collection_name(collection)?;
        let kind = ArtifactKind::from_selector(selector)?;
        let bytes = self.store.read_artifact(id, collection, &kind)?;
        Ok(Fetched {
            content_type: kind.content_type(),
            bytes,
        })
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub fn create_collection(&self, name: &str) -> Result<()> {
        self.engine.create_collection(name)
    }

    /// Drop a collection from the engine and remove its artifact tree
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        self.engine.drop_collection(name)?;
        self.store.drop_collection(name)
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.engine.collection_names()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn collection(&self, name: &str) -> Result<Arc<E::Collection>> {
        validate_collection_name(name)?;
        self.engine
            .use_collection(name)
            .ok_or_else(|| VaultError::CollectionNotFound(name.to_string()))
    }

    fn save_attachment(
        &self,
        id: DocumentId,
        collection: &str,
        upload: &Upload,
        kind: &ArtifactKind,
    ) -> Result<()> {
        let meta = serde_json::to_vec(&upload.meta(id))?;

        self.store.save_artifact(id, collection, kind, &upload.data)?;
        self.store
            .save_artifact(id, collection, &ArtifactKind::Meta, &meta)?;

        if upload.wants_preview() {
            let preview = self.thumbnails.generate_preview(&upload.data)?;
            self.store
                .save_artifact(id, collection, &ArtifactKind::Preview, &preview)?;
        }
        Ok(())
    }

    fn committed(
        &self,
        id: DocumentId,
        collection: &str,
        op: &'static str,
        side_effects: Result<()>,
    ) -> Mutation {
        let artifact_error = side_effects.err();
        if let Some(e) = &artifact_error {
            tracing::error!(
                collection,
                id,
                op,
                error = %e,
                "service: side files out of sync with committed document"
            );
        }
        Mutation { id, artifact_error }
    }
}
