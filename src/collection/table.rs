//! Collection implementation
//!
//! BTreeMap of JSON bytes behind an RwLock, made durable by a [`DocLog`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::SyncPolicy;
use crate::error::{Result, VaultError};
use crate::DocumentId;

use super::log::{DocLog, LogRecord};
use super::{Document, DocumentCollection};

/// A named set of JSON documents
///
/// ## Concurrency
/// - Reads share `docs` through the read lock
/// - Writes hold the write lock while logging, so log order matches
///   map order
///
/// ## Compaction
/// Once the log holds `compact_after` records and at least twice as many
/// records as live documents, the next write rewrites it in place. The
/// check also runs on open. A threshold of 0 leaves compaction to
/// [`Collection::compact`].
pub struct Collection {
    name: String,

    /// Live documents as serialized JSON, ordered by ID
    docs: RwLock<BTreeMap<DocumentId, Vec<u8>>>,

    /// Next ID handed out by insert
    next_id: AtomicU64,

    /// None for in-memory collections
    log: Option<Mutex<DocLog>>,

    compact_after: u64,
}

impl Collection {
    /// Create an empty collection that lives only in memory
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            log: None,
            compact_after: 0,
        }
    }

    /// Open a collection backed by the log at `path`, replaying it
    pub fn open(
        name: impl Into<String>,
        path: &Path,
        policy: SyncPolicy,
        compact_after: u64,
    ) -> Result<Self> {
        let name = name.into();
        let (log, records, stats) = DocLog::open(path, policy)?;

        let mut docs = BTreeMap::new();
        let mut max_id: DocumentId = 0;
        for record in records {
            max_id = max_id.max(record.id());
            match record {
                LogRecord::Insert { id, doc } | LogRecord::Update { id, doc } => {
                    docs.insert(id, doc);
                }
                LogRecord::Delete { id } => {
                    docs.remove(&id);
                }
            }
        }

        if stats.records_recovered > 0 || stats.was_truncated {
            tracing::info!(
                collection = %name,
                records = stats.records_recovered,
                documents = docs.len(),
                truncated = stats.was_truncated,
                "collection: replayed log"
            );
        }

        let collection = Self {
            name,
            docs: RwLock::new(docs),
            next_id: AtomicU64::new(max_id + 1),
            log: Some(Mutex::new(log)),
            compact_after,
        };
        collection.maybe_compact(&collection.docs.read());
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_durable(&self) -> bool {
        self.log.is_some()
    }

    /// Rewrite the log so it holds one insert per live document
    pub fn compact(&self) -> Result<()> {
        let Some(log) = &self.log else {
            return Ok(());
        };

        let docs = self.docs.write();
        let mut log = log.lock();
        self.rewrite_log(&mut log, &docs)
    }

    /// Records currently in the log (0 for in-memory collections)
    pub fn log_records(&self) -> u64 {
        self.log.as_ref().map_or(0, |log| log.lock().record_count())
    }

    /// Flush and fsync the log
    pub fn sync(&self) -> Result<()> {
        if let Some(log) = &self.log {
            log.lock().sync()?;
        }
        Ok(())
    }

    fn append(&self, record: &LogRecord) -> Result<()> {
        if let Some(log) = &self.log {
            log.lock().append(record)?;
        }
        Ok(())
    }

    /// Compact if the log has outgrown its live documents
    ///
    /// Called with the docs lock held. The write that triggered this is
    /// already durable, so a failed rewrite is logged and not returned.
    fn maybe_compact(&self, docs: &BTreeMap<DocumentId, Vec<u8>>) {
        let Some(log) = &self.log else {
            return;
        };
        if self.compact_after == 0 {
            return;
        }

        let mut log = log.lock();
        let records = log.record_count();
        if records < self.compact_after || records < 2 * docs.len() as u64 {
            return;
        }

        if let Err(e) = self.rewrite_log(&mut log, docs) {
            tracing::warn!(
                collection = %self.name,
                records,
                error = %e,
                "collection: automatic compaction failed"
            );
        }
    }

    fn rewrite_log(&self, log: &mut DocLog, docs: &BTreeMap<DocumentId, Vec<u8>>) -> Result<()> {
        let before = log.record_count();
        let mut records: Vec<LogRecord> = docs
            .iter()
            .map(|(id, doc)| LogRecord::Insert {
                id: *id,
                doc: doc.clone(),
            })
            .collect();

        // A bare trailing Delete keeps next_id from moving backwards on reopen
        let last_issued = self.next_id.load(Ordering::SeqCst).saturating_sub(1);
        if last_issued > 0 && !docs.contains_key(&last_issued) {
            records.push(LogRecord::Delete { id: last_issued });
        }

        log.rewrite(&records)?;
        tracing::debug!(
            collection = %self.name,
            before,
            after = records.len(),
            "collection: compacted log"
        );
        Ok(())
    }
}

impl DocumentCollection for Collection {
    fn insert(&self, doc: &Document) -> Result<DocumentId> {
        let bytes = serde_json::to_vec(doc)?;

        let mut docs = self.docs.write();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.append(&LogRecord::Insert {
            id,
            doc: bytes.clone(),
        })?;
        docs.insert(id, bytes);
        self.maybe_compact(&docs);
        Ok(id)
    }

    fn read(&self, id: DocumentId) -> Result<Option<Document>> {
        let docs = self.docs.read();
        match docs.get(&id) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    fn update(&self, id: DocumentId, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;

        let mut docs = self.docs.write();
        if !docs.contains_key(&id) {
            return Err(VaultError::DocumentNotFound(id));
        }
        self.append(&LogRecord::Update {
            id,
            doc: bytes.clone(),
        })?;
        docs.insert(id, bytes);
        self.maybe_compact(&docs);
        Ok(())
    }

    fn delete(&self, id: DocumentId) -> Result<()> {
        let mut docs = self.docs.write();
        if !docs.contains_key(&id) {
            return Err(VaultError::DocumentNotFound(id));
        }
        self.append(&LogRecord::Delete { id })?;
        docs.remove(&id);
        self.maybe_compact(&docs);
        Ok(())
    }

    fn for_each_doc_in_page(
        &self,
        page: u64,
        total_pages: u64,
        visitor: &mut dyn FnMut(DocumentId, &[u8]) -> bool,
    ) -> Result<()> {
        if total_pages < 1 {
            return Err(VaultError::InvalidArgument(format!(
                "Invalid total page number '{}'",
                total_pages
            )));
        }
        if page >= total_pages {
            return Err(VaultError::InvalidArgument(format!(
                "Invalid page number '{}'",
                page
            )));
        }

        let docs = self.docs.read();
        let per_page = (docs.len() as u64).div_ceil(total_pages);
        let skip = (page * per_page) as usize;

        for (id, bytes) in docs.iter().skip(skip).take(per_page as usize) {
            if !visitor(*id, bytes) {
                break;
            }
        }
        Ok(())
    }

    fn approx_doc_count(&self) -> u64 {
        self.docs.read().len() as u64
    }
}
