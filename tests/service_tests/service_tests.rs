//! Tests for DocumentService
//!
//! These tests verify:
//! - Insert writes the body, attachment, metadata and preview
//! - Update purges every previous artifact
//! - Delete removes artifacts, including orphans of missing documents
//! - Input validation happens before the engine is touched
//! - Failures after the engine commits are reported, not rolled back

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{jpeg_dimensions, make_jpeg, make_jpeg_of_size};
use serde_json::json;
use shardvault::collection::{CollectionEngine, Database};
use shardvault::config::{Config, StoreConfig};
use shardvault::store::{ArtifactKind, AttachmentMeta};
use shardvault::{
    ContentStore, DocumentService, ErrorClass, ThumbnailGenerator, Upload, VaultError,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_service() -> (TempDir, DocumentService<Database>) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::in_memory();
    db.create_collection("notes").unwrap();
    let store = ContentStore::new(StoreConfig::new(temp_dir.path()));
    let service = DocumentService::new(Arc::new(db), store, ThumbnailGenerator::default());
    (temp_dir, service)
}

fn jpeg_upload() -> Upload {
    Upload::new("photo.jpg", "image/jpeg", make_jpeg_of_size(160, 120, 16 * 1024))
}

// =============================================================================
// Insert Tests
// =============================================================================

#[test]
fn test_insert_plain_document() {
    let (temp, service) = setup_temp_service();

    let mutation = service.insert("notes", r#"{"title":"hi"}"#, None).unwrap();

    assert!(mutation.is_consistent());
    assert_eq!(mutation.id, 1);
    assert!(temp.path().join("notes/00/00/0001.json").is_file());
    assert_eq!(
        service.store().list_artifacts(mutation.id, "notes").unwrap().len(),
        1
    );
}

#[test]
fn test_insert_stores_body_verbatim() {
    let (_temp, service) = setup_temp_service();
    let body = "{ \"spaced\" : [1, 2,3] }";

    let id = service.insert("notes", body, None).unwrap().id;

    let fetched = service.fetch("notes", id, "json").unwrap();
    assert_eq!(fetched.bytes, body.as_bytes());
    assert_eq!(fetched.content_type, "application/json");
    assert_eq!(
        service.get("notes", id).unwrap(),
        json!({"spaced": [1, 2, 3]}).as_object().unwrap().clone()
    );
}

#[test]
fn test_insert_with_jpeg_writes_four_artifacts() {
    let (_temp, service) = setup_temp_service();
    let upload = jpeg_upload();
    let original = upload.data.clone();

    let mutation = service.insert("notes", r#"{"kind":"photo"}"#, Some(upload)).unwrap();
    assert!(mutation.is_consistent());
    let id = mutation.id;

    let attachment = service.fetch("notes", id, "jpg").unwrap();
    assert_eq!(attachment.bytes, original.as_ref());
    assert_eq!(attachment.content_type, "image/jpeg");

    let meta = service.fetch("notes", id, "meta").unwrap();
    let meta: AttachmentMeta = serde_json::from_slice(&meta.bytes).unwrap();
    assert_eq!(
        meta,
        AttachmentMeta {
            id,
            filename: "photo.jpg".to_string(),
            size: 16 * 1024,
            filetype: "image/jpeg".to_string(),
        }
    );

    let preview = service.fetch("notes", id, "preview.jpg").unwrap();
    assert_eq!(preview.content_type, "image/jpeg");
    assert_eq!(jpeg_dimensions(&preview.bytes), (150, 113));

    assert_eq!(service.store().list_artifacts(id, "notes").unwrap().len(), 4);
}

#[test]
fn test_non_jpeg_upload_has_no_preview() {
    let (_temp, service) = setup_temp_service();
    let upload = Upload::new("report.pdf", "application/pdf", b"%PDF-1.4 ...".to_vec());

    let id = service.insert("notes", "{}", Some(upload)).unwrap().id;

    assert_eq!(service.fetch("notes", id, "pdf").unwrap().bytes, b"%PDF-1.4 ...");
    assert!(service.fetch("notes", id, "meta").is_ok());
    assert!(service.fetch("notes", id, "preview.jpg").unwrap_err().is_not_found());
}

#[test]
fn test_jpeg_bytes_with_other_content_type_have_no_preview() {
    let (_temp, service) = setup_temp_service();
    let upload = Upload::new("photo.jpg", "application/octet-stream", make_jpeg(64, 64));

    let id = service.insert("notes", "{}", Some(upload)).unwrap().id;

    assert!(service.fetch("notes", id, "jpg").is_ok());
    assert!(service.fetch("notes", id, "preview.jpg").is_err());
}

#[test]
fn test_extensionless_upload_stored_as_bin() {
    let (temp, service) = setup_temp_service();
    let upload = Upload::new("Makefile", "text/plain", b"all:".to_vec());

    let id = service.insert("notes", "{}", Some(upload)).unwrap().id;

    assert!(temp.path().join("notes/00/00/0001.bin").is_file());
    assert_eq!(service.fetch("notes", id, "bin").unwrap().bytes, b"all:");
}

#[test]
fn test_bad_jpeg_reported_after_commit() {
    let (_temp, service) = setup_temp_service();
    let upload = Upload::new("broken.jpg", "image/jpeg", b"not really a jpeg".to_vec());

    let mutation = service.insert("notes", r#"{"a":1}"#, Some(upload)).unwrap();

    assert!(matches!(mutation.artifact_error, Some(VaultError::Image(_))));
    // The engine keeps the document and the earlier artifacts stay
    assert!(service.get("notes", mutation.id).is_ok());
    assert!(service.fetch("notes", mutation.id, "json").is_ok());
    assert!(service.fetch("notes", mutation.id, "jpg").is_ok());
    assert!(service.fetch("notes", mutation.id, "meta").is_ok());
    assert!(service.fetch("notes", mutation.id, "preview.jpg").is_err());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_invalid_json_rejected_before_insert() {
    let (_temp, service) = setup_temp_service();

    for body in ["not json", "[1,2,3]", "42", ""] {
        let err = service.insert("notes", body, None).unwrap_err();
        assert!(matches!(err, VaultError::InvalidDocument(_)));
        assert_eq!(err.class(), ErrorClass::Client);
    }
    assert_eq!(service.approx_doc_count("notes").unwrap(), 0);
}

#[test]
fn test_reserved_extension_rejected_before_insert() {
    let (_temp, service) = setup_temp_service();

    for name in ["evil.json", "evil.meta"] {
        let upload = Upload::new(name, "text/plain", b"{}".to_vec());
        let err = service.insert("notes", "{}", Some(upload)).unwrap_err();
        assert!(matches!(err, VaultError::InvalidArgument(_)));
    }
    assert_eq!(service.approx_doc_count("notes").unwrap(), 0);
}

#[test]
fn test_unknown_collection() {
    let (_temp, service) = setup_temp_service();

    let err = service.insert("missing", "{}", None).unwrap_err();
    assert!(matches!(err, VaultError::CollectionNotFound(_)));
    assert_eq!(err.class(), ErrorClass::Client);

    assert!(service.get("missing", 1).is_err());
    assert!(service.approx_doc_count("missing").is_err());
}

#[test]
fn test_unsafe_collection_name() {
    let (_temp, service) = setup_temp_service();

    let err = service.fetch("../notes", 1, "json").unwrap_err();

    assert!(matches!(err, VaultError::InvalidArgument(_)));
}

// =============================================================================
// Update Tests
// =============================================================================

#[test]
fn test_update_purges_all_artifacts() {
    let (_temp, service) = setup_temp_service();
    let id = service
        .insert("notes", r#"{"v":1}"#, Some(jpeg_upload()))
        .unwrap()
        .id;
    assert_eq!(service.store().list_artifacts(id, "notes").unwrap().len(), 4);

    let mutation = service.update("notes", id, r#"{"v":2}"#).unwrap();
    assert!(mutation.is_consistent());

    assert_eq!(service.fetch("notes", id, "json").unwrap().bytes, br#"{"v":2}"#);
    for selector in ["jpg", "meta", "preview.jpg"] {
        assert!(service.fetch("notes", id, selector).unwrap_err().is_not_found());
    }
    assert_eq!(service.store().list_artifacts(id, "notes").unwrap().len(), 1);
    assert_eq!(
        service.get("notes", id).unwrap(),
        json!({"v": 2}).as_object().unwrap().clone()
    );
}

#[test]
fn test_update_missing_document() {
    let (_temp, service) = setup_temp_service();

    let err = service.update("notes", 99, "{}").unwrap_err();

    assert!(matches!(err, VaultError::DocumentNotFound(99)));
    assert!(service.fetch("notes", 99, "json").is_err());
}

#[test]
fn test_update_invalid_json_leaves_artifacts() {
    let (_temp, service) = setup_temp_service();
    let id = service.insert("notes", r#"{"v":1}"#, None).unwrap().id;

    assert!(service.update("notes", id, "{broken").is_err());

    assert_eq!(service.fetch("notes", id, "json").unwrap().bytes, br#"{"v":1}"#);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_removes_everything() {
    let (_temp, service) = setup_temp_service();
    let id = service.insert("notes", "{}", Some(jpeg_upload())).unwrap().id;

    let mutation = service.delete("notes", id).unwrap();

    assert!(mutation.is_consistent());
    for selector in ["json", "jpg", "meta", "preview.jpg"] {
        let err = service.fetch("notes", id, selector).unwrap_err();
        assert!(matches!(err, VaultError::ArtifactNotFound { .. }));
    }
    assert!(matches!(
        service.get("notes", id).unwrap_err(),
        VaultError::DocumentNotFound(_)
    ));
}

#[test]
fn test_delete_missing_document_cleans_orphans() {
    let (_temp, service) = setup_temp_service();
    service
        .store()
        .save_artifact(77, "notes", &ArtifactKind::Body, b"{}")
        .unwrap();

    let err = service.delete("notes", 77).unwrap_err();

    assert!(matches!(err, VaultError::DocumentNotFound(77)));
    assert_eq!(err.class(), ErrorClass::NotFound);
    assert!(!service
        .store()
        .artifact_exists(77, "notes", &ArtifactKind::Body));
}

#[test]
fn test_delete_missing_document_survives_failed_cleanup() {
    let (temp, service) = setup_temp_service();
    // A file where the 00/00 shard directory should be makes the purge fail
    std::fs::create_dir_all(temp.path().join("notes/00")).unwrap();
    std::fs::write(temp.path().join("notes/00/00"), b"not a directory").unwrap();
    assert!(service.store().delete_all_artifacts(77, "notes").is_err());

    let err = service.delete("notes", 77).unwrap_err();

    assert!(matches!(err, VaultError::DocumentNotFound(77)));
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn test_missing_artifact_message_names_document() {
    let (temp, service) = setup_temp_service();
    let id = service.insert("notes", "{}", None).unwrap().id;

    let err = service.fetch("notes", id, "preview.jpg").unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("No 'preview.jpg' artifact for document {} in collection 'notes'", id)
    );
    assert!(!err.to_string().contains(temp.path().to_str().unwrap()));
}

#[test]
fn test_delete_leaves_neighbours() {
    let (_temp, service) = setup_temp_service();
    let a = service.insert("notes", r#"{"a":1}"#, None).unwrap().id;
    let b = service.insert("notes", r#"{"b":1}"#, None).unwrap().id;

    service.delete("notes", a).unwrap();

    assert!(service.fetch("notes", b, "json").is_ok());
    assert_eq!(service.approx_doc_count("notes").unwrap(), 1);
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_get_page_keys_by_id() {
    let (_temp, service) = setup_temp_service();
    for i in 0..4 {
        service.insert("notes", &json!({ "i": i }).to_string(), None).unwrap();
    }

    let page = service.get_page("notes", 1, 2).unwrap();

    assert_eq!(
        serde_json::Value::Object(page),
        json!({"3": {"i": 2}, "4": {"i": 3}})
    );
}

#[test]
fn test_get_page_invalid_arguments() {
    let (_temp, service) = setup_temp_service();

    assert!(matches!(
        service.get_page("notes", 0, 0).unwrap_err(),
        VaultError::InvalidArgument(_)
    ));
    assert!(matches!(
        service.get_page("notes", 5, 2).unwrap_err(),
        VaultError::InvalidArgument(_)
    ));
}

#[test]
fn test_fetch_unknown_selector_is_not_found() {
    let (_temp, service) = setup_temp_service();
    let id = service.insert("notes", "{}", None).unwrap().id;

    assert!(service.fetch("notes", id, "png").unwrap_err().is_not_found());
}

// =============================================================================
// Collection Tests
// =============================================================================

#[test]
fn test_drop_collection_removes_artifacts() {
    let (temp, service) = setup_temp_service();
    service.insert("notes", "{}", Some(jpeg_upload())).unwrap();
    assert!(temp.path().join("notes").is_dir());

    service.drop_collection("notes").unwrap();

    assert!(!temp.path().join("notes").exists());
    assert!(service.collection_names().is_empty());
}

#[test]
fn test_create_collection_then_insert() {
    let (_temp, service) = setup_temp_service();

    service.create_collection("photos").unwrap();
    let id = service.insert("photos", "{}", None).unwrap().id;

    assert_eq!(id, 1);
    assert_eq!(service.collection_names(), vec!["notes", "photos"]);
}

#[test]
fn test_open_applies_compaction_threshold() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path().join("data"))
        .store_dir(temp.path().join("contentstore"))
        .compact_after_records(20)
        .build();
    let service = DocumentService::<Database>::open(&config).unwrap();
    service.create_collection("notes").unwrap();
    let id = service.insert("notes", r#"{"v":0}"#, None).unwrap().id;

    for v in 1..=200 {
        service.update("notes", id, &format!(r#"{{"v":{}}}"#, v)).unwrap();
    }

    let notes = service.engine().use_collection("notes").unwrap();
    assert!(notes.log_records() <= 20);
    assert_eq!(service.get("notes", id).unwrap().get("v"), Some(&json!(200)));
}
