//! Document save/load facade with collection splitting.
//!
//! # Responsibility
//! - Split the three collection fields into per-entity files on save and
//!   merge them back on load.
//! - Keep the base document free of split-out data once stored.
//!
//! # Invariants
//! - One predicate decides splitting on both paths: all three collection
//!   fields present, with any value.
//! - Save clears the collection fields on the caller's document after the
//!   entity files are written and before the base document is stored.
//! - Load merges each collection independently; one corrupt collection
//!   never blocks the others and is reported as a `LoadIssue`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info, warn};

use crate::kv::{JsonKvStore, KvError, StorageTarget};
use crate::model::document::{Collection, Document, DocumentError};
use crate::repo::artifact_layout;
use crate::repo::collection_store;
use crate::repo::entity_store::{EntityStore, EntityStoreError, FsEntityStore};

pub type StorageResult<T> = Result<T, StorageError>;

/// Error for document save/load use-cases.
#[derive(Debug)]
pub enum StorageError {
    /// Base document storage failure.
    Kv(KvError),
    /// Entity file storage failure.
    Entity(EntityStoreError),
    /// Document shape violates the split collection contract.
    Document(DocumentError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kv(err) => write!(f, "{err}"),
            Self::Entity(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Kv(err) => Some(err),
            Self::Entity(err) => Some(err),
            Self::Document(err) => Some(err),
        }
    }
}

impl From<KvError> for StorageError {
    fn from(value: KvError) -> Self {
        Self::Kv(value)
    }
}

impl From<EntityStoreError> for StorageError {
    fn from(value: EntityStoreError) -> Self {
        Self::Entity(value)
    }
}

impl From<DocumentError> for StorageError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

/// One non-fatal problem encountered while merging collections on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    /// Collection whose merge was skipped.
    pub collection: Collection,
    /// Human-readable failure description.
    pub detail: String,
}

impl Display for LoadIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.collection, self.detail)
    }
}

/// A loaded document together with any merge problems.
///
/// Callers decide whether partially merged data is acceptable; a document
/// with issues still contains every collection that merged cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub document: Document,
    pub issues: Vec<LoadIssue>,
}

impl LoadedDocument {
    /// Whether every collection merged without problems.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct WriteStats {
    split: bool,
    written: [usize; 3],
}

/// Document store facade over the key-value store and an entity store.
///
/// Constructed with a storage root (the data directory used for bare
/// document keys) and, for tests, a substitute entity store.
pub struct DocumentStore<S: EntityStore = FsEntityStore> {
    kv: JsonKvStore,
    entities: S,
}

impl DocumentStore<FsEntityStore> {
    /// Creates a store persisting everything on the real filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_entity_store(root, FsEntityStore::new())
    }
}

impl<S: EntityStore> DocumentStore<S> {
    /// Creates a store with an injected entity store implementation.
    pub fn with_entity_store(root: impl Into<PathBuf>, entities: S) -> Self {
        Self {
            kv: JsonKvStore::new(root),
            entities,
        }
    }

    /// Data directory used for paths without a directory component.
    pub fn root(&self) -> &Path {
        self.kv.root()
    }

    /// Persists `document` under `path`, splitting collections if present.
    ///
    /// When all three collection fields exist, every entity is written to
    /// its own file under `<dir>/<base>.artifacts/` and the fields on
    /// `document` are then set to empty arrays; the caller keeps the
    /// emptied document, matching exactly what was stored. Any failure is
    /// fatal for the save.
    ///
    /// # Side effects
    /// - Entity file writes, base document write, directory creation.
    /// - Emits `document_write` logging events with duration and status.
    pub fn write_document(
        &self,
        document: &mut Document,
        path: &str,
        pretty: bool,
    ) -> StorageResult<()> {
        let started_at = Instant::now();
        info!("event=document_write module=service status=start path={path} pretty={pretty}");

        let outcome = self
            .kv
            .resolve(path)
            .map_err(StorageError::from)
            .and_then(|target| self.split_and_store(document, &target, pretty));

        match outcome {
            Ok(stats) => {
                info!(
                    "event=document_write module=service status=ok split={} routes={} rootchildren={} folders={} duration_ms={}",
                    stats.split,
                    stats.written[0],
                    stats.written[1],
                    stats.written[2],
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=document_write module=service status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    error_code(&err),
                    err
                );
                Err(err)
            }
        }
    }

    /// Loads the document stored under `path`, merging split collections.
    ///
    /// Returns `Ok(None)` when the base document is absent, stored empty,
    /// or unreadable; an unreadable base document is logged but callers
    /// cannot distinguish it from absence. When the split schema is
    /// present, each collection directory is read and appended onto the
    /// document's existing field value; a collection that fails to read is
    /// skipped and reported in `issues` while the others still merge.
    ///
    /// # Side effects
    /// - Emits `document_read` and `collection_merge_failed` logging events.
    pub fn read_document(&self, path: &str) -> StorageResult<Option<LoadedDocument>> {
        let started_at = Instant::now();
        info!("event=document_read module=service status=start path={path}");

        let target = match self.kv.resolve(path) {
            Ok(target) => target,
            Err(err) => {
                let err = StorageError::from(err);
                error!(
                    "event=document_read module=service status=error duration_ms={} error_code={} error={}",
                    started_at.elapsed().as_millis(),
                    error_code(&err),
                    err
                );
                return Err(err);
            }
        };

        let document = match self.kv.get(&target) {
            Ok(Some(document)) => document,
            Ok(None) => {
                info!(
                    "event=document_read module=service status=ok found=false duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                return Ok(None);
            }
            Err(err) => {
                warn!(
                    "event=document_read module=service status=unreadable path={path} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                return Ok(None);
            }
        };

        let mut loaded = LoadedDocument {
            document,
            issues: Vec::new(),
        };
        let split = loaded.document.has_split_collections();
        let mut merged = [0usize; 3];
        if split {
            for (index, collection) in Collection::ALL.into_iter().enumerate() {
                match self.merge_collection(&mut loaded.document, &target, collection) {
                    Ok(count) => merged[index] = count,
                    Err(err) => {
                        warn!(
                            "event=collection_merge_failed module=service status=skipped collection={collection} path={path} error={err}"
                        );
                        loaded.issues.push(LoadIssue {
                            collection,
                            detail: err.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            "event=document_read module=service status=ok found=true split={split} routes={} rootchildren={} folders={} issues={} duration_ms={}",
            merged[0],
            merged[1],
            merged[2],
            loaded.issues.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Some(loaded))
    }

    fn split_and_store(
        &self,
        document: &mut Document,
        target: &StorageTarget,
        pretty: bool,
    ) -> StorageResult<WriteStats> {
        let mut stats = WriteStats {
            split: document.has_split_collections(),
            written: [0; 3],
        };

        if stats.split {
            artifact_layout::ensure_artifacts_layout(
                &self.entities,
                &target.dir,
                &target.base_name,
            )?;

            // Extract and validate every collection before the first entity
            // write, so a malformed field or id aborts the save with no
            // files written.
            let mut extracted = Vec::with_capacity(Collection::ALL.len());
            for collection in Collection::ALL {
                let entities = document.collection_entities(collection)?;
                for entity in &entities {
                    entity.validated_id().map_err(EntityStoreError::from)?;
                }
                extracted.push((collection, entities));
            }

            for (index, (collection, entities)) in extracted.iter().enumerate() {
                stats.written[index] = collection_store::save_collection(
                    &self.entities,
                    &target.dir,
                    &target.base_name,
                    *collection,
                    entities,
                )?;
            }

            for collection in Collection::ALL {
                document.clear_collection(collection);
            }
        }

        self.kv.set(target, document, pretty)?;
        Ok(stats)
    }

    fn merge_collection(
        &self,
        document: &mut Document,
        target: &StorageTarget,
        collection: Collection,
    ) -> StorageResult<usize> {
        let entities = collection_store::load_collection(
            &self.entities,
            &target.dir,
            &target.base_name,
            collection,
        )?;
        Ok(document.append_to_collection(collection, entities)?)
    }
}

fn error_code(err: &StorageError) -> &'static str {
    match err {
        StorageError::Kv(KvError::InvalidKey(_)) => "invalid_path",
        StorageError::Kv(_) => "kv_store_failed",
        StorageError::Entity(_) => "entity_store_failed",
        StorageError::Document(_) => "document_shape_invalid",
    }
}
