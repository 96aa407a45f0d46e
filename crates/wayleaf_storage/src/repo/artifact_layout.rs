//! Artifact directory layout derivation.
//!
//! # Responsibility
//! - Derive, from a document's directory and base name, the sidecar tree
//!   that holds its split collections.
//! - Create that tree idempotently before collection writes.
//!
//! # Invariants
//! - Layout is fixed: `<dir>/<base>.artifacts/{routes,rootchildren,folders}`
//!   with one `<id>.json` file per entity.
//! - Derivation never touches the filesystem; creation goes through the
//!   injected store.

use std::path::{Path, PathBuf};

use crate::model::document::Collection;
use crate::repo::entity_store::{EntityStore, EntityStoreResult};

/// Suffix appended to a document base name to form its artifacts directory.
pub const ARTIFACTS_DIR_SUFFIX: &str = ".artifacts";

const ENTITY_FILE_EXTENSION: &str = ".json";

/// Directory holding all split collections of one document.
pub fn artifacts_dir(document_dir: &Path, base_name: &str) -> PathBuf {
    document_dir.join(format!("{base_name}{ARTIFACTS_DIR_SUFFIX}"))
}

/// Directory holding one collection's entity files.
pub fn collection_dir(document_dir: &Path, base_name: &str, collection: Collection) -> PathBuf {
    artifacts_dir(document_dir, base_name).join(collection.dir_name())
}

/// File path of one entity inside a collection directory.
pub fn entity_file(collection_dir: &Path, entity_id: &str) -> PathBuf {
    collection_dir.join(format!("{entity_id}{ENTITY_FILE_EXTENSION}"))
}

/// Creates the artifacts directory and every collection subdirectory.
///
/// Directories for empty collections are still created; readers treat a
/// missing directory as an empty collection, so this only matters for
/// keeping the on-disk shape uniform. Idempotent.
pub fn ensure_artifacts_layout<S: EntityStore>(
    store: &S,
    document_dir: &Path,
    base_name: &str,
) -> EntityStoreResult<()> {
    store.create_dir_tree(&artifacts_dir(document_dir, base_name))?;
    for collection in Collection::ALL {
        store.create_dir_tree(&collection_dir(document_dir, base_name, collection))?;
    }
    Ok(())
}
