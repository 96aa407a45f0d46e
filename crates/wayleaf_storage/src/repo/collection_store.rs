//! Whole-collection persistence over entity files.
//!
//! # Responsibility
//! - Write every entity of one collection into its derived directory.
//! - Read one collection's directory back into an ordered sequence.
//!
//! # Invariants
//! - Writes overwrite per entity id; two entities sharing an id leave one
//!   file holding the later write.
//! - Stale entity files from earlier saves are never deleted here.

use std::path::Path;

use crate::model::document::{Collection, Entity};
use crate::repo::artifact_layout;
use crate::repo::entity_store::{EntityStore, EntityStoreResult};

/// Writes `entities` into the collection's directory, one file per entity.
///
/// The directory must already exist (see `ensure_artifacts_layout`).
/// Returns the number of entity files written.
pub fn save_collection<S: EntityStore>(
    store: &S,
    document_dir: &Path,
    base_name: &str,
    collection: Collection,
    entities: &[Entity],
) -> EntityStoreResult<usize> {
    let dir = artifact_layout::collection_dir(document_dir, base_name, collection);
    for entity in entities {
        store.write_entity(&dir, entity)?;
    }
    Ok(entities.len())
}

/// Reads the collection's directory back into an entity sequence.
///
/// A directory that was never created reads as empty; one unparseable
/// entity file fails the whole collection.
pub fn load_collection<S: EntityStore>(
    store: &S,
    document_dir: &Path,
    base_name: &str,
    collection: Collection,
) -> EntityStoreResult<Vec<Entity>> {
    let dir = artifact_layout::collection_dir(document_dir, base_name, collection);
    store.read_all_entities(&dir)
}
