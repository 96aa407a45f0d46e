//! Entity file persistence contracts and implementations.
//!
//! # Responsibility
//! - Provide the minimal filesystem capability collection persistence needs.
//! - Map entity ids to file names without any lossy rewriting.
//!
//! # Invariants
//! - `write_entity` refuses entities whose id cannot name a file; ids are
//!   validated, never sanitized, so the file name always equals the id.
//! - `read_all_entities` returns entities in file name order and fails as a
//!   whole on the first unparseable file.

use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::model::document::{Entity, EntityError};
use crate::repo::artifact_layout;

pub type EntityStoreResult<T> = Result<T, EntityStoreError>;

/// Errors from entity file storage operations.
#[derive(Debug)]
pub enum EntityStoreError {
    /// Entity id is missing, not a string, or unusable as a file name.
    Entity(EntityError),
    /// Entity file content is not a valid serialized entity.
    Malformed { path: PathBuf, message: String },
    /// Entity could not be serialized for writing.
    Serialize(String),
    /// Filesystem failure at a concrete path.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl EntityStoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for EntityStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entity(err) => write!(f, "{err}"),
            Self::Malformed { path, message } => {
                write!(f, "malformed entity file `{}`: {message}", path.display())
            }
            Self::Serialize(message) => write!(f, "entity serialization failed: {message}"),
            Self::Io { path, source } => {
                write!(f, "entity storage I/O at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for EntityStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Entity(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Malformed { .. } | Self::Serialize(_) => None,
        }
    }
}

impl From<EntityError> for EntityStoreError {
    fn from(value: EntityError) -> Self {
        Self::Entity(value)
    }
}

/// Storage capability for entity files.
///
/// Collection persistence never touches the filesystem directly; it goes
/// through this trait so callers can substitute an in-memory store.
pub trait EntityStore {
    /// Creates `dir` and any missing parents. Idempotent.
    fn create_dir_tree(&self, dir: &Path) -> EntityStoreResult<()>;

    /// Writes `entity` to `<dir>/<id>.json`, overwriting any previous file
    /// for the same id. Fails if `dir` does not exist.
    fn write_entity(&self, dir: &Path, entity: &Entity) -> EntityStoreResult<()>;

    /// Reads every entity file under `dir`, in file name order. A missing
    /// directory reads as an empty sequence; an unparseable file fails the
    /// whole read.
    fn read_all_entities(&self, dir: &Path) -> EntityStoreResult<Vec<Entity>>;
}

/// Entity store backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEntityStore;

impl FsEntityStore {
    pub fn new() -> Self {
        Self
    }
}

impl EntityStore for FsEntityStore {
    fn create_dir_tree(&self, dir: &Path) -> EntityStoreResult<()> {
        fs::create_dir_all(dir).map_err(|err| EntityStoreError::io(dir, err))
    }

    fn write_entity(&self, dir: &Path, entity: &Entity) -> EntityStoreResult<()> {
        let id = entity.validated_id()?;
        let file = artifact_layout::entity_file(dir, id);
        let payload = serde_json::to_string(entity)
            .map_err(|err| EntityStoreError::Serialize(err.to_string()))?;
        fs::write(&file, payload).map_err(|err| EntityStoreError::io(file, err))
    }

    fn read_all_entities(&self, dir: &Path) -> EntityStoreResult<Vec<Entity>> {
        let reader = match fs::read_dir(dir) {
            Ok(reader) => reader,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(EntityStoreError::io(dir, err)),
        };

        let mut files = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|err| EntityStoreError::io(dir, err))?;
            let file_type = entry
                .file_type()
                .map_err(|err| EntityStoreError::io(entry.path(), err))?;
            if file_type.is_dir() {
                continue;
            }
            files.push(entry.path());
        }
        files.sort();

        let mut entities = Vec::with_capacity(files.len());
        for path in files {
            let raw =
                fs::read_to_string(&path).map_err(|err| EntityStoreError::io(path.clone(), err))?;
            let entity: Entity =
                serde_json::from_str(&raw).map_err(|err| EntityStoreError::Malformed {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
            entities.push(entity);
        }
        Ok(entities)
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, String>,
}

/// Entity store backed by process memory, for tests and dry runs.
///
/// Mirrors filesystem semantics: writes require a created directory and
/// reads of uncreated directories yield an empty sequence.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    state: Mutex<InMemoryState>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether `dir` has been created.
    pub fn dir_exists(&self, dir: &Path) -> bool {
        self.state().dirs.contains(dir)
    }

    /// Number of files currently stored directly under `dir`.
    pub fn file_count(&self, dir: &Path) -> usize {
        self.state()
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .count()
    }

    /// Raw stored payload of one file, if present.
    pub fn raw_file(&self, path: &Path) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    /// Places arbitrary content at `path`, creating the parent directory.
    /// Lets tests stage corrupt or legacy files.
    pub fn put_raw_file(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        let path = path.into();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            record_dir_tree(&mut state.dirs, parent);
        }
        state.files.insert(path, contents.into());
    }
}

impl EntityStore for InMemoryEntityStore {
    fn create_dir_tree(&self, dir: &Path) -> EntityStoreResult<()> {
        record_dir_tree(&mut self.state().dirs, dir);
        Ok(())
    }

    fn write_entity(&self, dir: &Path, entity: &Entity) -> EntityStoreResult<()> {
        let id = entity.validated_id()?;
        let payload = serde_json::to_string(entity)
            .map_err(|err| EntityStoreError::Serialize(err.to_string()))?;
        let mut state = self.state();
        if !state.dirs.contains(dir) {
            return Err(EntityStoreError::io(
                dir,
                io::Error::new(io::ErrorKind::NotFound, "directory not created"),
            ));
        }
        state
            .files
            .insert(artifact_layout::entity_file(dir, id), payload);
        Ok(())
    }

    fn read_all_entities(&self, dir: &Path) -> EntityStoreResult<Vec<Entity>> {
        let state = self.state();
        if !state.dirs.contains(dir) {
            return Ok(Vec::new());
        }
        let mut entities = Vec::new();
        for (path, raw) in state.files.iter() {
            if path.parent() != Some(dir) {
                continue;
            }
            let entity: Entity =
                serde_json::from_str(raw).map_err(|err| EntityStoreError::Malformed {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
            entities.push(entity);
        }
        Ok(entities)
    }
}

fn record_dir_tree(dirs: &mut BTreeSet<PathBuf>, dir: &Path) {
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        dirs.insert(ancestor.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{EntityStore, EntityStoreError, FsEntityStore, InMemoryEntityStore};
    use crate::model::document::Entity;

    fn ids(entities: &[Entity]) -> Vec<String> {
        entities
            .iter()
            .map(|entity| entity.id().expect("entity id").to_string())
            .collect()
    }

    #[test]
    fn fs_write_into_a_missing_directory_propagates_the_failure() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let store = FsEntityStore::new();
        let dir = tmp.path().join("never-created");

        let result = store.write_entity(&dir, &Entity::with_id("e1"));
        assert!(matches!(result, Err(EntityStoreError::Io { .. })));
        // Writing never creates the directory as a side effect.
        assert!(!dir.exists());
    }

    #[test]
    fn fs_read_of_a_missing_directory_is_an_empty_sequence() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let store = FsEntityStore::new();
        let entities = store
            .read_all_entities(&tmp.path().join("never-created"))
            .expect("missing directory reads as empty");
        assert!(entities.is_empty());
    }

    #[test]
    fn fs_reads_come_back_in_file_name_order() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let store = FsEntityStore::new();
        store.create_dir_tree(tmp.path()).expect("create dir");
        for id in ["b", "a", "c"] {
            store
                .write_entity(tmp.path(), &Entity::with_id(id))
                .expect("write entity");
        }

        let entities = store.read_all_entities(tmp.path()).expect("read back");
        assert_eq!(ids(&entities), ["a", "b", "c"]);
    }

    #[test]
    fn in_memory_write_requires_a_created_directory() {
        let store = InMemoryEntityStore::new();
        let dir = Path::new("/mem/routes");

        let result = store.write_entity(dir, &Entity::with_id("e1"));
        assert!(matches!(result, Err(EntityStoreError::Io { .. })));

        store.create_dir_tree(dir).expect("create dir");
        store
            .write_entity(dir, &Entity::with_id("e1"))
            .expect("write after create");
        assert_eq!(store.file_count(dir), 1);
    }

    #[test]
    fn in_memory_reads_are_ordered_and_scoped_to_one_directory() {
        let store = InMemoryEntityStore::new();
        let routes = Path::new("/mem/ws.artifacts/routes");
        let folders = Path::new("/mem/ws.artifacts/folders");
        store.create_dir_tree(routes).expect("create routes");
        store.create_dir_tree(folders).expect("create folders");
        for id in ["b", "a"] {
            store
                .write_entity(routes, &Entity::with_id(id))
                .expect("write route");
        }
        store
            .write_entity(folders, &Entity::with_id("f1"))
            .expect("write folder");

        let entities = store.read_all_entities(routes).expect("read routes");
        assert_eq!(ids(&entities), ["a", "b"]);
    }

    #[test]
    fn in_memory_entity_files_hold_compact_json() {
        let store = InMemoryEntityStore::new();
        let dir = Path::new("/mem/routes");
        store.create_dir_tree(dir).expect("create dir");
        store
            .write_entity(dir, &Entity::with_id("e1"))
            .expect("write entity");

        let raw = store.raw_file(&dir.join("e1.json")).expect("stored file");
        assert_eq!(raw, r#"{"uuid":"e1"}"#);
    }
}
