//! Document and entity domain model.
//!
//! # Responsibility
//! - Define the workspace document shape and its three split collections.
//! - Provide the entity identity contract used for per-entity file names.
//!
//! # Invariants
//! - Documents and entities are opaque keyed records; core never interprets
//!   any field except the entity `uuid`.
//! - Entity file names are derived solely from `uuid`; ids must therefore be
//!   non-empty and free of path separators.
//! - Collection fields, when present, hold ordered arrays of entity records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// JSON field holding the stable entity identifier.
pub const ENTITY_ID_FIELD: &str = "uuid";

/// The three workspace collections eligible for per-entity file splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Saved navigation routes.
    Routes,
    /// Top-level workspace tree children.
    RootChildren,
    /// Workspace folders.
    Folders,
}

impl Collection {
    /// All collections, in the fixed processing order used by save and load.
    pub const ALL: [Collection; 3] = [Self::Routes, Self::RootChildren, Self::Folders];

    /// JSON field name on the document (external schema naming).
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Routes => "routes",
            Self::RootChildren => "rootChildren",
            Self::Folders => "folders",
        }
    }

    /// Directory segment under the `<base>.artifacts` parent.
    ///
    /// Lowercase on disk regardless of the JSON field casing; this layout is
    /// load-bearing for compatibility and must not change.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Routes => "routes",
            Self::RootChildren => "rootchildren",
            Self::Folders => "folders",
        }
    }
}

impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Entity identity errors raised before any file name is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    /// The mandatory `uuid` field is absent.
    MissingId,
    /// The `uuid` field exists but is not a JSON string.
    NonStringId {
        /// JSON type actually found.
        found: &'static str,
    },
    /// The id cannot be used as a file name.
    InvalidId(String),
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "entity has no `{ENTITY_ID_FIELD}` field"),
            Self::NonStringId { found } => {
                write!(f, "entity `{ENTITY_ID_FIELD}` must be a string, got {found}")
            }
            Self::InvalidId(id) => write!(f, "entity id `{id}` is not a valid file name"),
        }
    }
}

impl Error for EntityError {}

/// Document shape errors raised when a split collection field is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// A collection field holds something other than an array.
    CollectionNotArray {
        collection: Collection,
        found: &'static str,
    },
    /// A collection array element is not a keyed record.
    EntityNotObject {
        collection: Collection,
        found: &'static str,
    },
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CollectionNotArray { collection, found } => write!(
                f,
                "collection field `{}` must be an array, got {found}",
                collection.field_name()
            ),
            Self::EntityNotObject { collection, found } => write!(
                f,
                "collection `{}` contains a non-record element of type {found}",
                collection.field_name()
            ),
        }
    }
}

impl Error for DocumentError {}

/// One element of a split collection, persisted as its own file.
///
/// An entity is an arbitrary keyed record. Core storage reads exactly one
/// field, [`ENTITY_ID_FIELD`], and treats everything else as payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Creates an entity with a freshly generated v4 UUID id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    /// Creates an entity with a caller-provided stable id.
    ///
    /// Used by import paths where identity already exists externally. The id
    /// is not validated here; persistence validates before deriving a file
    /// name.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ENTITY_ID_FIELD.to_string(), Value::String(id.into()));
        Self(fields)
    }

    /// Returns the stable entity id.
    pub fn id(&self) -> Result<&str, EntityError> {
        match self.0.get(ENTITY_ID_FIELD) {
            None => Err(EntityError::MissingId),
            Some(Value::String(id)) => Ok(id),
            Some(other) => Err(EntityError::NonStringId {
                found: json_type_name(other),
            }),
        }
    }

    /// Returns the id after checking it is safe to use as a file name.
    ///
    /// Write paths must call this before deriving `<id>.json`.
    pub fn validated_id(&self) -> Result<&str, EntityError> {
        let id = self.id()?;
        validate_entity_id(id)?;
        Ok(id)
    }

    /// Sets one payload field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Reads one payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Borrows the raw field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Top-level persisted record, base unit of the key-value store.
///
/// Everything except the three split collection fields is opaque payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Sets one field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Reads one field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns whether the document has no fields at all.
    ///
    /// An empty document is indistinguishable from an absent one at the
    /// key-value layer (see `kv::json_store`).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrows the raw field map.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns whether this document carries the split collection schema.
    ///
    /// True iff all three collection fields are present, with any value
    /// (empty arrays included). One predicate serves both the save and the
    /// load path.
    pub fn has_split_collections(&self) -> bool {
        Collection::ALL
            .iter()
            .all(|collection| self.0.contains_key(collection.field_name()))
    }

    /// Extracts one collection field as an owned entity list.
    ///
    /// The document itself is left untouched; callers clear the field
    /// separately once every write has succeeded.
    pub fn collection_entities(
        &self,
        collection: Collection,
    ) -> Result<Vec<Entity>, DocumentError> {
        let field = collection.field_name();
        let items = match self.0.get(field) {
            None => {
                return Err(DocumentError::CollectionNotArray {
                    collection,
                    found: "nothing (field absent)",
                })
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(DocumentError::CollectionNotArray {
                    collection,
                    found: json_type_name(other),
                })
            }
        };

        let mut entities = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Object(fields) => entities.push(Entity(fields.clone())),
                other => {
                    return Err(DocumentError::EntityNotObject {
                        collection,
                        found: json_type_name(other),
                    })
                }
            }
        }
        Ok(entities)
    }

    /// Replaces one collection field with an empty array.
    pub fn clear_collection(&mut self, collection: Collection) {
        self.0
            .insert(collection.field_name().to_string(), Value::Array(Vec::new()));
    }

    /// Appends entities onto the existing collection field value.
    ///
    /// Concatenation, not replacement: whatever the field already holds in
    /// memory stays in front of the loaded entities. Returns the number of
    /// entities appended.
    pub fn append_to_collection(
        &mut self,
        collection: Collection,
        entities: Vec<Entity>,
    ) -> Result<usize, DocumentError> {
        let field = collection.field_name();
        let slot = match self.0.get_mut(field) {
            None => {
                return Err(DocumentError::CollectionNotArray {
                    collection,
                    found: "nothing (field absent)",
                })
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(DocumentError::CollectionNotArray {
                    collection,
                    found: json_type_name(other),
                })
            }
        };

        let appended = entities.len();
        slot.reserve(appended);
        for entity in entities {
            slot.push(Value::Object(entity.0));
        }
        Ok(appended)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Checks an entity id is usable as a file name.
///
/// Ids are opaque strings, not necessarily RFC 4122 UUIDs; the only rules
/// are the ones file naming forces: non-empty, no path separators, no NUL,
/// not a relative path component.
pub fn validate_entity_id(id: &str) -> Result<(), EntityError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(EntityError::InvalidId(id.to_string()));
    }
    if id.contains(['/', '\\', '\0']) {
        return Err(EntityError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
