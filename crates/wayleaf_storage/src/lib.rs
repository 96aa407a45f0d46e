//! Document storage core for Wayleaf.
//! Splits workspace collections into per-entity files around a generic
//! JSON key-value store, and merges them back on load.

pub mod kv;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use kv::{JsonKvStore, KvError, KvResult, StorageTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{
    validate_entity_id, Collection, Document, DocumentError, Entity, EntityError,
};
pub use repo::entity_store::{
    EntityStore, EntityStoreError, EntityStoreResult, FsEntityStore, InMemoryEntityStore,
};
pub use service::document_service::{
    DocumentStore, LoadIssue, LoadedDocument, StorageError, StorageResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
