//! Workspace document domain model.
//!
//! # Responsibility
//! - Define the document/entity shapes persisted by core storage.
//! - Keep payloads opaque: only the entity `uuid` field is ever inspected.
//!
//! # Invariants
//! - Every entity is identified by a stable string `uuid`.
//! - Collection fields are ordered arrays of entity records.

pub mod document;
