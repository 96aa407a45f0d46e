//! Persistence layer for split collection artifacts.
//!
//! # Responsibility
//! - Define the storage capability contract for entity files.
//! - Derive the artifact directory layout next to a stored document.
//! - Read and write whole collections as one-file-per-entity trees.
//!
//! # Invariants
//! - Layout derivation is pure; all filesystem access goes through one
//!   injected `EntityStore` so tests can substitute an in-memory store.
//! - Reading a collection whose directory is missing yields an empty
//!   sequence, never an error.

pub mod artifact_layout;
pub mod collection_store;
pub mod entity_store;
