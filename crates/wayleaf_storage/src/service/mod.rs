//! Document persistence use-case services.
//!
//! # Responsibility
//! - Orchestrate collection splitting around the generic key-value store.
//! - Keep FFI/CLI layers decoupled from layout and storage details.

pub mod document_service;
