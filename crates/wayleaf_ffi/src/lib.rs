//! Flutter-facing FFI surface for Wayleaf document storage.

pub mod api;
