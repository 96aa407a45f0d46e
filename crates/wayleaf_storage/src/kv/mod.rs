//! Generic key-value JSON document storage.
//!
//! # Responsibility
//! - Persist whole documents as `<key>.json` files under a data directory.
//! - Resolve caller paths (bare key or path with directory) to one target.
//!
//! # Invariants
//! - Keys are sanitized to safe file names before any filesystem access.
//! - A missing file and a stored empty object both read back as absent.
//! - This layer never interprets document contents.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod json_store;

pub use json_store::{JsonKvStore, StorageTarget};

pub type KvResult<T> = Result<T, KvError>;

/// Errors from key-value document storage operations.
#[derive(Debug)]
pub enum KvError {
    /// Key or path is empty, or empty once sanitized to a file name.
    InvalidKey(String),
    /// Stored content is not a valid JSON document.
    Malformed { path: PathBuf, message: String },
    /// Document could not be serialized for writing.
    Serialize(String),
    /// Filesystem failure at a concrete path.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl KvError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid storage key `{key}`"),
            Self::Malformed { path, message } => {
                write!(f, "malformed document at `{}`: {message}", path.display())
            }
            Self::Serialize(message) => write!(f, "document serialization failed: {message}"),
            Self::Io { path, source } => {
                write!(f, "storage I/O at `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::InvalidKey(_) | Self::Malformed { .. } | Self::Serialize(_) => None,
        }
    }
}
