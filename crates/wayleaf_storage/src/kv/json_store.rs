use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::kv::{KvError, KvResult};
use crate::model::document::Document;

/// Characters that are unsafe in a stored file name on any supported platform.
static UNSAFE_KEY_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).expect("valid key sanitizer pattern"));

const DOCUMENT_EXTENSION: &str = ".json";

/// Where one stored document lives: a directory plus the unsanitized
/// base name shared by the document file and any sidecar directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub dir: PathBuf,
    pub base_name: String,
}

impl StorageTarget {
    /// Path of the document file itself, with the base name sanitized.
    pub fn document_path(&self) -> KvResult<PathBuf> {
        let file_name = sanitize_key(&self.base_name)?;
        Ok(self.dir.join(format!("{file_name}{DOCUMENT_EXTENSION}")))
    }
}

/// Stores each document as one JSON file under a root data directory.
///
/// Callers may address documents by bare key (`"workspace"`), by file
/// name (`"workspace.json"`), or by a path with directory components;
/// a directory in the path overrides the root for that document.
#[derive(Debug, Clone)]
pub struct JsonKvStore {
    root: PathBuf,
}

impl JsonKvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a caller path to the directory and base name of the
    /// document it addresses. The base name keeps its original
    /// characters; only a trailing `.json` extension is dropped.
    pub fn resolve(&self, path: &str) -> KvResult<StorageTarget> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(KvError::InvalidKey(path.to_string()));
        }
        let parsed = Path::new(trimmed);
        let dir = match parsed.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => self.root.clone(),
        };
        let base_name = parsed
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| KvError::InvalidKey(path.to_string()))?
            .to_string();
        Ok(StorageTarget { dir, base_name })
    }

    /// Reads the document stored at `target`.
    ///
    /// A missing file and a stored empty object are both absence, so
    /// both come back as `Ok(None)`; unreadable or unparseable content
    /// is an error the caller decides how to surface.
    pub fn get(&self, target: &StorageTarget) -> KvResult<Option<Document>> {
        let started = Instant::now();
        let file = target.document_path()?;
        let raw = match fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(
                    "event=kv_get module=kv status=miss key={} dir={}",
                    target.base_name,
                    target.dir.display()
                );
                return Ok(None);
            }
            Err(err) => return Err(KvError::io(file, err)),
        };
        let document: Document = serde_json::from_str(&raw).map_err(|err| KvError::Malformed {
            path: file.clone(),
            message: err.to_string(),
        })?;
        if document.is_empty() {
            debug!(
                "event=kv_get module=kv status=empty key={} dir={}",
                target.base_name,
                target.dir.display()
            );
            return Ok(None);
        }
        debug!(
            "event=kv_get module=kv status=ok key={} dir={} bytes={} duration_ms={}",
            target.base_name,
            target.dir.display(),
            raw.len(),
            started.elapsed().as_millis()
        );
        Ok(Some(document))
    }

    /// Writes `document` to `target`, creating the directory if needed.
    pub fn set(&self, target: &StorageTarget, document: &Document, pretty: bool) -> KvResult<()> {
        let started = Instant::now();
        let file = target.document_path()?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(|err| KvError::io(parent.to_path_buf(), err))?;
        }
        let payload = if pretty {
            serde_json::to_string_pretty(document)
        } else {
            serde_json::to_string(document)
        }
        .map_err(|err| KvError::Serialize(err.to_string()))?;
        fs::write(&file, &payload).map_err(|err| KvError::io(file, err))?;
        debug!(
            "event=kv_set module=kv status=ok key={} dir={} bytes={} pretty={} duration_ms={}",
            target.base_name,
            target.dir.display(),
            payload.len(),
            pretty,
            started.elapsed().as_millis()
        );
        Ok(())
    }
}

/// Reduces a key to a safe file name: strips one `.json` suffix,
/// removes unsafe characters, then trims trailing dots and spaces.
fn sanitize_key(key: &str) -> KvResult<String> {
    let trimmed = key.trim();
    let without_ext = trimmed.strip_suffix(DOCUMENT_EXTENSION).unwrap_or(trimmed);
    let cleaned = UNSAFE_KEY_CHARS.replace_all(without_ext, "");
    let cleaned = cleaned.trim_end_matches(['.', ' ']);
    if cleaned.is_empty() {
        return Err(KvError::InvalidKey(key.to_string()));
    }
    Ok(cleaned.to_string())
}
