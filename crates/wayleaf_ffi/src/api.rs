//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose document save/load to Dart via FRB.
//! - Keep error semantics simple: string envelopes, no thrown exceptions.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Documents cross the boundary as UTF-8 JSON text.

use std::path::PathBuf;
use std::sync::OnceLock;

use log::warn;

use wayleaf_storage::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Document, DocumentStore,
};

const STORAGE_ROOT_ENV: &str = "WAYLEAF_DATA_DIR";
const DEFAULT_DATA_DIR_NAME: &str = "wayleaf_data";
static STORAGE_ROOT: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Pins the data directory used for document paths without a directory.
///
/// # FFI contract
/// - Sync call, sets process-wide state once.
/// - Calling again with the same path is idempotent; a different path
///   returns an error message.
/// - Never panics; returns empty string on success.
#[flutter_rust_bridge::frb(sync)]
pub fn set_storage_root(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "storage root cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = STORAGE_ROOT.get_or_init(|| requested.clone());
    if active == &requested {
        String::new()
    } else {
        warn!(
            "event=storage_root_conflict module=ffi status=refused active={} requested={}",
            active.display(),
            requested.display()
        );
        format!(
            "storage root already set to `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// Read response envelope for document load flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReadResponse {
    /// Whether a document exists under the requested path.
    pub found: bool,
    /// Serialized document when found.
    pub json: Option<String>,
    /// Collections that failed to merge, as human-readable descriptions.
    pub issues: Vec<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

/// Generic action response envelope for document command flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl DocumentActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Loads one document, merging its split collections.
///
/// `path` may be a bare key (resolved under the storage root) or a path
/// with a directory component.
///
/// # FFI contract
/// - Sync call, filesystem-backed execution.
/// - Never panics.
/// - Absent and unreadable documents both return `found=false`.
/// - Collections that failed to merge are listed in `issues`; the returned
///   document still contains every collection that merged cleanly.
#[flutter_rust_bridge::frb(sync)]
pub fn document_read(path: String) -> DocumentReadResponse {
    match storage_store().read_document(&path) {
        Ok(Some(loaded)) => {
            let message = if loaded.is_clean() {
                "Document loaded.".to_string()
            } else {
                format!("Document loaded with {} issue(s).", loaded.issues.len())
            };
            let issues = loaded.issues.iter().map(ToString::to_string).collect();
            match serde_json::to_string(&loaded.document) {
                Ok(json) => DocumentReadResponse {
                    found: true,
                    json: Some(json),
                    issues,
                    message,
                },
                Err(err) => DocumentReadResponse {
                    found: false,
                    json: None,
                    issues,
                    message: format!("document_read failed: {err}"),
                },
            }
        }
        Ok(None) => DocumentReadResponse {
            found: false,
            json: None,
            issues: Vec::new(),
            message: "Document not found.".to_string(),
        },
        Err(err) => DocumentReadResponse {
            found: false,
            json: None,
            issues: Vec::new(),
            message: format!("document_read failed: {err}"),
        },
    }
}

/// Stores one document, splitting its collections into entity files.
///
/// `json` must hold a JSON object. When all three collection fields are
/// present, their entities are written as individual files and the stored
/// base document keeps empty arrays in their place.
///
/// # FFI contract
/// - Sync call, filesystem-backed execution.
/// - Never panics.
/// - Any write failure reports `ok=false`; partially written entity files
///   may remain.
#[flutter_rust_bridge::frb(sync)]
pub fn document_write(path: String, json: String, pretty: bool) -> DocumentActionResponse {
    let mut document: Document = match serde_json::from_str(&json) {
        Ok(document) => document,
        Err(err) => {
            warn!("event=document_parse_failed module=ffi status=rejected path={path} error={err}");
            return DocumentActionResponse::failure(format!(
                "document_write failed: invalid document JSON: {err}"
            ));
        }
    };
    match storage_store().write_document(&mut document, &path, pretty) {
        Ok(()) => DocumentActionResponse::success("Document stored."),
        Err(err) => DocumentActionResponse::failure(format!("document_write failed: {err}")),
    }
}

fn storage_store() -> DocumentStore {
    DocumentStore::new(resolve_storage_root())
}

fn resolve_storage_root() -> PathBuf {
    STORAGE_ROOT
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(STORAGE_ROOT_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DEFAULT_DATA_DIR_NAME)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, document_read, document_write, init_logging, ping, set_storage_root,
    };
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(suffix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "wayleaf-ffi-{suffix}-{}-{nanos}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn set_storage_root_is_idempotent_and_rejects_conflicts() {
        assert!(set_storage_root(String::new()).contains("empty"));

        let first = unique_temp_dir("root");
        let first = first.to_str().expect("utf-8 temp dir").to_string();
        let initial = set_storage_root(first.clone());
        if initial.is_empty() {
            // This call pinned the root; repeating it is a no-op.
            assert_eq!(set_storage_root(first), String::new());
        } else {
            // Another test resolved the root first; a different path is refused.
            assert!(initial.contains("refusing to switch"));
        }

        let other = unique_temp_dir("other-root");
        let conflict = set_storage_root(other.to_str().expect("utf-8 temp dir").to_string());
        assert!(conflict.contains("refusing to switch"));
    }

    #[test]
    fn document_round_trips_through_ffi_envelopes() {
        let dir = unique_temp_dir("roundtrip");
        let path = dir.join("workspace.json");
        let path = path.to_str().expect("utf-8 temp path").to_string();

        let source = r#"{
            "title": "ffi workspace",
            "routes": [{ "uuid": "r1", "path": "/inbox" }],
            "rootChildren": [{ "uuid": "c1" }],
            "folders": []
        }"#;
        let written = document_write(path.clone(), source.to_string(), false);
        assert!(written.ok, "{}", written.message);

        let response = document_read(path);
        assert!(response.found, "{}", response.message);
        assert!(response.issues.is_empty());
        let document: serde_json::Value =
            serde_json::from_str(&response.json.expect("document json")).expect("valid json");
        assert_eq!(document["title"], "ffi workspace");
        assert_eq!(document["routes"][0]["uuid"], "r1");
        assert_eq!(document["rootChildren"][0]["uuid"], "c1");
    }

    #[test]
    fn document_read_reports_absent_document() {
        let dir = unique_temp_dir("absent");
        let path = dir.join("nothing.json");
        let response = document_read(path.to_str().expect("utf-8 temp path").to_string());
        assert!(!response.found);
        assert!(response.json.is_none());
    }

    #[test]
    fn document_write_rejects_invalid_json() {
        let dir = unique_temp_dir("invalid");
        let path = dir.join("bad.json");
        let response = document_write(
            path.to_str().expect("utf-8 temp path").to_string(),
            "{ not json".to_string(),
            false,
        );
        assert!(!response.ok);
        assert!(response.message.contains("invalid document JSON"));
    }
}
