//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `wayleaf_storage` linkage.
//! - Optionally inspect one stored document and print collection counts.

use std::process::ExitCode;

use wayleaf_storage::{Collection, DocumentStore};

fn main() -> ExitCode {
    println!("wayleaf_storage ping={}", wayleaf_storage::ping());
    println!("wayleaf_storage version={}", wayleaf_storage::core_version());

    match std::env::args().nth(1) {
        Some(path) => inspect_document(&path),
        None => ExitCode::SUCCESS,
    }
}

/// Reads the document at `path` (bare keys resolve against the working
/// directory) and prints one line per collection.
fn inspect_document(path: &str) -> ExitCode {
    let store = DocumentStore::new(".");
    match store.read_document(path) {
        Ok(Some(loaded)) => {
            println!("document fields={}", loaded.document.len());
            for collection in Collection::ALL {
                let count = loaded
                    .document
                    .collection_entities(collection)
                    .map(|entities| entities.len())
                    .unwrap_or(0);
                println!("collection {collection} entities={count}");
            }
            for issue in &loaded.issues {
                eprintln!("issue: {issue}");
            }
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("no document at `{path}`");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("read failed: {err}");
            ExitCode::FAILURE
        }
    }
}
