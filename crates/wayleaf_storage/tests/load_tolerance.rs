use serde_json::json;
use wayleaf_storage::{Collection, Document, DocumentStore};

fn setup() -> (tempfile::TempDir, DocumentStore) {
    let tmp = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(tmp.path());
    (tmp, store)
}

fn document_from(value: serde_json::Value) -> Document {
    serde_json::from_value(value).unwrap()
}

#[test]
fn absent_document_loads_as_none() {
    let (_tmp, store) = setup();
    assert!(store.read_document("missing").unwrap().is_none());
}

#[test]
fn stored_empty_object_loads_as_none() {
    let (tmp, store) = setup();
    std::fs::write(tmp.path().join("blank.json"), "{}").unwrap();
    assert!(store.read_document("blank").unwrap().is_none());
}

#[test]
fn unreadable_base_document_loads_as_none_not_error() {
    let (tmp, store) = setup();
    std::fs::write(tmp.path().join("broken.json"), "{ definitely not json").unwrap();
    assert!(store.read_document("broken").unwrap().is_none());
}

#[test]
fn legacy_document_without_artifacts_loads_its_field_values() {
    let (tmp, store) = setup();
    // A document written by an older build: split fields present and
    // populated, but no artifacts tree next to it.
    let legacy = json!({
        "title": "legacy",
        "routes": [{ "uuid": "r1" }],
        "rootChildren": [{ "uuid": "c1" }],
        "folders": []
    });
    std::fs::write(
        tmp.path().join("legacy.json"),
        serde_json::to_string(&legacy).unwrap(),
    )
    .unwrap();

    let loaded = store.read_document("legacy").unwrap().unwrap();
    assert!(loaded.is_clean());
    let routes = loaded.document.collection_entities(Collection::Routes).unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].id(), Ok("r1"));
}

#[test]
fn load_appends_to_existing_in_memory_values() {
    let (tmp, store) = setup();
    let mut document = document_from(json!({
        "routes": [{ "uuid": "on-disk" }],
        "rootChildren": [],
        "folders": []
    }));
    store.write_document(&mut document, "workspace", false).unwrap();

    // Rewrite the base document so its routes field already has one entry,
    // as if a caller had mutated the loaded document and re-serialized it
    // without going through the split path.
    let base = json!({
        "routes": [{ "uuid": "in-memory" }],
        "rootChildren": [],
        "folders": []
    });
    std::fs::write(
        tmp.path().join("workspace.json"),
        serde_json::to_string(&base).unwrap(),
    )
    .unwrap();

    let loaded = store.read_document("workspace").unwrap().unwrap();
    let routes = loaded.document.collection_entities(Collection::Routes).unwrap();
    let ids: Vec<_> = routes.iter().map(|e| e.id().unwrap().to_string()).collect();
    // Concatenation, not replacement: the in-memory value stays in front.
    assert_eq!(ids, ["in-memory", "on-disk"]);
}

#[test]
fn corrupt_entity_file_skips_only_its_collection() {
    let (tmp, store) = setup();
    let mut document = document_from(json!({
        "routes": [{ "uuid": "a" }],
        "rootChildren": [{ "uuid": "c1" }],
        "folders": [{ "uuid": "f1" }]
    }));
    store.write_document(&mut document, "workspace", false).unwrap();

    let routes_dir = tmp.path().join("workspace.artifacts").join("routes");
    std::fs::write(routes_dir.join("b.json"), "{ not json").unwrap();

    let loaded = store.read_document("workspace").unwrap().unwrap();

    assert_eq!(loaded.issues.len(), 1);
    assert_eq!(loaded.issues[0].collection, Collection::Routes);
    assert!(loaded.issues[0].detail.contains("b.json"));

    // Routes stayed at its stored (emptied) value; nothing partial leaked in.
    assert_eq!(loaded.document.get("routes"), Some(&json!([])));
    // The other collections merged normally.
    let children = loaded
        .document
        .collection_entities(Collection::RootChildren)
        .unwrap();
    assert_eq!(children.len(), 1);
    let folders = loaded.document.collection_entities(Collection::Folders).unwrap();
    assert_eq!(folders.len(), 1);
}

#[test]
fn non_array_collection_field_is_reported_as_issue() {
    let (tmp, store) = setup();
    let mut document = document_from(json!({
        "routes": [{ "uuid": "r1" }],
        "rootChildren": [{ "uuid": "c1" }],
        "folders": [{ "uuid": "f1" }]
    }));
    store.write_document(&mut document, "workspace", false).unwrap();

    // Hand-corrupt the stored base document: folders is no longer an array.
    let raw = std::fs::read_to_string(tmp.path().join("workspace.json")).unwrap();
    let mut stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
    stored["folders"] = json!("oops");
    std::fs::write(
        tmp.path().join("workspace.json"),
        serde_json::to_string(&stored).unwrap(),
    )
    .unwrap();

    let loaded = store.read_document("workspace").unwrap().unwrap();
    assert_eq!(loaded.issues.len(), 1);
    assert_eq!(loaded.issues[0].collection, Collection::Folders);
    // The broken field keeps its stored value for the caller to inspect.
    assert_eq!(loaded.document.get("folders"), Some(&json!("oops")));
    let routes = loaded.document.collection_entities(Collection::Routes).unwrap();
    assert_eq!(routes.len(), 1);
}

#[test]
fn entity_file_holding_a_non_record_value_fails_that_collection() {
    let (tmp, store) = setup();
    let mut document = document_from(json!({
        "routes": [{ "uuid": "r1" }],
        "rootChildren": [],
        "folders": []
    }));
    store.write_document(&mut document, "workspace", false).unwrap();

    let routes_dir = tmp.path().join("workspace.artifacts").join("routes");
    std::fs::write(routes_dir.join("list.json"), "[1, 2, 3]").unwrap();

    let loaded = store.read_document("workspace").unwrap().unwrap();
    assert_eq!(loaded.issues.len(), 1);
    assert_eq!(loaded.issues[0].collection, Collection::Routes);
}
