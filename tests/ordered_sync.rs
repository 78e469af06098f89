//! Reading-order extraction and replay

use frame_text_sync::{
    extract_ordered, sync_document_ordered, MemoryDocument, NodeId, RunContext, SyncOptions,
    SyncRequest,
};
use pretty_assertions::assert_eq;

const CARDS: &str = r#"{ "nodes": [
    { "id": "src", "type": "frame", "width": 200, "height": 200, "children": [
        { "id": "c", "type": "text", "characters": "c", "x": 10, "y": 150 },
        { "id": "b", "type": "text", "characters": "b", "x": 120, "y": 10 },
        { "id": "a", "type": "text", "characters": "a", "x": 10, "y": 10 }
    ] },
    { "id": "short", "type": "frame", "x": 400, "width": 200, "height": 200, "children": [
        { "id": "s2", "type": "text", "characters": "", "x": 10, "y": 90 },
        { "id": "s1", "type": "text", "characters": "", "x": 10, "y": 20 }
    ] },
    { "id": "long", "type": "frame", "x": 800, "width": 200, "height": 200, "children": [
        { "id": "l1", "type": "text", "characters": "a", "x": 0, "y": 0 },
        { "id": "l2", "type": "text", "characters": "", "x": 0, "y": 40 },
        { "id": "l3", "type": "text", "characters": "", "x": 0, "y": 80 },
        { "id": "l4", "type": "text", "characters": "keep", "x": 0, "y": 120 }
    ] }
] }"#;

fn text(doc: &MemoryDocument, id: &str) -> String {
    doc.characters(&NodeId::from(id)).unwrap_or_default().to_string()
}

fn request(containers: &[&str]) -> SyncRequest {
    SyncRequest::new(
        containers.iter().map(|id| NodeId::from(*id)).collect(),
        "src",
    )
}

#[test]
fn test_extract_reads_rows_then_columns() {
    let doc = MemoryDocument::from_json(CARDS).expect("valid document");
    let texts = extract_ordered(&doc, &NodeId::from("src")).expect("extract");
    assert_eq!(texts, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_replay_into_fewer_elements_truncates() {
    let mut doc = MemoryDocument::from_json(CARDS).expect("valid document");
    let req = request(&["src", "short"]);
    let outcome = sync_document_ordered(&mut doc, &req, &RunContext::default())
        .await
        .expect("run");

    assert!(!outcome.is_cancelled());
    assert_eq!(outcome.summary().written, 2);
    assert_eq!(outcome.summary().unmatched, 1);
    assert_eq!(text(&doc, "s1"), "a");
    assert_eq!(text(&doc, "s2"), "b");
}

#[tokio::test]
async fn test_replay_into_more_elements_leaves_the_rest() {
    let mut doc = MemoryDocument::from_json(CARDS).expect("valid document");
    let req = request(&["src", "long"]);
    let outcome = sync_document_ordered(&mut doc, &req, &RunContext::default())
        .await
        .expect("run");

    // l1 already reads "a"
    assert_eq!(outcome.summary().matched, 3);
    assert_eq!(outcome.summary().written, 2);
    assert_eq!(text(&doc, "l2"), "b");
    assert_eq!(text(&doc, "l3"), "c");
    assert_eq!(text(&doc, "l4"), "keep");
}

#[tokio::test]
async fn test_ordered_dry_run_changes_nothing() {
    let mut doc = MemoryDocument::from_json(CARDS).expect("valid document");
    let req = request(&["src", "short", "long"])
        .with_options(SyncOptions::new().with_dry_run(true));
    let outcome = sync_document_ordered(&mut doc, &req, &RunContext::default())
        .await
        .expect("run");

    assert!(outcome.summary().dry_run);
    assert_eq!(outcome.summary().written, 4);
    assert_eq!(doc.write_count(), 0);
}
