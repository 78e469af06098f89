//! Frame Text Sync - propagate text between structurally equivalent containers
//!
//! Given several containers (frames, groups, component instances) holding
//! positioned text elements, one container is the source of truth. Each of its
//! text elements is paired with at most one element per target container, by
//! name first and then by normalized position, and the source text is written
//! to the matched elements in cancellable batches.
//!
//! # Example
//!
//! ```rust
//! use frame_text_sync::{sync_document, MemoryDocument, RunContext, SyncRequest};
//!
//! let mut doc = MemoryDocument::from_json(r#"{ "nodes": [
//!     { "id": "a", "type": "frame", "width": 100, "height": 100, "children": [
//!         { "id": "a1", "type": "text", "name": "greeting", "characters": "Hello",
//!           "x": 50, "y": 50 } ] },
//!     { "id": "b", "type": "frame", "width": 100, "height": 100, "children": [
//!         { "id": "b1", "type": "text", "name": "greeting", "characters": "",
//!           "x": 51, "y": 49 } ] }
//! ] }"#).unwrap();
//!
//! let request = SyncRequest::new(vec!["a".into(), "b".into()], "a");
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let outcome = runtime
//!     .block_on(sync_document(&mut doc, &request, &RunContext::default()))
//!     .unwrap();
//!
//! assert_eq!(outcome.summary().written, 1);
//! assert_eq!(doc.characters(&"b1".into()), Some("Hello"));
//! ```

pub mod error;
pub mod geometry;
pub mod host;
pub mod sync;

pub use error::{ConfigError, SyncError, ValidationError};
pub use geometry::{Anchor, NormalizedPoint, Transform};
pub use host::{
    DocumentHost, FontLoader, FontName, HostError, MemoryDocument, MemoryFontLoader, NodeId,
    TextElement,
};
pub use sync::{
    extract_ordered, progress_fn, replay_ordered, run_ordered, run_sync, run_with_deadline,
    CancelFlag, ProgressEvent, ProgressSink, RunContext, RunOutcome, RunSummary, SyncOptions,
    SyncRequest,
};

/// Run a matching sync over an in-memory document, using its own font registry
pub async fn sync_document(
    doc: &mut MemoryDocument,
    request: &SyncRequest,
    ctx: &RunContext,
) -> Result<RunOutcome, SyncError> {
    let fonts = doc.font_loader();
    run_sync(doc, &fonts, request, ctx).await
}

/// Run a reading-order sync over an in-memory document
pub async fn sync_document_ordered(
    doc: &mut MemoryDocument,
    request: &SyncRequest,
    ctx: &RunContext,
) -> Result<RunOutcome, SyncError> {
    let fonts = doc.font_loader();
    run_ordered(doc, &fonts, request, ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{ "nodes": [
        { "id": "a", "type": "frame", "width": 100, "height": 100, "children": [
            { "id": "a1", "type": "text", "characters": "one", "x": 10, "y": 10 },
            { "id": "a2", "type": "text", "characters": "two", "x": 10, "y": 60 } ] },
        { "id": "b", "type": "frame", "width": 100, "height": 100, "children": [
            { "id": "b1", "type": "text", "characters": "", "x": 80, "y": 5 },
            { "id": "b2", "type": "text", "characters": "", "x": 80, "y": 90 } ] }
    ] }"#;

    fn request() -> SyncRequest {
        SyncRequest::new(vec![NodeId::from("a"), NodeId::from("b")], "a")
    }

    #[tokio::test]
    async fn test_sync_document_matches_by_position() {
        let mut doc = MemoryDocument::from_json(DOC).unwrap();
        let outcome = sync_document(&mut doc, &request(), &RunContext::default())
            .await
            .unwrap();
        // Targets are far from both pivots
        assert_eq!(outcome.summary().matched, 0);
        assert_eq!(outcome.summary().unmatched, 2);
        assert_eq!(doc.write_count(), 0);
    }

    #[tokio::test]
    async fn test_sync_document_ordered_ignores_position() {
        let mut doc = MemoryDocument::from_json(DOC).unwrap();
        let outcome = sync_document_ordered(&mut doc, &request(), &RunContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.summary().written, 2);
        assert_eq!(doc.characters(&NodeId::from("b1")), Some("one"));
        assert_eq!(doc.characters(&NodeId::from("b2")), Some("two"));
    }
}
