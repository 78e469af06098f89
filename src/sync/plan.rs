//! Pending-write planning
//!
//! A destination is queued only when its text actually changes and the host
//! could plausibly accept the write. Locked elements and bound text outside any
//! component instance are counted and left alone.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::host::{DocumentHost, HostError, NodeId, NodeKind, TextElement, TextKind};

/// One queued text change
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub element: TextElement,
    pub text: String,
}

/// Whether a destination element can be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Writable,
    /// The element or one of its ancestors is locked
    Locked,
    /// Bound text with no component instance to override through
    UnboundComponent,
}

pub fn check_eligibility<H: DocumentHost + ?Sized>(
    host: &H,
    element: &TextElement,
) -> Result<Eligibility, HostError> {
    if element.locked {
        return Ok(Eligibility::Locked);
    }
    let ancestors = host.ancestors(&element.id)?;
    if ancestors.iter().any(|a| a.locked) {
        return Ok(Eligibility::Locked);
    }
    if element.kind == TextKind::Bound && !ancestors.iter().any(|a| a.kind == NodeKind::Instance) {
        return Ok(Eligibility::UnboundComponent);
    }
    Ok(Eligibility::Writable)
}

/// Writes queued for one run, plus planning-time skip counts
#[derive(Debug, Clone, Default)]
pub struct WritePlan {
    pending: Vec<PendingWrite>,
    queued: HashSet<NodeId>,
    pub skipped_locked: usize,
    pub skipped_bound_component: usize,
    pub failed: usize,
}

impl WritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[PendingWrite] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue `text` for `element` if it differs from the current text.
    ///
    /// Returns whether a write was queued. An element already queued keeps its
    /// first value.
    pub fn queue<H: DocumentHost + ?Sized>(
        &mut self,
        host: &H,
        element: &TextElement,
        text: &str,
    ) -> bool {
        if element.characters == text || self.queued.contains(&element.id) {
            return false;
        }
        match check_eligibility(host, element) {
            Ok(Eligibility::Writable) => {}
            Ok(Eligibility::Locked) => {
                debug!(element = %element.id, "skipping locked element");
                self.skipped_locked += 1;
                return false;
            }
            Ok(Eligibility::UnboundComponent) => {
                debug!(element = %element.id, "skipping bound text outside an instance");
                self.skipped_bound_component += 1;
                return false;
            }
            Err(e) => {
                warn!(element = %element.id, error = %e, "cannot check element before writing");
                self.failed += 1;
                return false;
            }
        }
        self.queued.insert(element.id.clone());
        self.pending.push(PendingWrite {
            element: element.clone(),
            text: text.to_string(),
        });
        true
    }

    pub fn into_pending(self) -> Vec<PendingWrite> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryDocument;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"{
        "nodes": [
            { "id": "f", "type": "frame", "width": 100, "height": 100, "children": [
                { "id": "free", "type": "text", "characters": "old" },
                { "id": "self_locked", "type": "text", "characters": "old", "locked": true },
                { "id": "g", "type": "group", "locked": true, "children": [
                    { "id": "parent_locked", "type": "text", "characters": "old" }
                ] },
                { "id": "orphan", "type": "text", "characters": "old", "bound_property": "P#1" },
                { "id": "i", "type": "instance",
                  "properties": [ { "key": "P#1", "type": "text", "value": "old" } ],
                  "children": [
                    { "id": "bound", "type": "text", "characters": "old", "bound_property": "P#1" }
                  ] }
            ] }
        ]
    }"#;

    fn element(doc: &MemoryDocument, id: &str) -> TextElement {
        doc.text_element(&NodeId::from(id)).expect("text element")
    }

    #[test]
    fn test_eligibility() {
        let doc = MemoryDocument::from_json(DOC).expect("valid document");
        let check = |id: &str| check_eligibility(&doc, &element(&doc, id)).expect("check");
        assert_eq!(check("free"), Eligibility::Writable);
        assert_eq!(check("self_locked"), Eligibility::Locked);
        assert_eq!(check("parent_locked"), Eligibility::Locked);
        assert_eq!(check("orphan"), Eligibility::UnboundComponent);
        assert_eq!(check("bound"), Eligibility::Writable);
    }

    #[test]
    fn test_queue_counts_skips() {
        let doc = MemoryDocument::from_json(DOC).expect("valid document");
        let mut plan = WritePlan::new();
        for id in ["free", "self_locked", "parent_locked", "orphan", "bound"] {
            plan.queue(&doc, &element(&doc, id), "new");
        }
        let queued: Vec<&str> = plan.pending().iter().map(|w| w.element.id.as_str()).collect();
        assert_eq!(queued, vec!["free", "bound"]);
        assert_eq!(plan.skipped_locked, 2);
        assert_eq!(plan.skipped_bound_component, 1);
    }

    #[test]
    fn test_unchanged_text_is_not_queued() {
        let doc = MemoryDocument::from_json(DOC).expect("valid document");
        let mut plan = WritePlan::new();
        assert!(!plan.queue(&doc, &element(&doc, "free"), "old"));
        assert!(plan.is_empty());
        // Locked but unchanged: nothing to skip either
        assert!(!plan.queue(&doc, &element(&doc, "self_locked"), "old"));
        assert_eq!(plan.skipped_locked, 0);
    }

    #[test]
    fn test_first_value_wins_for_repeated_element() {
        let doc = MemoryDocument::from_json(DOC).expect("valid document");
        let mut plan = WritePlan::new();
        assert!(plan.queue(&doc, &element(&doc, "free"), "first"));
        assert!(!plan.queue(&doc, &element(&doc, "free"), "second"));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.pending()[0].text, "first");
    }
}
