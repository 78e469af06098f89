//! Font preparation before writes
//!
//! Every font a destination element currently uses must be loaded before its
//! characters can change. Fonts are gathered per element, deduplicated by
//! `(family, style)`, and loaded concurrently; one font failing does not stop
//! the others.

use std::collections::BTreeSet;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::host::{DocumentHost, FontLoader, FontName, HostError, TextElement};

/// Character positions sampled when run-level fonts are unavailable
fn sample_indices(len: usize) -> Vec<usize> {
    let mut indices = vec![0, len / 2, len - 1];
    indices.dedup();
    indices
}

/// Fonts used by one text element
pub fn element_fonts<H: DocumentHost + ?Sized>(host: &H, element: &TextElement) -> Vec<FontName> {
    if element.characters.is_empty() {
        if let Some(font) = &element.font {
            return vec![font.clone()];
        }
    }

    match host.font_runs(&element.id) {
        Ok(runs) if !runs.is_empty() => return runs,
        Ok(_) => {}
        Err(e) => warn!(element = %element.id, error = %e, "cannot read font runs"),
    }

    let len = element.characters.chars().count();
    if len == 0 {
        return element.font.iter().cloned().collect();
    }
    let mut fonts = Vec::new();
    for index in sample_indices(len) {
        match host.font_at(&element.id, index) {
            Ok(font) => fonts.push(font),
            Err(e) => warn!(element = %element.id, index, error = %e, "cannot sample font"),
        }
    }
    fonts
}

/// Distinct fonts used across a set of elements
pub fn collect_fonts<'a, H, I>(host: &H, elements: I) -> BTreeSet<FontName>
where
    H: DocumentHost + ?Sized,
    I: IntoIterator<Item = &'a TextElement>,
{
    elements
        .into_iter()
        .flat_map(|element| element_fonts(host, element))
        .collect()
}

/// Result of loading a batch of fonts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontLoadReport {
    pub loaded: Vec<FontName>,
    pub failed: Vec<(FontName, HostError)>,
}

/// Load all fonts concurrently, capturing each failure individually
pub async fn load_fonts<F: FontLoader + ?Sized>(
    loader: &F,
    fonts: &BTreeSet<FontName>,
) -> FontLoadReport {
    let results = join_all(fonts.iter().map(|font| async move {
        let result = loader.load_font(font).await;
        (font.clone(), result)
    }))
    .await;

    let mut report = FontLoadReport::default();
    for (font, result) in results {
        match result {
            Ok(()) => {
                debug!(font = %font, "font loaded");
                report.loaded.push(font);
            }
            Err(e) => {
                warn!(font = %font, error = %e, "font failed to load");
                report.failed.push((font, e));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryDocument, NodeId};
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"{
        "unavailable_fonts": [ { "family": "Missing", "style": "Bold" } ],
        "nodes": [
            { "id": "f", "type": "frame", "width": 100, "height": 100, "children": [
                { "id": "mixed", "type": "text", "characters": "abcdef",
                  "font_runs": [
                    { "start": 0, "end": 2, "font": { "family": "Inter", "style": "Regular" } },
                    { "start": 2, "end": 4, "font": { "family": "Inter", "style": "Italic" } },
                    { "start": 4, "end": 6, "font": { "family": "Inter", "style": "Bold" } }
                  ] },
                { "id": "empty", "type": "text", "characters": "",
                  "font": { "family": "Roboto", "style": "Regular" } },
                { "id": "missing", "type": "text", "characters": "x",
                  "font": { "family": "Missing", "style": "Bold" } }
            ] }
        ]
    }"#;

    fn element(doc: &MemoryDocument, id: &str) -> TextElement {
        doc.text_element(&NodeId::from(id)).expect("text element")
    }

    #[test]
    fn test_sample_indices() {
        assert_eq!(sample_indices(1), vec![0]);
        assert_eq!(sample_indices(2), vec![0, 1]);
        assert_eq!(sample_indices(7), vec![0, 3, 6]);
    }

    #[test]
    fn test_collect_fonts_dedupes_across_elements() {
        let doc = MemoryDocument::from_json(DOC).expect("valid document");
        let mixed = element(&doc, "mixed");
        let empty = element(&doc, "empty");
        let fonts = collect_fonts(&doc, [&mixed, &empty, &mixed]);
        let names: Vec<String> = fonts.iter().map(|f| f.to_string()).collect();
        assert_eq!(
            names,
            vec!["Inter Bold", "Inter Italic", "Inter Regular", "Roboto Regular"]
        );
    }

    #[test]
    fn test_samples_when_runs_unavailable() {
        let json = DOC.replacen("{", r#"{ "run_fonts_unavailable": true,"#, 1);
        let doc = MemoryDocument::from_json(&json).expect("valid document");
        let mixed = element(&doc, "mixed");
        // indices 0, 3, 5 fall in the Regular, Italic and Bold runs
        let fonts = element_fonts(&doc, &mixed);
        assert_eq!(fonts.len(), 3);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_others() {
        let doc = MemoryDocument::from_json(DOC).expect("valid document");
        let fonts: BTreeSet<FontName> = [
            FontName::new("Missing", "Bold"),
            FontName::new("Inter", "Regular"),
        ]
        .into_iter()
        .collect();
        let report = load_fonts(&doc.font_loader(), &fonts).await;
        assert_eq!(report.loaded, vec![FontName::new("Inter", "Regular")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(doc.loaded_fonts(), vec![FontName::new("Inter", "Regular")]);
    }
}
