//! Single-element text writes with the component-property fallback
//!
//! When a direct assignment is refused, the text usually belongs to a property
//! of an enclosing component instance. The nearest instance's text properties
//! are then searched, in this order:
//! 1. a property whose value equals the element's current trimmed text
//! 2. a property whose key resembles the element's name
//! 3. the only text property, if there is exactly one

use tracing::{debug, warn};

use crate::host::{
    ComponentProperty, DocumentHost, HostError, NodeId, NodeKind, PropertyKind, TextElement,
    TextKind,
};

/// How a write was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Direct,
    Override { instance: NodeId, key: String },
}

/// Why a write could not be applied
#[derive(Debug, Clone, PartialEq)]
pub enum WriteError {
    /// Bound text with no instance property that could carry the value
    NoOverride { id: NodeId },
    Host(HostError),
}

impl WriteError {
    pub fn is_bound_skip(&self) -> bool {
        matches!(self, WriteError::NoOverride { .. })
    }
}

/// Property key with any `#suffix` removed, lowercased
fn key_stem(key: &str) -> String {
    key.split('#').next().unwrap_or(key).trim().to_lowercase()
}

/// Pick the property of an instance that most likely holds `element`'s text
pub fn select_override_property<'a>(
    properties: &'a [ComponentProperty],
    element: &TextElement,
) -> Option<&'a ComponentProperty> {
    let text_properties: Vec<&ComponentProperty> = properties
        .iter()
        .filter(|p| p.kind == PropertyKind::Text)
        .collect();

    let current = element.characters.trim();
    if !current.is_empty() {
        if let Some(p) = text_properties
            .iter()
            .copied()
            .find(|p| p.value.trim() == current)
        {
            return Some(p);
        }
    }

    let name = element.name.trim().to_lowercase();
    if !name.is_empty() {
        let resembles = text_properties.iter().copied().find(|p| {
            let stem = key_stem(&p.key);
            !stem.is_empty() && (stem.contains(&name) || name.contains(&stem))
        });
        if let Some(p) = resembles {
            return Some(p);
        }
    }

    match text_properties.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

fn nearest_instance<H: DocumentHost + ?Sized>(
    host: &H,
    id: &NodeId,
) -> Result<Option<NodeId>, HostError> {
    Ok(host
        .ancestors(id)?
        .into_iter()
        .find(|a| a.kind == NodeKind::Instance)
        .map(|a| a.id))
}

/// Write `text` into `element`, falling back to an instance property override
pub fn write_text<H: DocumentHost + ?Sized>(
    host: &mut H,
    element: &TextElement,
    text: &str,
) -> Result<WriteOutcome, WriteError> {
    let direct_error = match host.set_characters(&element.id, text) {
        Ok(()) => return Ok(WriteOutcome::Direct),
        Err(e) => e,
    };
    debug!(element = %element.id, error = %direct_error, "direct write refused, trying override");

    let unresolved = |direct_error: HostError| match element.kind {
        TextKind::Bound => WriteError::NoOverride {
            id: element.id.clone(),
        },
        TextKind::Literal => WriteError::Host(direct_error),
    };

    let instance = match nearest_instance(host, &element.id).map_err(WriteError::Host)? {
        Some(instance) => instance,
        None => return Err(unresolved(direct_error)),
    };
    let properties = host
        .component_properties(&instance)
        .map_err(WriteError::Host)?;
    let key = match select_override_property(&properties, element) {
        Some(p) => p.key.clone(),
        None => {
            warn!(
                element = %element.id,
                instance = %instance,
                "no instance property matches element"
            );
            return Err(unresolved(direct_error));
        }
    };

    host.set_component_property(&instance, &key, text)
        .map_err(WriteError::Host)?;
    Ok(WriteOutcome::Override { instance, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryDocument;
    use pretty_assertions::assert_eq;

    fn property(key: &str, kind: PropertyKind, value: &str) -> ComponentProperty {
        ComponentProperty {
            key: key.to_string(),
            kind,
            value: value.to_string(),
        }
    }

    fn element(name: &str, characters: &str) -> TextElement {
        TextElement {
            id: NodeId::from("t"),
            name: name.to_string(),
            characters: characters.to_string(),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            absolute_transform: Default::default(),
            absolute_bounds: None,
            visible: true,
            locked: false,
            kind: TextKind::Bound,
            font: None,
        }
    }

    fn selected(properties: &[ComponentProperty], element: &TextElement) -> Option<String> {
        select_override_property(properties, element).map(|p| p.key.clone())
    }

    #[test]
    fn test_value_match_comes_first() {
        let properties = vec![
            property("Title#1:0", PropertyKind::Text, "Welcome"),
            property("Label#2:0", PropertyKind::Text, "Buy now"),
        ];
        let element = element("Title", "  Buy now ");
        assert_eq!(selected(&properties, &element), Some("Label#2:0".to_string()));
    }

    #[test]
    fn test_name_resemblance_when_no_value_matches() {
        let properties = vec![
            property("Title#1:0", PropertyKind::Text, "Welcome"),
            property("Button label#2:0", PropertyKind::Text, "Go"),
        ];
        let element = element("label", "something else");
        assert_eq!(
            selected(&properties, &element),
            Some("Button label#2:0".to_string())
        );
    }

    #[test]
    fn test_sole_text_property_is_the_default() {
        let properties = vec![
            property("Show icon#3:0", PropertyKind::Boolean, "true"),
            property("Caption#4:0", PropertyKind::Text, "Old"),
        ];
        let element = element("", "unrelated");
        assert_eq!(selected(&properties, &element), Some("Caption#4:0".to_string()));
    }

    #[test]
    fn test_ambiguous_properties_select_nothing() {
        let properties = vec![
            property("A#1", PropertyKind::Text, "one"),
            property("B#2", PropertyKind::Text, "two"),
        ];
        let element = element("", "three");
        assert_eq!(selected(&properties, &element), None);
    }

    #[test]
    fn test_non_text_properties_are_ignored() {
        let properties = vec![property("Label#1", PropertyKind::Variant, "Buy")];
        let element = element("Label", "Buy");
        assert_eq!(selected(&properties, &element), None);
    }

    const DOC: &str = r#"{
        "nodes": [
            { "id": "f", "type": "frame", "width": 100, "height": 100, "children": [
                { "id": "plain", "type": "text", "characters": "a" },
                { "id": "i", "type": "instance", "width": 50, "height": 20,
                  "properties": [ { "key": "Label#1", "type": "text", "value": "Buy" } ],
                  "children": [
                    { "id": "bound", "type": "text", "characters": "Buy",
                      "bound_property": "Label#1" }
                  ] },
                { "id": "orphan", "type": "text", "characters": "x", "bound_property": "Gone#1" }
            ] }
        ]
    }"#;

    #[test]
    fn test_direct_write() {
        let mut doc = MemoryDocument::from_json(DOC).expect("valid document");
        let plain = doc.text_element(&NodeId::from("plain")).expect("text");
        assert_eq!(write_text(&mut doc, &plain, "b"), Ok(WriteOutcome::Direct));
        assert_eq!(doc.characters(&NodeId::from("plain")), Some("b"));
    }

    #[test]
    fn test_bound_write_goes_through_instance() {
        let mut doc = MemoryDocument::from_json(DOC).expect("valid document");
        let bound = doc.text_element(&NodeId::from("bound")).expect("text");
        let outcome = write_text(&mut doc, &bound, "Sell").expect("override");
        assert_eq!(
            outcome,
            WriteOutcome::Override {
                instance: NodeId::from("i"),
                key: "Label#1".to_string()
            }
        );
        assert_eq!(doc.characters(&NodeId::from("bound")), Some("Sell"));
    }

    #[test]
    fn test_bound_write_without_instance_is_a_bound_skip() {
        let mut doc = MemoryDocument::from_json(DOC).expect("valid document");
        let orphan = doc.text_element(&NodeId::from("orphan")).expect("text");
        let err = write_text(&mut doc, &orphan, "y").unwrap_err();
        assert!(err.is_bound_skip());
        assert_eq!(doc.characters(&NodeId::from("orphan")), Some("x"));
    }
}
