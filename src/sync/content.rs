//! Unified text resolution for one matched group

use crate::host::TextElement;

/// Text to broadcast for a pivot and its matches.
///
/// The pivot's own text wins when it has any non-whitespace content;
/// otherwise the first matched element (in matching order) with content is
/// used. An empty result means there is nothing to write.
pub fn choose_unified_text(pivot: &TextElement, matched: &[&TextElement]) -> String {
    if !pivot.characters.trim().is_empty() {
        return pivot.characters.clone();
    }
    matched
        .iter()
        .find(|element| !element.characters.trim().is_empty())
        .map(|element| element.characters.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;
    use crate::host::{NodeId, TextKind};
    use pretty_assertions::assert_eq;

    fn text(id: &str, characters: &str) -> TextElement {
        TextElement {
            id: NodeId::from(id),
            name: String::new(),
            characters: characters.to_string(),
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            absolute_transform: Transform::identity(),
            absolute_bounds: None,
            visible: true,
            locked: false,
            kind: TextKind::Literal,
            font: None,
        }
    }

    #[test]
    fn test_pivot_text_wins() {
        let pivot = text("p", "Hello");
        let other = text("a", "World");
        assert_eq!(choose_unified_text(&pivot, &[&other]), "Hello");
    }

    #[test]
    fn test_falls_back_to_first_non_empty_match() {
        let pivot = text("p", "");
        let a = text("a", "");
        let b = text("b", "B");
        let c = text("c", "C");
        assert_eq!(choose_unified_text(&pivot, &[&a, &b, &c]), "B");
    }

    #[test]
    fn test_whitespace_only_counts_as_empty() {
        let pivot = text("p", "   ");
        let a = text("a", "\n\t");
        assert_eq!(choose_unified_text(&pivot, &[&a]), "");
        assert_eq!(choose_unified_text(&pivot, &[]), "");
    }

    #[test]
    fn test_pivot_text_is_kept_verbatim() {
        let pivot = text("p", "  padded  ");
        assert_eq!(choose_unified_text(&pivot, &[]), "  padded  ");
    }
}
