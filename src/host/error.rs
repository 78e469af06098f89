//! Error types reported by the host document layer

use thiserror::Error;

use super::NodeId;

/// Failures raised by a [`DocumentHost`](super::DocumentHost) or
/// [`FontLoader`](super::FontLoader).
///
/// The sync engine treats most of these as recoverable per-element failures;
/// only errors raised outside per-element work end a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    /// The id does not resolve to a node
    #[error("node '{id}' not found")]
    NodeNotFound { id: NodeId },

    /// The node exists but is not a text element
    #[error("node '{id}' is not a text element")]
    NotAText { id: NodeId },

    /// Direct text assignment was refused
    #[error("node '{id}' is not editable: {reason}")]
    NotEditable { id: NodeId, reason: String },

    /// A write was attempted before the element's font was loaded
    #[error("font '{family} {style}' must be loaded before editing '{id}'")]
    FontNotLoaded {
        id: NodeId,
        family: String,
        style: String,
    },

    /// The font could not be loaded
    #[error("font '{family} {style}' is unavailable")]
    FontUnavailable { family: String, style: String },

    /// A component property key does not exist on the instance
    #[error("instance '{instance}' has no property '{key}'")]
    PropertyNotFound { instance: NodeId, key: String },

    /// Geometry could not be read for the node
    #[error("cannot read geometry of '{id}': {reason}")]
    Geometry { id: NodeId, reason: String },

    /// Any other failure reported by the host
    #[error("host error: {0}")]
    Other(String),
}

impl HostError {
    pub fn not_found(id: &NodeId) -> Self {
        Self::NodeNotFound { id: id.clone() }
    }

    pub fn not_editable(id: &NodeId, reason: impl Into<String>) -> Self {
        Self::NotEditable {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_editable_display() {
        let err = HostError::not_editable(&NodeId::from("12:4"), "bound to component property");
        assert_eq!(
            err.to_string(),
            "node '12:4' is not editable: bound to component property"
        );
    }

    #[test]
    fn test_font_not_loaded_display() {
        let err = HostError::FontNotLoaded {
            id: NodeId::from("1:2"),
            family: "Inter".to_string(),
            style: "Bold".to_string(),
        };
        assert!(err.to_string().contains("Inter Bold"));
    }
}
