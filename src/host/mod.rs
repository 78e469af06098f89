//! Host document accessor layer
//!
//! The sync engine never walks a design document directly. Everything it needs
//! from the host (container geometry, text descendants, ancestor chains,
//! text writes, component-instance properties) goes through the narrow
//! [`DocumentHost`] trait, and font loading goes through [`FontLoader`].
//! [`MemoryDocument`] is a serde-loadable implementation of both.

pub mod error;
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, Transform};

pub use error::HostError;
pub use memory::{MemoryDocument, MemoryFontLoader};

/// Opaque, host-assigned node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Kind of a node in the host document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Page,
    Frame,
    Group,
    Component,
    Instance,
    Section,
    Text,
    Shape,
}

impl NodeKind {
    /// Whether nodes of this kind can act as a synchronization container
    pub fn is_groupable(&self) -> bool {
        matches!(
            self,
            NodeKind::Frame
                | NodeKind::Group
                | NodeKind::Component
                | NodeKind::Instance
                | NodeKind::Section
        )
    }
}

/// Whether a text element's value is its own or comes from a component property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextKind {
    #[default]
    Literal,
    /// The characters are bound to a property of an ancestor component instance
    Bound,
}

/// A font family/style pair, the unit of font loading
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Snapshot of a container node
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerInfo {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub width: f64,
    pub height: f64,
    pub absolute_transform: Transform,
}

/// Snapshot of a text element, read once per run
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub id: NodeId,
    pub name: String,
    pub characters: String,
    /// Position relative to the immediate parent
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub absolute_transform: Transform,
    /// Absolute bounding box as reported by the host, if it reports one
    pub absolute_bounds: Option<BoundingBox>,
    pub visible: bool,
    pub locked: bool,
    pub kind: TextKind,
    /// Uniform font of the element, `None` when it mixes several fonts
    pub font: Option<FontName>,
}

impl TextElement {
    /// Absolute bounding box, derived from the transform when the host has none
    pub fn bounds(&self) -> BoundingBox {
        self.absolute_bounds
            .unwrap_or_else(|| self.absolute_transform.apply_to_extent(self.width, self.height))
    }
}

/// Lightweight view of an ancestor node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub visible: bool,
    pub locked: bool,
}

/// Type of a component-instance property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    Boolean,
    InstanceSwap,
    Variant,
}

/// One entry of a component instance's property table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentProperty {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: PropertyKind,
    pub value: String,
}

/// Read/write access to the host document.
///
/// All calls are synchronous; the engine inserts its own suspension points
/// between them.
pub trait DocumentHost {
    /// Look up a node that may serve as a container
    fn container(&self, id: &NodeId) -> Result<ContainerInfo, HostError>;

    /// Ids of all text nodes under the container, in document order
    fn text_descendants(&self, container: &NodeId) -> Result<Vec<NodeId>, HostError>;

    /// Read a snapshot of a text element
    fn text_element(&self, id: &NodeId) -> Result<TextElement, HostError>;

    /// Ancestors of a node, from the immediate parent up to the document root
    fn ancestors(&self, id: &NodeId) -> Result<Vec<NodeSummary>, HostError>;

    /// Assign the characters of a text element directly
    fn set_characters(&mut self, id: &NodeId, text: &str) -> Result<(), HostError>;

    /// Fonts of each styled run of a text element.
    ///
    /// An empty list means the host cannot report run-level fonts.
    fn font_runs(&self, id: &NodeId) -> Result<Vec<FontName>, HostError>;

    /// Font of the character at `index`
    fn font_at(&self, id: &NodeId, index: usize) -> Result<FontName, HostError>;

    /// Property table of a component instance
    fn component_properties(&self, instance: &NodeId) -> Result<Vec<ComponentProperty>, HostError>;

    /// Override one property of a component instance
    fn set_component_property(
        &mut self,
        instance: &NodeId,
        key: &str,
        value: &str,
    ) -> Result<(), HostError>;
}

/// Font loading capability. Unknown fonts fail individually.
#[async_trait]
pub trait FontLoader: Send + Sync {
    async fn load_font(&self, font: &FontName) -> Result<(), HostError>;
}
