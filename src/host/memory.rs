//! In-memory host document
//!
//! A plain node tree loaded from JSON. It enforces the same write rules a
//! design tool host does (fonts must be loaded before text edits, bound text
//! only changes through its component instance) so the engine can be run and
//! tested without a live editor.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::Transform;

use super::{
    ComponentProperty, ContainerInfo, DocumentHost, FontLoader, FontName, HostError, NodeId,
    NodeKind, NodeSummary, PropertyKind, TextElement, TextKind,
};

/// Serialized form of a whole document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub nodes: Vec<NodeRecord>,
    /// Fonts the loader reports as missing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable_fonts: Vec<FontName>,
    /// Simulate a host that cannot report styled runs
    #[serde(default, skip_serializing_if = "is_false")]
    pub run_fonts_unavailable: bool,
}

/// Serialized form of one node and its subtree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    /// Clockwise rotation in degrees around the node's origin
    #[serde(default, skip_serializing_if = "is_zero")]
    pub rotation: f64,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub scale_x: f64,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub scale_y: f64,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub font_runs: Vec<FontRun>,
    /// Key of the ancestor instance property this text is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound_property: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ComponentProperty>,
    /// Reads of this node fail (geometry for text, enumeration for containers)
    #[serde(default, skip_serializing_if = "is_false")]
    pub unreadable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

/// A styled range of characters, `start..end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRun {
    pub start: usize,
    pub end: usize,
    pub font: FontName,
}

fn default_true() -> bool {
    true
}

fn one() -> f64 {
    1.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

fn is_one(value: &f64) -> bool {
    *value == 1.0
}

#[derive(Debug, Default)]
struct FontRegistry {
    loaded: HashSet<FontName>,
    unavailable: HashSet<FontName>,
}

type SharedFonts = Arc<Mutex<FontRegistry>>;

fn lock_fonts(fonts: &SharedFonts) -> Result<std::sync::MutexGuard<'_, FontRegistry>, HostError> {
    fonts
        .lock()
        .map_err(|_| HostError::Other("font registry lock poisoned".to_string()))
}

#[derive(Debug, Clone)]
struct MemoryNode {
    record: NodeRecord,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory implementation of [`DocumentHost`]
#[derive(Debug)]
pub struct MemoryDocument {
    nodes: HashMap<NodeId, MemoryNode>,
    roots: Vec<NodeId>,
    fonts: SharedFonts,
    run_fonts_unavailable: bool,
    writes: usize,
}

impl MemoryDocument {
    /// Build a document from its serialized form
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, ConfigError> {
        let mut doc = MemoryDocument {
            nodes: HashMap::new(),
            roots: Vec::new(),
            fonts: Arc::new(Mutex::new(FontRegistry {
                loaded: HashSet::new(),
                unavailable: snapshot.unavailable_fonts.into_iter().collect(),
            })),
            run_fonts_unavailable: snapshot.run_fonts_unavailable,
            writes: 0,
        };
        for node in snapshot.nodes {
            let id = doc.insert(node, None)?;
            doc.roots.push(id);
        }
        Ok(doc)
    }

    /// Parse a document from JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let snapshot: DocumentSnapshot = serde_json::from_str(content)?;
        Self::from_snapshot(snapshot)
    }

    /// Load a document from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn insert(
        &mut self,
        mut record: NodeRecord,
        parent: Option<NodeId>,
    ) -> Result<NodeId, ConfigError> {
        let id = record.id.clone();
        if self.nodes.contains_key(&id) {
            return Err(ConfigError::Document(format!("duplicate node id '{}'", id)));
        }
        let children = std::mem::take(&mut record.children);
        self.nodes.insert(
            id.clone(),
            MemoryNode {
                record,
                parent,
                children: Vec::new(),
            },
        );
        let mut child_ids = Vec::with_capacity(children.len());
        for child in children {
            child_ids.push(self.insert(child, Some(id.clone()))?);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = child_ids;
        }
        Ok(id)
    }

    /// Serialize the current state back to its snapshot form
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        let unavailable_fonts = lock_fonts(&self.fonts)
            .map(|fonts| {
                let mut list: Vec<FontName> = fonts.unavailable.iter().cloned().collect();
                list.sort();
                list
            })
            .unwrap_or_default();
        DocumentSnapshot {
            nodes: self.roots.iter().filter_map(|id| self.rebuild(id)).collect(),
            unavailable_fonts,
            run_fonts_unavailable: self.run_fonts_unavailable,
        }
    }

    fn rebuild(&self, id: &NodeId) -> Option<NodeRecord> {
        let node = self.nodes.get(id)?;
        let mut record = node.record.clone();
        record.children = node.children.iter().filter_map(|c| self.rebuild(c)).collect();
        Some(record)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.to_snapshot())?)
    }

    /// Ids of the top-level nodes, in document order
    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    /// Current characters of a text node
    pub fn characters(&self, id: &NodeId) -> Option<&str> {
        self.nodes.get(id)?.record.characters.as_deref()
    }

    /// Number of successful text mutations so far
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Fonts loaded so far, sorted
    pub fn loaded_fonts(&self) -> Vec<FontName> {
        let mut list: Vec<FontName> = lock_fonts(&self.fonts)
            .map(|fonts| fonts.loaded.iter().cloned().collect())
            .unwrap_or_default();
        list.sort();
        list
    }

    /// A font loader that shares this document's font registry
    pub fn font_loader(&self) -> MemoryFontLoader {
        MemoryFontLoader {
            fonts: Arc::clone(&self.fonts),
        }
    }

    fn node(&self, id: &NodeId) -> Result<&MemoryNode, HostError> {
        self.nodes.get(id).ok_or_else(|| HostError::not_found(id))
    }

    fn text_node(&self, id: &NodeId) -> Result<&MemoryNode, HostError> {
        let node = self.node(id)?;
        if node.record.kind != NodeKind::Text {
            return Err(HostError::NotAText { id: id.clone() });
        }
        Ok(node)
    }

    fn local_transform(record: &NodeRecord) -> Transform {
        Transform::translate(record.x, record.y)
            .then_apply_to(&Transform::rotate(record.rotation))
            .then_apply_to(&Transform::scale(record.scale_x, record.scale_y))
    }

    fn absolute_transform(&self, id: &NodeId) -> Result<Transform, HostError> {
        let node = self.node(id)?;
        let local = Self::local_transform(&node.record);
        match &node.parent {
            Some(parent) => Ok(self.absolute_transform(parent)?.then_apply_to(&local)),
            None => Ok(local),
        }
    }

    fn fonts_of(record: &NodeRecord) -> Vec<FontName> {
        let mut fonts: Vec<FontName> = record.font_runs.iter().map(|r| r.font.clone()).collect();
        if let Some(font) = &record.font {
            fonts.push(font.clone());
        }
        fonts.sort();
        fonts.dedup();
        fonts
    }

    fn uniform_font(record: &NodeRecord) -> Option<FontName> {
        match record.font_runs.split_first() {
            Some((first, rest)) => rest
                .iter()
                .all(|r| r.font == first.font)
                .then(|| first.font.clone()),
            None => record.font.clone(),
        }
    }

    fn collect_text(&self, id: &NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        for child in &node.children {
            match self.nodes.get(child) {
                Some(c) if c.record.kind == NodeKind::Text => out.push(child.clone()),
                Some(_) => self.collect_text(child, out),
                None => {}
            }
        }
    }

    fn propagate_property(&mut self, instance: &NodeId, key: &str, value: &str) {
        let mut bound = Vec::new();
        self.collect_text(instance, &mut bound);
        for id in bound {
            if let Some(node) = self.nodes.get_mut(&id) {
                if node.record.bound_property.as_deref() == Some(key) {
                    node.record.characters = Some(value.to_string());
                }
            }
        }
    }
}

impl DocumentHost for MemoryDocument {
    fn container(&self, id: &NodeId) -> Result<ContainerInfo, HostError> {
        let node = self.node(id)?;
        Ok(ContainerInfo {
            id: id.clone(),
            name: node.record.name.clone(),
            kind: node.record.kind,
            width: node.record.width,
            height: node.record.height,
            absolute_transform: self.absolute_transform(id)?,
        })
    }

    fn text_descendants(&self, container: &NodeId) -> Result<Vec<NodeId>, HostError> {
        let node = self.node(container)?;
        if node.record.unreadable {
            return Err(HostError::Other(format!(
                "cannot enumerate children of '{}'",
                container
            )));
        }
        let mut out = Vec::new();
        self.collect_text(container, &mut out);
        Ok(out)
    }

    fn text_element(&self, id: &NodeId) -> Result<TextElement, HostError> {
        let node = self.text_node(id)?;
        let record = &node.record;
        if record.unreadable {
            return Err(HostError::Geometry {
                id: id.clone(),
                reason: "transform unavailable".to_string(),
            });
        }
        Ok(TextElement {
            id: id.clone(),
            name: record.name.clone(),
            characters: record.characters.clone().unwrap_or_default(),
            x: record.x,
            y: record.y,
            width: record.width,
            height: record.height,
            absolute_transform: self.absolute_transform(id)?,
            absolute_bounds: None,
            visible: record.visible,
            locked: record.locked,
            kind: if record.bound_property.is_some() {
                TextKind::Bound
            } else {
                TextKind::Literal
            },
            font: Self::uniform_font(record),
        })
    }

    fn ancestors(&self, id: &NodeId) -> Result<Vec<NodeSummary>, HostError> {
        let mut chain = Vec::new();
        let mut current = self.node(id)?.parent.clone();
        while let Some(parent_id) = current {
            let parent = self.node(&parent_id)?;
            chain.push(NodeSummary {
                id: parent_id.clone(),
                name: parent.record.name.clone(),
                kind: parent.record.kind,
                visible: parent.record.visible,
                locked: parent.record.locked,
            });
            current = parent.parent.clone();
        }
        Ok(chain)
    }

    fn set_characters(&mut self, id: &NodeId, text: &str) -> Result<(), HostError> {
        let record = &self.text_node(id)?.record;
        if record.bound_property.is_some() {
            return Err(HostError::not_editable(id, "bound to a component property"));
        }
        {
            let fonts = lock_fonts(&self.fonts)?;
            if let Some(missing) = Self::fonts_of(record)
                .into_iter()
                .find(|f| !fonts.loaded.contains(f))
            {
                return Err(HostError::FontNotLoaded {
                    id: id.clone(),
                    family: missing.family,
                    style: missing.style,
                });
            }
        }
        let node = self.nodes.get_mut(id).ok_or_else(|| HostError::not_found(id))?;
        let record = &mut node.record;
        if let Some(first) = record.font_runs.first().map(|r| r.font.clone()) {
            record.font_runs = vec![FontRun {
                start: 0,
                end: text.chars().count(),
                font: first.clone(),
            }];
            record.font = Some(first);
        }
        record.characters = Some(text.to_string());
        self.writes += 1;
        Ok(())
    }

    fn font_runs(&self, id: &NodeId) -> Result<Vec<FontName>, HostError> {
        let record = &self.text_node(id)?.record;
        if self.run_fonts_unavailable {
            return Ok(Vec::new());
        }
        if record.font_runs.is_empty() {
            return Ok(record.font.iter().cloned().collect());
        }
        Ok(record.font_runs.iter().map(|r| r.font.clone()).collect())
    }

    fn font_at(&self, id: &NodeId, index: usize) -> Result<FontName, HostError> {
        let record = &self.text_node(id)?.record;
        record.font_runs
            .iter()
            .find(|r| r.start <= index && index < r.end)
            .map(|r| r.font.clone())
            .or_else(|| record.font.clone())
            .ok_or_else(|| HostError::Other(format!("no font at index {} of '{}'", index, id)))
    }

    fn component_properties(&self, instance: &NodeId) -> Result<Vec<ComponentProperty>, HostError> {
        let node = self.node(instance)?;
        if node.record.kind != NodeKind::Instance {
            return Err(HostError::Other(format!(
                "'{}' is not a component instance",
                instance
            )));
        }
        Ok(node.record.properties.clone())
    }

    fn set_component_property(
        &mut self,
        instance: &NodeId,
        key: &str,
        value: &str,
    ) -> Result<(), HostError> {
        let node = self
            .nodes
            .get_mut(instance)
            .ok_or_else(|| HostError::not_found(instance))?;
        let property = node
            .record
            .properties
            .iter_mut()
            .find(|p| p.key == key)
            .ok_or_else(|| HostError::PropertyNotFound {
                instance: instance.clone(),
                key: key.to_string(),
            })?;
        if property.kind != PropertyKind::Text {
            return Err(HostError::Other(format!(
                "property '{}' of '{}' is not a text property",
                key, instance
            )));
        }
        property.value = value.to_string();
        self.propagate_property(instance, key, value);
        self.writes += 1;
        Ok(())
    }
}

/// Font loader backed by a [`MemoryDocument`]'s registry
#[derive(Debug, Clone)]
pub struct MemoryFontLoader {
    fonts: SharedFonts,
}

#[async_trait]
impl FontLoader for MemoryFontLoader {
    async fn load_font(&self, font: &FontName) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        let mut fonts = lock_fonts(&self.fonts)?;
        if fonts.unavailable.contains(font) {
            return Err(HostError::FontUnavailable {
                family: font.family.clone(),
                style: font.style.clone(),
            });
        }
        fonts.loaded.insert(font.clone());
        Ok(())
    }
}
