//! Spatial index over a container's text elements
//!
//! Each visible text element is recorded once with its normalized position,
//! then bucketed two ways: by trimmed name, and into a uniform grid keyed by
//! quantized position (optionally extended with quantized size). The grid
//! answers "who is near this point" by scanning a square neighborhood of cells.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::geometry::{
    normalized_size, to_normalized_position, Anchor, NormalizedPoint, NormalizedSize,
};
use crate::host::{ContainerInfo, DocumentHost, HostError, NodeId, TextElement};

/// Options controlling how a container is indexed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    pub cell_size: f64,
    pub use_size: bool,
    pub size_cell_size: f64,
    pub anchor: Anchor,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            cell_size: 0.02,
            use_size: false,
            size_cell_size: 0.04,
            anchor: Anchor::Center,
        }
    }
}

/// A text element together with its container-relative geometry
#[derive(Debug, Clone, PartialEq)]
pub struct PositionInfo {
    pub element: TextElement,
    pub position: NormalizedPoint,
    pub size: Option<NormalizedSize>,
    /// Trimmed element name, empty when the element is unnamed
    pub name_key: String,
}

/// Grid cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinKey {
    pub x: i64,
    pub y: i64,
    /// Quantized normalized width/height, present only with size binning
    pub size: Option<(i64, i64)>,
}

fn quantize(value: f64, cell: f64) -> i64 {
    (value / cell).floor() as i64
}

/// Name and grid lookups for one container, plus the set of already-matched
/// elements for the current run
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    container: ContainerInfo,
    options: IndexOptions,
    entries: Vec<PositionInfo>,
    by_name: HashMap<String, Vec<usize>>,
    by_bin: HashMap<BinKey, Vec<usize>>,
    used: HashSet<NodeId>,
    skipped: usize,
}

impl SpatialIndex {
    fn new(container: ContainerInfo, options: IndexOptions) -> Self {
        Self {
            container,
            options,
            entries: Vec::new(),
            by_name: HashMap::new(),
            by_bin: HashMap::new(),
            used: HashSet::new(),
            skipped: 0,
        }
    }

    fn insert(&mut self, info: PositionInfo) {
        let idx = self.entries.len();
        if !info.name_key.is_empty() {
            self.by_name.entry(info.name_key.clone()).or_default().push(idx);
        }
        let key = self.bin_key(&info.position, info.size.as_ref());
        self.by_bin.entry(key).or_default().push(idx);
        self.entries.push(info);
    }

    /// Grid cell of a position (and size, when size binning is on)
    pub fn bin_key(&self, position: &NormalizedPoint, size: Option<&NormalizedSize>) -> BinKey {
        let size = if self.options.use_size {
            size.map(|s| {
                (
                    quantize(s.nw, self.options.size_cell_size),
                    quantize(s.nh, self.options.size_cell_size),
                )
            })
        } else {
            None
        };
        BinKey {
            x: quantize(position.nx, self.options.cell_size),
            y: quantize(position.ny, self.options.cell_size),
            size,
        }
    }

    pub fn container(&self) -> &ContainerInfo {
        &self.container
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    /// Indexed elements, in enumeration order
    pub fn entries(&self) -> &[PositionInfo] {
        &self.entries
    }

    pub fn get(&self, idx: usize) -> Option<&PositionInfo> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of elements left out because their geometry could not be read
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Entries carrying the given trimmed name
    pub fn named(&self, name_key: &str) -> &[usize] {
        self.by_name.get(name_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entries in the cells around `center`.
    ///
    /// Position cells are scanned `radius` cells out in each direction; size
    /// cells (when present) are always scanned one cell out.
    pub fn neighbors(&self, center: BinKey, radius: i64) -> Vec<usize> {
        let size_offsets: Vec<Option<(i64, i64)>> = match center.size {
            Some((w, h)) => (-1..=1)
                .flat_map(|dw| {
                    (-1..=1).map(move |dh| Some((w.saturating_add(dw), h.saturating_add(dh))))
                })
                .collect(),
            None => vec![None],
        };

        let mut found = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for size in &size_offsets {
                    let key = BinKey {
                        x: center.x.saturating_add(dx),
                        y: center.y.saturating_add(dy),
                        size: *size,
                    };
                    if let Some(bucket) = self.by_bin.get(&key) {
                        found.extend_from_slice(bucket);
                    }
                }
            }
        }
        found
    }

    pub fn is_used(&self, id: &NodeId) -> bool {
        self.used.contains(id)
    }

    /// Claim an element for the rest of the run
    pub fn mark_used(&mut self, id: &NodeId) {
        self.used.insert(id.clone());
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }
}

/// Whether the element and every ancestor up to the container are visible
fn is_effectively_visible<H: DocumentHost + ?Sized>(
    host: &H,
    container: &NodeId,
    element: &TextElement,
) -> Result<bool, HostError> {
    if !element.visible {
        return Ok(false);
    }
    for ancestor in host.ancestors(&element.id)? {
        if ancestor.id == *container {
            break;
        }
        if !ancestor.visible {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Visible text elements of a container in document order, plus the number
/// left out because they could not be read
pub fn visible_text_elements<H: DocumentHost + ?Sized>(
    host: &H,
    container: &NodeId,
) -> Result<(Vec<TextElement>, usize), HostError> {
    let mut elements = Vec::new();
    let mut skipped = 0;

    for id in host.text_descendants(container)? {
        let element = match host.text_element(&id) {
            Ok(element) => element,
            Err(e) => {
                warn!(element = %id, error = %e, "skipping text element");
                skipped += 1;
                continue;
            }
        };

        match is_effectively_visible(host, container, &element) {
            Ok(true) => elements.push(element),
            Ok(false) => {}
            Err(e) => {
                warn!(element = %id, error = %e, "skipping text element");
                skipped += 1;
            }
        }
    }
    Ok((elements, skipped))
}

/// Build the index for one container.
///
/// A single element whose geometry cannot be read is logged and skipped; only
/// a failure to enumerate the container itself is returned as an error.
///
/// # Arguments
/// * `host` - Document to read from
/// * `container` - Container whose visible text descendants are indexed
/// * `options` - Grid cell sizes, anchor and size binning
///
/// # Returns
/// The index, with an empty used set
pub fn build_index<H: DocumentHost + ?Sized>(
    host: &H,
    container: &ContainerInfo,
    options: &IndexOptions,
) -> Result<SpatialIndex, HostError> {
    let mut index = SpatialIndex::new(container.clone(), *options);
    let (elements, skipped) = visible_text_elements(host, &container.id)?;
    index.skipped = skipped;

    for element in elements {
        let position = to_normalized_position(container, &element, options.anchor);
        if !position.is_finite() {
            warn!(element = %element.id, "skipping text element with non-finite position");
            index.skipped += 1;
            continue;
        }
        let size = options
            .use_size
            .then(|| normalized_size(container, &element));
        let name_key = element.name.trim().to_string();

        index.insert(PositionInfo {
            element,
            position,
            size,
            name_key,
        });
    }

    debug!(
        container = %container.id,
        elements = index.len(),
        skipped = index.skipped,
        "indexed container"
    );
    Ok(index)
}
