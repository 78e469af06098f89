//! Pivot-to-target matching
//!
//! For one pivot from the source container, find its counterpart in a target
//! container's index:
//! 1. **Name**: same trimmed name, nearest by normalized distance, within tolerance
//! 2. **Position**: nearest element in the surrounding grid cells, within tolerance
//!
//! An accepted element is marked used in the target index, so no target
//! element is claimed by two pivots in one run. Distance is always measured on
//! `(nx, ny)`; size only narrows which grid cells are scanned.

use tracing::debug;

use super::index::{PositionInfo, SpatialIndex};

/// Which strategies the matcher may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub name_first: bool,
    pub name_only: bool,
    pub pos_only: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            name_first: true,
            name_only: false,
            pos_only: false,
        }
    }
}

/// How a match was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Name,
    Position,
}

/// An accepted match into a target index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Entry index in the target [`SpatialIndex`]
    pub index: usize,
    pub distance: f64,
    pub method: MatchMethod,
}

/// Largest scan radius; any tolerance reaching further scans every entry
pub const MAX_SEARCH_RADIUS: i64 = 1 << 20;

/// Number of grid cells to scan in each direction so that every element
/// within `tolerance` is reached.
///
/// # Arguments
/// * `tolerance` - Largest accepted normalized distance
/// * `cell_size` - Width of one grid cell in normalized units
///
/// # Returns
/// At least one (a 3x3 neighborhood) and at most [`MAX_SEARCH_RADIUS`].
pub fn search_radius(tolerance: f64, cell_size: f64) -> i64 {
    let cells = (tolerance / cell_size).ceil();
    if cells.is_nan() || cells <= 1.0 {
        1
    } else if cells >= MAX_SEARCH_RADIUS as f64 {
        MAX_SEARCH_RADIUS
    } else {
        cells as i64
    }
}

/// Nearest unused candidate; ties go to the earliest-indexed element
fn nearest(
    pivot: &PositionInfo,
    target: &SpatialIndex,
    candidates: impl IntoIterator<Item = usize>,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for idx in candidates {
        let Some(info) = target.get(idx) else {
            continue;
        };
        if target.is_used(&info.element.id) {
            continue;
        }
        let distance = pivot.position.distance_to(&info.position);
        let better = match best {
            None => true,
            Some((best_idx, best_distance)) => {
                distance < best_distance || (distance == best_distance && idx < best_idx)
            }
        };
        if better {
            best = Some((idx, distance));
        }
    }
    best
}

fn within_one_size_cell(a: Option<(i64, i64)>, b: Option<(i64, i64)>) -> bool {
    match (a, b) {
        (Some((aw, ah)), Some((bw, bh))) => aw.abs_diff(bw) <= 1 && ah.abs_diff(bh) <= 1,
        _ => true,
    }
}

fn position_candidates(pivot: &PositionInfo, target: &SpatialIndex, tolerance: f64) -> Vec<usize> {
    let radius = search_radius(tolerance, target.options().cell_size);
    let center = target.bin_key(&pivot.position, pivot.size.as_ref());
    let side = (2 * radius + 1) as usize;
    let size_cells = if center.size.is_some() { 9 } else { 1 };
    let probes = side.saturating_mul(side).saturating_mul(size_cells);

    if probes > target.len() {
        // Fewer entries than cells to probe: filter the entries directly
        return target
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, info)| {
                let key = target.bin_key(&info.position, info.size.as_ref());
                within_one_size_cell(center.size, key.size)
            })
            .map(|(idx, _)| idx)
            .collect();
    }
    target.neighbors(center, radius)
}

/// Find and claim the best counterpart of `pivot` in `target`.
///
/// The name step runs first when enabled and the pivot has a name; the
/// position step runs when the name step found nothing, unless `name_only`
/// is set. Either step accepts a candidate only within `tolerance`
/// (inclusive). The accepted element is marked used in `target`.
///
/// # Arguments
/// * `pivot` - Indexed element from the source container
/// * `target` - Index of one target container, updated with the claim
/// * `tolerance` - Largest accepted normalized distance
/// * `options` - Which steps may run
///
/// # Returns
/// The claimed entry, or `None` when no unused element is close enough.
pub fn find_match(
    pivot: &PositionInfo,
    target: &mut SpatialIndex,
    tolerance: f64,
    options: &MatchOptions,
) -> Option<Match> {
    let try_name = !options.pos_only
        && (options.name_first || options.name_only)
        && !pivot.name_key.is_empty();

    let mut found = None;
    if try_name {
        let named = target.named(&pivot.name_key).to_vec();
        if let Some((idx, distance)) = nearest(pivot, target, named) {
            if distance <= tolerance {
                found = Some(Match {
                    index: idx,
                    distance,
                    method: MatchMethod::Name,
                });
            }
        }
    }

    if found.is_none() && !options.name_only {
        let candidates = position_candidates(pivot, target, tolerance);
        if let Some((idx, distance)) = nearest(pivot, target, candidates) {
            if distance <= tolerance {
                found = Some(Match {
                    index: idx,
                    distance,
                    method: MatchMethod::Position,
                });
            }
        }
    }

    match found {
        Some(m) => {
            if let Some(info) = target.get(m.index) {
                let id = info.element.id.clone();
                debug!(
                    pivot = %pivot.element.id,
                    target = %id,
                    method = ?m.method,
                    distance = m.distance,
                    "matched"
                );
                target.mark_used(&id);
            }
            Some(m)
        }
        None => {
            debug!(pivot = %pivot.element.id, container = %target.container().id, "no match");
            None
        }
    }
}
