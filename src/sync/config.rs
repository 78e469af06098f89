//! Request and option types for a sync run
//!
//! Options can be built in code with the `with_*` builder methods, read from a
//! TOML file, or arrive inside a JSON request. Every key is optional; missing
//! keys take the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};
use crate::geometry::Anchor;
use crate::host::NodeId;

use super::index::IndexOptions;
use super::matcher::MatchOptions;

/// Default match tolerance, in normalized container units
pub const DEFAULT_TOLERANCE: f64 = 0.1;

/// Tuning options for indexing, matching and committing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    /// Grid cell size for position binning
    #[serde(rename = "cell")]
    pub cell_size: f64,

    /// Also bin by normalized element size
    pub use_size: bool,

    /// Grid cell size for size binning
    #[serde(rename = "sizeCell")]
    pub size_cell_size: f64,

    /// Point of an element used as its position
    pub anchor: Anchor,

    /// Try same-named elements before falling back to position
    pub name_first: bool,

    /// Only match same-named elements
    pub name_only: bool,

    /// Ignore names entirely
    pub pos_only: bool,

    /// Number of writes per chunk between yields
    pub batch_size: usize,

    /// Stop after planning and report projected counts
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            cell_size: 0.02,
            use_size: false,
            size_cell_size: 0.04,
            anchor: Anchor::Center,
            name_first: true,
            name_only: false,
            pos_only: false,
            batch_size: 100,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    /// Create a new set of options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load options from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_cell_size(mut self, cell_size: f64) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Enable size binning with the given size cell
    pub fn with_size_binning(mut self, size_cell_size: f64) -> Self {
        self.use_size = true;
        self.size_cell_size = size_cell_size;
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_name_first(mut self, name_first: bool) -> Self {
        self.name_first = name_first;
        self
    }

    pub fn with_name_only(mut self, name_only: bool) -> Self {
        self.name_only = name_only;
        self
    }

    pub fn with_pos_only(mut self, pos_only: bool) -> Self {
        self.pos_only = pos_only;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            cell_size: self.cell_size,
            use_size: self.use_size,
            size_cell_size: self.size_cell_size,
            anchor: self.anchor,
        }
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions {
            name_first: self.name_first,
            name_only: self.name_only,
            pos_only: self.pos_only,
        }
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ValidationError::invalid_option("cell", "must be a positive number"));
        }
        if self.use_size && !(self.size_cell_size.is_finite() && self.size_cell_size > 0.0) {
            return Err(ValidationError::invalid_option(
                "sizeCell",
                "must be a positive number",
            ));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::invalid_option("batchSize", "must be at least 1"));
        }
        if self.name_only && self.pos_only {
            return Err(ValidationError::invalid_option(
                "nameOnly",
                "cannot be combined with posOnly",
            ));
        }
        Ok(())
    }
}

/// A request to synchronize text across containers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub container_ids: Vec<NodeId>,
    #[serde(default)]
    pub source_container_id: Option<NodeId>,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub include_source_in_targets: bool,
    #[serde(default)]
    pub options: SyncOptions,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

impl SyncRequest {
    /// Create a request with default tolerance and options
    pub fn new(container_ids: Vec<NodeId>, source: impl Into<NodeId>) -> Self {
        Self {
            container_ids,
            source_container_id: Some(source.into()),
            tolerance: DEFAULT_TOLERANCE,
            include_source_in_targets: false,
            options: SyncOptions::default(),
        }
    }

    /// Parse a request from JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_source_in_targets(mut self, include: bool) -> Self {
        self.include_source_in_targets = include;
        self
    }

    /// Check tolerance and options; container checks need the host
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ValidationError::invalid_option(
                "tolerance",
                "must be a positive number",
            ));
        }
        self.options.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert_eq!(options.cell_size, 0.02);
        assert_eq!(options.size_cell_size, 0.04);
        assert_eq!(options.batch_size, 100);
        assert!(options.name_first);
        assert!(!options.use_size);
        assert!(!options.dry_run);
        assert_eq!(options.anchor, Anchor::Center);
    }

    #[test]
    fn test_builder_pattern() {
        let options = SyncOptions::new()
            .with_cell_size(0.05)
            .with_size_binning(0.1)
            .with_batch_size(10)
            .with_dry_run(true);
        assert_eq!(options.cell_size, 0.05);
        assert!(options.use_size);
        assert_eq!(options.size_cell_size, 0.1);
        assert_eq!(options.batch_size, 10);
        assert!(options.dry_run);
    }

    #[test]
    fn test_parse_toml_partial() {
        let options = SyncOptions::from_toml(
            r#"
cell = 0.06
nameOnly = true
anchor = "top_left"
"#,
        )
        .expect("Should parse");
        assert_eq!(options.cell_size, 0.06);
        assert!(options.name_only);
        assert_eq!(options.anchor, Anchor::TopLeft);
        assert_eq!(options.batch_size, 100);
    }

    #[test]
    fn test_invalid_toml_error() {
        assert!(SyncOptions::from_toml("cell = [[[").is_err());
    }

    #[test]
    fn test_parse_json_request() {
        let request = SyncRequest::from_json(
            r#"{
                "containerIds": ["1:1", "1:2"],
                "sourceContainerId": "1:1",
                "options": { "batchSize": 5, "dryRun": true, "anchor": "topLeft" }
            }"#,
        )
        .expect("Should parse");
        assert_eq!(request.container_ids, vec![NodeId::from("1:1"), NodeId::from("1:2")]);
        assert_eq!(request.source_container_id, Some(NodeId::from("1:1")));
        assert_eq!(request.tolerance, DEFAULT_TOLERANCE);
        assert!(!request.include_source_in_targets);
        assert_eq!(request.options.batch_size, 5);
        assert!(request.options.dry_run);
        assert_eq!(request.options.anchor, Anchor::TopLeft);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let request = SyncRequest::new(vec![], "a").with_tolerance(0.0);
        assert!(matches!(
            request.validate(),
            Err(ValidationError::InvalidOption { name: "tolerance", .. })
        ));

        let options = SyncOptions::new().with_batch_size(0);
        assert!(options.validate().is_err());

        let options = SyncOptions::new().with_name_only(true).with_pos_only(true);
        assert!(options.validate().is_err());
    }
}
