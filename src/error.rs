//! Error types for requests, configuration and sync runs

use thiserror::Error;

use crate::host::{HostError, NodeId};

/// A malformed sync request. Raised before any index work begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("at least 2 containers are required, found {found}")]
    TooFewContainers { found: usize },

    #[error("no source container was designated")]
    MissingSource,

    #[error("source container '{id}' is not among the selected containers")]
    SourceNotInContainers { id: NodeId },

    #[error("source container '{id}' has no visible text elements")]
    EmptySource { id: NodeId },

    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid_option(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            name,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur when loading requests, options or documents
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid document: {0}")]
    Document(String),
}

/// Errors that end a sync run
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request was rejected before any work was done
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The host failed outside of per-element work; committed writes remain
    #[error("{0}")]
    Host(#[from] HostError),

    /// The caller's deadline expired before the run finished
    #[error("sync timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Whether the run was rejected before touching the document
    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}
