//! Text synchronization engine
//!
//! A run indexes the source container and every target, pairs each source
//! pivot with at most one element per target, resolves the text to broadcast,
//! and commits the resulting writes in cancellable chunks.

pub mod commit;
pub mod config;
pub mod content;
pub mod context;
pub mod controller;
pub mod fonts;
pub mod index;
pub mod matcher;
pub mod ordered;
pub mod plan;
pub mod summary;
pub mod writer;

pub use commit::{commit, CommitReport};
pub use config::{SyncOptions, SyncRequest, DEFAULT_TOLERANCE};
pub use content::choose_unified_text;
pub use context::{
    progress_fn, CancelFlag, NoProgress, Phase, ProgressEvent, ProgressSink, RunContext,
};
pub use controller::{run_sync, run_with_deadline};
pub use fonts::{collect_fonts, load_fonts, FontLoadReport};
pub use index::{build_index, IndexOptions, PositionInfo, SpatialIndex};
pub use matcher::{find_match, Match, MatchMethod, MatchOptions};
pub use ordered::{extract_ordered, replay_ordered, run_ordered, ReplayReport};
pub use plan::{PendingWrite, WritePlan};
pub use summary::{RunOutcome, RunSummary};
pub use writer::{write_text, WriteError, WriteOutcome};
