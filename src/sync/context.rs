//! Per-run cancellation and progress reporting
//!
//! A [`RunContext`] is built once per run and passed by reference into every
//! phase. Cancellation is cooperative: phases poll [`RunContext::is_cancelled`]
//! at loop boundaries, so a write already in flight always completes.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Shared cancellation handle. Clone it to hand to a UI or signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One progress update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub percentage: u8,
    pub message: String,
}

/// Receiver of progress updates
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        if self.send(event).is_err() {
            tracing::trace!("progress receiver dropped");
        }
    }
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

struct CallbackSink<F>(F);

impl<F> ProgressSink for CallbackSink<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        (self.0)(event)
    }
}

/// Wrap a closure as a progress sink
pub fn progress_fn<F>(callback: F) -> impl ProgressSink
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    CallbackSink(callback)
}

/// Fixed slice of the 0..=100 progress scale owned by one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovery,
    IndexSource,
    IndexTargets,
    Matching,
    LoadingFonts,
    Writing,
}

impl Phase {
    pub fn range(self) -> (u8, u8) {
        match self {
            Phase::Discovery => (0, 10),
            Phase::IndexSource => (10, 20),
            Phase::IndexTargets => (20, 30),
            Phase::Matching => (30, 70),
            Phase::LoadingFonts => (70, 80),
            Phase::Writing => (80, 99),
        }
    }

    /// Percentage after `done` of `total` units of this phase
    pub fn percentage(self, done: usize, total: usize) -> u8 {
        let (start, end) = self.range();
        if total == 0 {
            return end;
        }
        let span = f64::from(end - start);
        let fraction = (done.min(total) as f64) / (total as f64);
        start + (span * fraction).floor() as u8
    }
}

/// Cancellation flag plus progress sink for a single run
pub struct RunContext {
    cancel: CancelFlag,
    sink: Box<dyn ProgressSink>,
    last_percentage: AtomicU8,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("last_percentage", &self.last_percentage.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(CancelFlag::new(), NoProgress)
    }
}

impl RunContext {
    pub fn new(cancel: CancelFlag, sink: impl ProgressSink + 'static) -> Self {
        Self {
            cancel,
            sink: Box::new(sink),
            last_percentage: AtomicU8::new(0),
        }
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Report progress. Percentages never go backwards and never exceed 100.
    pub fn report(&self, percentage: u8, message: impl Into<String>) {
        let requested = percentage.min(100);
        let previous = self.last_percentage.fetch_max(requested, Ordering::SeqCst);
        self.sink.report(ProgressEvent {
            percentage: previous.max(requested),
            message: message.into(),
        });
    }

    /// Report progress within a phase's slice of the scale
    pub fn report_phase(
        &self,
        phase: Phase,
        done: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        self.report(phase.percentage(done, total), message);
    }

    /// Suspension point so the host can deliver progress and cancel requests
    pub async fn checkpoint(&self) {
        tokio::task::yield_now().await;
    }
}
