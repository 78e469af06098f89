//! Batched, cancellable commit of planned writes
//!
//! Fonts for every destination are loaded first, then writes are applied in
//! chunks of `batch_size`. The cancel flag is checked before each chunk and
//! before each write; writes already applied stay applied.

use tracing::{info, warn};

use crate::host::{DocumentHost, FontLoader};

use super::context::{Phase, RunContext};
use super::fonts::{collect_fonts, load_fonts};
use super::plan::PendingWrite;
use super::writer::{write_text, WriteOutcome};

/// Counts from one commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub written: usize,
    pub failed: usize,
    pub skipped_bound: usize,
    /// Number of writes routed through a component instance property
    pub overrides: usize,
    pub cancelled: bool,
}

/// Load the fonts of every pending write, then apply the writes in chunks.
///
/// Font failures are logged and only fail the writes that need the font.
/// After each chunk a progress event is reported and the task yields.
///
/// # Arguments
/// * `host` - Document to write to
/// * `fonts` - Loader for the destination fonts
/// * `pending` - Planned writes, in plan order
/// * `batch_size` - Writes per chunk, at least one
/// * `ctx` - Cancel flag and progress sink
///
/// # Returns
/// Counts of written, failed and skipped writes, and whether the commit
/// stopped early on cancellation
pub async fn commit<H, F>(
    host: &mut H,
    fonts: &F,
    pending: &[PendingWrite],
    batch_size: usize,
    ctx: &RunContext,
) -> CommitReport
where
    H: DocumentHost + ?Sized,
    F: FontLoader + ?Sized,
{
    let mut report = CommitReport::default();
    if ctx.is_cancelled() {
        report.cancelled = true;
        return report;
    }

    let needed = collect_fonts(&*host, pending.iter().map(|w| &w.element));
    ctx.report_phase(
        Phase::LoadingFonts,
        0,
        needed.len(),
        format!("Loading {} fonts", needed.len()),
    );
    let loaded = load_fonts(fonts, &needed).await;
    ctx.report_phase(
        Phase::LoadingFonts,
        needed.len(),
        needed.len(),
        format!(
            "Loaded {} fonts ({} failed)",
            loaded.loaded.len(),
            loaded.failed.len()
        ),
    );
    ctx.checkpoint().await;

    let total = pending.len();
    let batch_size = batch_size.max(1);
    let chunks = total.div_ceil(batch_size);
    let mut done = 0;

    'chunks: for (chunk_index, chunk) in pending.chunks(batch_size).enumerate() {
        if ctx.is_cancelled() {
            report.cancelled = true;
            break;
        }
        for write in chunk {
            if ctx.is_cancelled() {
                report.cancelled = true;
                break 'chunks;
            }
            match write_text(host, &write.element, &write.text) {
                Ok(WriteOutcome::Direct) => report.written += 1,
                Ok(WriteOutcome::Override { .. }) => {
                    report.written += 1;
                    report.overrides += 1;
                }
                Err(e) if e.is_bound_skip() => {
                    warn!(
                        element = %write.element.id,
                        "bound text has no matching instance property"
                    );
                    report.skipped_bound += 1;
                }
                Err(e) => {
                    warn!(element = %write.element.id, error = ?e, "write failed");
                    report.failed += 1;
                }
            }
            done += 1;
        }
        ctx.report_phase(
            Phase::Writing,
            done,
            total,
            format!("Wrote chunk {} of {}", chunk_index + 1, chunks),
        );
        ctx.checkpoint().await;
    }

    if report.cancelled {
        info!(written = report.written, remaining = total - done, "commit cancelled");
    }
    report
}
