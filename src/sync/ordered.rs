//! Reading-order sync
//!
//! Texts are read from the source in strict row-then-column order (absolute
//! bounds `y`, then `x`, with no tolerance merging) and assigned one-to-one to
//! the destination's elements in the same order. Nothing checks that the two
//! containers are actually laid out alike.

use std::cmp::Ordering;

use tracing::info;

use crate::error::SyncError;
use crate::host::{DocumentHost, FontLoader, NodeId, TextElement};

use super::commit::commit;
use super::config::SyncRequest;
use super::context::{Phase, RunContext};
use super::controller::resolve_containers;
use super::index::visible_text_elements;
use super::plan::WritePlan;
use super::summary::{RunOutcome, RunSummary};

fn reading_order(a: &TextElement, b: &TextElement) -> Ordering {
    let (a, b) = (a.bounds(), b.bounds());
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}

fn ordered_elements<H: DocumentHost + ?Sized>(
    host: &H,
    container: &NodeId,
) -> Result<Vec<TextElement>, SyncError> {
    let (mut elements, _skipped) = visible_text_elements(host, container)?;
    elements.sort_by(reading_order);
    Ok(elements)
}

/// Visible texts of a container in reading order
pub fn extract_ordered<H: DocumentHost + ?Sized>(
    host: &H,
    container: &NodeId,
) -> Result<Vec<String>, SyncError> {
    Ok(ordered_elements(host, container)?
        .into_iter()
        .map(|e| e.characters)
        .collect())
}

/// Counts from replaying into one container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Elements paired with a source text
    pub assigned: usize,
    pub written: usize,
    pub skipped_locked: usize,
    pub skipped_bound_component: usize,
    pub failed: usize,
    pub cancelled: bool,
}

fn plan_replay<H: DocumentHost + ?Sized>(
    host: &H,
    container: &NodeId,
    texts: &[String],
) -> Result<(WritePlan, ReplayReport), SyncError> {
    let elements = ordered_elements(host, container)?;
    let mut plan = WritePlan::new();
    let mut report = ReplayReport::default();
    for (element, text) in elements.iter().zip(texts) {
        report.assigned += 1;
        plan.queue(host, element, text);
    }
    report.skipped_locked = plan.skipped_locked;
    report.skipped_bound_component = plan.skipped_bound_component;
    report.failed = plan.failed;
    Ok((plan, report))
}

/// Assign `texts[i]` to the i-th element of `container` in reading order.
///
/// Surplus texts or elements are ignored. Elements that already hold their
/// text are not rewritten.
pub async fn replay_ordered<H, F>(
    host: &mut H,
    fonts: &F,
    container: &NodeId,
    texts: &[String],
    batch_size: usize,
    ctx: &RunContext,
) -> Result<ReplayReport, SyncError>
where
    H: DocumentHost + ?Sized,
    F: FontLoader + ?Sized,
{
    let (plan, mut report) = plan_replay(&*host, container, texts)?;
    let committed = commit(host, fonts, plan.pending(), batch_size, ctx).await;
    report.written = committed.written;
    report.failed += committed.failed;
    report.skipped_bound_component += committed.skipped_bound;
    report.cancelled = committed.cancelled;
    Ok(report)
}

/// Replay the source's reading-order texts into every target container
pub async fn run_ordered<H, F>(
    host: &mut H,
    fonts: &F,
    request: &SyncRequest,
    ctx: &RunContext,
) -> Result<RunOutcome, SyncError>
where
    H: DocumentHost + ?Sized,
    F: FontLoader + ?Sized,
{
    ctx.report(0, "Collecting containers");
    let containers = resolve_containers(&*host, request)?;
    ctx.report_phase(Phase::Discovery, 1, 1, "Containers collected");

    let texts = extract_ordered(&*host, &containers.source.id)?;
    ctx.report_phase(
        Phase::IndexSource,
        1,
        1,
        format!("Read {} source texts", texts.len()),
    );

    let mut summary = RunSummary {
        dry_run: request.options.dry_run,
        ..RunSummary::default()
    };
    for target in &containers.targets {
        if ctx.is_cancelled() {
            return Ok(RunOutcome::Cancelled(summary));
        }
        let report = if request.options.dry_run {
            let (plan, mut report) = plan_replay(&*host, &target.id, &texts)?;
            report.written = plan.len();
            report
        } else {
            replay_ordered(
                host,
                fonts,
                &target.id,
                &texts,
                request.options.batch_size,
                ctx,
            )
            .await?
        };
        summary.matched += report.assigned;
        summary.unmatched += texts.len() - report.assigned;
        summary.written += report.written;
        summary.skipped_locked += report.skipped_locked;
        summary.skipped_bound_component += report.skipped_bound_component;
        summary.failed += report.failed;
        if report.cancelled {
            info!(?summary, "ordered sync cancelled");
            return Ok(RunOutcome::Cancelled(summary));
        }
    }

    ctx.report(100, "Done");
    info!(?summary, "ordered sync complete");
    Ok(RunOutcome::Completed(summary))
}
