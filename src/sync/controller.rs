//! Run orchestration
//!
//! A run moves through container discovery, source indexing, target indexing,
//! matching and planning, then either stops with a preview (dry run) or loads
//! fonts and commits. Validation failures end the run before any indexing;
//! a host error outside per-element work ends it wherever it happens.
//! Cancellation is checked at every pivot, every target and every chunk.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{SyncError, ValidationError};
use crate::host::{ContainerInfo, DocumentHost, FontLoader, HostError, TextElement};

use super::commit::commit;
use super::config::SyncRequest;
use super::content::choose_unified_text;
use super::context::{Phase, RunContext};
use super::index::{build_index, SpatialIndex};
use super::matcher::find_match;
use super::plan::WritePlan;
use super::summary::{RunOutcome, RunSummary};

/// Source and target containers of a validated request
#[derive(Debug, Clone)]
pub(crate) struct ResolvedContainers {
    pub source: ContainerInfo,
    /// In request order
    pub targets: Vec<ContainerInfo>,
}

/// Look up the request's containers and apply the entry guard.
///
/// Ids that do not resolve, or that name a node which cannot hold a group of
/// text elements, are dropped with a warning before the count is checked.
pub(crate) fn resolve_containers<H: DocumentHost + ?Sized>(
    host: &H,
    request: &SyncRequest,
) -> Result<ResolvedContainers, SyncError> {
    request.validate()?;

    let mut seen = HashSet::new();
    let mut containers = Vec::new();
    for id in &request.container_ids {
        if !seen.insert(id.clone()) {
            continue;
        }
        match host.container(id) {
            Ok(info) if info.kind.is_groupable() => containers.push(info),
            Ok(info) => warn!(container = %id, kind = ?info.kind, "ignoring non-groupable node"),
            Err(HostError::NodeNotFound { .. }) => warn!(container = %id, "ignoring unknown node"),
            Err(e) => return Err(e.into()),
        }
    }

    if containers.len() < 2 {
        return Err(ValidationError::TooFewContainers {
            found: containers.len(),
        }
        .into());
    }
    let source_id = request
        .source_container_id
        .as_ref()
        .ok_or(ValidationError::MissingSource)?;
    let source = containers
        .iter()
        .find(|c| c.id == *source_id)
        .cloned()
        .ok_or_else(|| ValidationError::SourceNotInContainers {
            id: source_id.clone(),
        })?;
    let targets = containers
        .into_iter()
        .filter(|c| request.include_source_in_targets || c.id != source.id)
        .collect();

    Ok(ResolvedContainers { source, targets })
}

fn cancelled(summary: RunSummary) -> Result<RunOutcome, SyncError> {
    info!(?summary, "sync cancelled");
    Ok(RunOutcome::Cancelled(summary))
}

/// Run a matching sync from the source container into every target.
pub async fn run_sync<H, F>(
    host: &mut H,
    fonts: &F,
    request: &SyncRequest,
    ctx: &RunContext,
) -> Result<RunOutcome, SyncError>
where
    H: DocumentHost + ?Sized,
    F: FontLoader + ?Sized,
{
    let options = &request.options;
    ctx.report(0, "Collecting containers");
    let containers = resolve_containers(&*host, request)?;
    ctx.report_phase(
        Phase::Discovery,
        1,
        1,
        format!("Found {} target containers", containers.targets.len()),
    );
    info!(
        source = %containers.source.id,
        targets = containers.targets.len(),
        "starting sync"
    );

    let mut summary = RunSummary {
        dry_run: options.dry_run,
        ..RunSummary::default()
    };
    if ctx.is_cancelled() {
        return cancelled(summary);
    }

    // Source index
    let index_options = options.index_options();
    let source_index = build_index(&*host, &containers.source, &index_options)?;
    if source_index.is_empty() {
        return Err(ValidationError::EmptySource {
            id: containers.source.id.clone(),
        }
        .into());
    }
    ctx.report_phase(
        Phase::IndexSource,
        1,
        1,
        format!("Indexed {} source elements", source_index.len()),
    );
    ctx.checkpoint().await;

    // Target indices, in request order
    let target_count = containers.targets.len();
    let mut target_indices: Vec<SpatialIndex> = Vec::with_capacity(target_count);
    for (i, target) in containers.targets.iter().enumerate() {
        if ctx.is_cancelled() {
            return cancelled(summary);
        }
        target_indices.push(build_index(&*host, target, &index_options)?);
        ctx.report_phase(
            Phase::IndexTargets,
            i + 1,
            target_count,
            format!("Indexed container {} of {}", i + 1, target_count),
        );
    }
    ctx.checkpoint().await;

    // Matching and planning
    let match_options = options.match_options();
    let mut plan = WritePlan::new();
    let pivot_count = source_index.len();
    for (n, pivot) in source_index.entries().iter().enumerate() {
        if ctx.is_cancelled() {
            return cancelled(summary);
        }

        let mut hits: Vec<(usize, usize)> = Vec::new();
        for (t, target_index) in target_indices.iter_mut().enumerate() {
            if ctx.is_cancelled() {
                return cancelled(summary);
            }
            match find_match(pivot, target_index, request.tolerance, &match_options) {
                Some(m) => {
                    summary.matched += 1;
                    hits.push((t, m.index));
                }
                None => summary.unmatched += 1,
            }
        }

        if !hits.is_empty() {
            let matched: Vec<&TextElement> = hits
                .iter()
                .filter_map(|&(t, idx)| target_indices[t].get(idx))
                .map(|info| &info.element)
                .collect();
            let text = choose_unified_text(&pivot.element, &matched);
            if text.trim().is_empty() {
                debug!(pivot = %pivot.element.id, "nothing to write for group");
            } else {
                // The source container is read, never written
                let writable = hits
                    .iter()
                    .filter(|&&(t, _)| target_indices[t].container().id != containers.source.id)
                    .filter_map(|&(t, idx)| target_indices[t].get(idx));
                for info in writable {
                    plan.queue(&*host, &info.element, &text);
                }
            }
        }

        ctx.report_phase(
            Phase::Matching,
            n + 1,
            pivot_count,
            format!("Matched {} of {} elements", n + 1, pivot_count),
        );
        ctx.checkpoint().await;
    }

    summary.skipped_locked = plan.skipped_locked;
    summary.skipped_bound_component = plan.skipped_bound_component;
    summary.failed = plan.failed;

    if options.dry_run {
        summary.written = plan.len();
        ctx.report(100, "Preview ready");
        info!(?summary, "sync preview");
        return Ok(RunOutcome::Completed(summary));
    }
    if ctx.is_cancelled() {
        return cancelled(summary);
    }

    let pending = plan.into_pending();
    let report = commit(host, fonts, &pending, options.batch_size, ctx).await;
    summary.written = report.written;
    summary.failed += report.failed;
    summary.skipped_bound_component += report.skipped_bound;
    if report.cancelled {
        return cancelled(summary);
    }

    ctx.report(100, "Done");
    info!(?summary, overrides = report.overrides, "sync complete");
    Ok(RunOutcome::Completed(summary))
}

/// Run a matching sync, giving up once `deadline` has passed.
///
/// Writes committed before the deadline stay in place.
pub async fn run_with_deadline<H, F>(
    host: &mut H,
    fonts: &F,
    request: &SyncRequest,
    ctx: &RunContext,
    deadline: Duration,
) -> Result<RunOutcome, SyncError>
where
    H: DocumentHost + ?Sized,
    F: FontLoader + ?Sized,
{
    match tokio::time::timeout(deadline, run_sync(host, fonts, request, ctx)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(seconds = deadline.as_secs_f64(), "sync deadline expired");
            Err(SyncError::Timeout {
                seconds: deadline.as_secs_f64(),
            })
        }
    }
}
