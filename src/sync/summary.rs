//! Run results

use serde::Serialize;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Accepted (pivot, target container) matches
    pub matched: usize,
    /// Writes applied, or projected writes for a dry run
    pub written: usize,
    /// (pivot, target container) pairs with no acceptable match
    pub unmatched: usize,
    pub skipped_locked: usize,
    pub skipped_bound_component: usize,
    /// Writes that failed for any other reason
    pub failed: usize,
    pub dry_run: bool,
}

impl RunSummary {
    /// One-line message for the user
    pub fn notification(&self) -> String {
        let label = if self.dry_run {
            "Sync preview"
        } else {
            "Sync complete"
        };
        let mut message = format!(
            "{}: matched {}, written {}, unmatched {}",
            label, self.matched, self.written, self.unmatched
        );
        if self.failed > 0 {
            message.push_str(&format!(", failed {}", self.failed));
        }
        if self.skipped_locked > 0 || self.skipped_bound_component > 0 {
            message.push_str(&format!(
                " (skipped: locked {}, component {})",
                self.skipped_locked, self.skipped_bound_component
            ));
        }
        message
    }
}

/// Terminal outcome of a run that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Stopped by the cancel flag; counts cover work done before it was seen
    Cancelled(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(summary) | RunOutcome::Cancelled(summary) => summary,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled(_))
    }

    pub fn notification(&self) -> String {
        match self {
            RunOutcome::Completed(summary) => summary.notification(),
            RunOutcome::Cancelled(summary) => {
                format!("Sync cancelled: {} written before stopping", summary.written)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_notification() {
        let summary = RunSummary {
            matched: 3,
            written: 2,
            unmatched: 1,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.notification(),
            "Sync complete: matched 3, written 2, unmatched 1"
        );
    }

    #[test]
    fn test_notification_adds_skip_note() {
        let summary = RunSummary {
            matched: 4,
            written: 1,
            skipped_locked: 2,
            skipped_bound_component: 1,
            failed: 1,
            ..RunSummary::default()
        };
        assert_eq!(
            summary.notification(),
            "Sync complete: matched 4, written 1, unmatched 0, failed 1 (skipped: locked 2, component 1)"
        );
    }

    #[test]
    fn test_preview_and_cancel_wording() {
        let preview = RunSummary {
            written: 5,
            dry_run: true,
            ..RunSummary::default()
        };
        assert!(preview.notification().starts_with("Sync preview:"));

        let cancelled = RunOutcome::Cancelled(RunSummary {
            written: 7,
            ..RunSummary::default()
        });
        assert!(cancelled.is_cancelled());
        assert_eq!(
            cancelled.notification(),
            "Sync cancelled: 7 written before stopping"
        );
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let json = serde_json::to_value(RunSummary::default()).expect("serialize");
        assert!(json.get("skippedBoundComponent").is_some());
        assert!(json.get("dryRun").is_some());
    }
}
