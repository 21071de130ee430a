//! Toast messages produced from engine results.

use chrono::Utc;
use polisa_core::{NetworkError, Timestamp};

use crate::import::{AbortReason, ImportOutcome};
use crate::pool::ApprovalRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn network(err: &NetworkError) -> Self {
        Self::new(NotificationLevel::Error, format!("Request failed: {}", err))
    }

    /// `None` for an ignored confirm, which needs no toast.
    pub fn import(outcome: &ImportOutcome) -> Option<Self> {
        match outcome {
            ImportOutcome::Completed(progress) => {
                let level = if progress.failed_count > 0 {
                    NotificationLevel::Warning
                } else {
                    NotificationLevel::Success
                };
                Some(Self::new(
                    level,
                    format!(
                        "Import finished: {} imported, {} duplicates, {} failed",
                        progress.success_count, progress.duplicate_count, progress.failed_count
                    ),
                ))
            }
            ImportOutcome::Aborted { progress, reason } => {
                let cause = match reason {
                    AbortReason::Cancelled => "cancelled".to_string(),
                    AbortReason::Network(err) => err.to_string(),
                    AbortReason::Overrun { skip, .. } => {
                        format!("backend still had batches at row {}", skip)
                    }
                };
                Some(Self::new(
                    NotificationLevel::Error,
                    format!(
                        "Import stopped after {} of {} rows ({}): {} imported, {} duplicates, {} failed",
                        progress.processed_so_far,
                        progress.total,
                        cause,
                        progress.success_count,
                        progress.duplicate_count,
                        progress.failed_count
                    ),
                ))
            }
            ImportOutcome::Ignored(_) => None,
        }
    }

    pub fn approvals(run: &ApprovalRun) -> Self {
        let tally = &run.tally;
        match &run.interrupted {
            Some(err) => Self::new(
                NotificationLevel::Error,
                format!(
                    "Approval interrupted ({}): {} approved, {} failed, {} not sent",
                    err,
                    tally.success_count,
                    tally.failed_count,
                    run.unsent.len()
                ),
            ),
            None if tally.failed_count > 0 => Self::new(
                NotificationLevel::Warning,
                format!("{} approved, {} failed", tally.success_count, tally.failed_count),
            ),
            None => Self::new(
                NotificationLevel::Success,
                format!("{} approved", tally.success_count),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{ImportBatchProgress, ImportPhase};

    #[test]
    fn aborted_import_reports_partial_counts() {
        let outcome = ImportOutcome::Aborted {
            progress: ImportBatchProgress {
                processed_so_far: 50,
                total: 137,
                success_count: 48,
                duplicate_count: 2,
                failed_count: 0,
                errors: vec![],
            },
            reason: AbortReason::Cancelled,
        };
        let toast = Notification::import(&outcome).unwrap();
        assert_eq!(toast.level, NotificationLevel::Error);
        assert!(toast.message.contains("50 of 137"));
        assert!(toast.message.contains("48 imported"));
    }

    #[test]
    fn ignored_confirm_has_no_toast() {
        assert!(Notification::import(&ImportOutcome::Ignored(ImportPhase::Idle)).is_none());
    }
}
