//! Batched import confirmation.
//!
//! One [`BatchImportRunner`] drives one import session at a time:
//!
//! ```text
//! Idle → Uploading → Previewing → Confirming → Completed
//!                                      └─────→ Aborted → (confirm again to resume)
//! ```
//!
//! Confirmation streams the session's valid rows through the backend in
//! fixed-size chunks. Counters from every chunk response are added, never
//! overwritten; a failing chunk stops the loop but keeps what was already
//! counted. Progress is published on a `watch` channel after every step.

use polisa_core::{
    ChunkResponse, ImportFile, ImportSessionId, NetworkError, PreviewRow, RowError, UploadResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::collaborators::ImportGateway;
use crate::pipeline::{paginate, PageResult};

/// Rows confirmed per request.
pub const DEFAULT_CHUNK_SIZE: u64 = 50;

/// Configuration for [`BatchImportRunner`].
#[derive(Debug, Clone)]
pub struct ImportRunnerConfig {
    pub chunk_size: u64,
    /// Pause between chunk requests so the request queue is not saturated.
    pub chunk_delay: Duration,
    /// Insurance company the file is believed to come from, if known.
    pub company_id_hint: Option<i64>,
}

impl Default for ImportRunnerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::from_millis(100),
            company_id_hint: None,
        }
    }
}

impl ImportRunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn with_company_hint(mut self, company_id: Option<i64>) -> Self {
        self.company_id_hint = company_id;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPhase {
    Idle,
    Uploading,
    Previewing,
    Confirming,
    Completed,
    Aborted,
}

/// Running totals for one import session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatchProgress {
    pub processed_so_far: u64,
    pub total: u64,
    pub success_count: u64,
    pub duplicate_count: u64,
    pub failed_count: u64,
    pub errors: Vec<RowError>,
}

impl ImportBatchProgress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Add one chunk's counters.
    pub fn absorb(&mut self, chunk: &ChunkResponse) {
        self.success_count += chunk.success_count;
        self.duplicate_count += chunk.duplicate_count;
        self.failed_count += chunk.failed_count;
        self.processed_so_far =
            self.success_count + self.duplicate_count + self.failed_count;
        self.errors.extend(chunk.errors.iter().cloned());
    }

    /// Share of rows handled so far, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.processed_so_far as f64 / self.total as f64).min(1.0)
    }
}

/// What subscribers see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSnapshot {
    pub phase: ImportPhase,
    pub session_id: Option<ImportSessionId>,
    pub progress: ImportBatchProgress,
}

/// Counts returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSummary {
    pub session_id: ImportSessionId,
    pub total_rows: u64,
    pub valid_rows: u64,
    pub invalid_rows: u64,
}

/// Which preview rows to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewFilter {
    #[default]
    All,
    Valid,
    Invalid,
}

impl PreviewFilter {
    fn accepts(&self, row: &PreviewRow) -> bool {
        match self {
            Self::All => true,
            Self::Valid => row.is_valid,
            Self::Invalid => !row.is_valid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    Network(NetworkError),
    /// The backend kept reporting more batches past the last expected row.
    Overrun { skip: u64, total: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The backend reported no more batches.
    Completed(ImportBatchProgress),
    /// Stopped early; `progress` holds everything counted before the stop.
    Aborted {
        progress: ImportBatchProgress,
        reason: AbortReason,
    },
    /// `confirm` called in a phase that has nothing to confirm.
    Ignored(ImportPhase),
}

/// Cloneable handle that stops a running confirmation before its next chunk.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives upload, preview and chunked confirmation of one import session.
pub struct BatchImportRunner {
    gateway: Arc<dyn ImportGateway>,
    config: ImportRunnerConfig,
    phase: ImportPhase,
    session_id: Option<ImportSessionId>,
    rows: Vec<PreviewRow>,
    progress: ImportBatchProgress,
    next_skip: u64,
    cancel: CancelHandle,
    snapshots: watch::Sender<ImportSnapshot>,
}

impl BatchImportRunner {
    pub fn new(gateway: Arc<dyn ImportGateway>, config: ImportRunnerConfig) -> Self {
        let (snapshots, _) = watch::channel(ImportSnapshot {
            phase: ImportPhase::Idle,
            session_id: None,
            progress: ImportBatchProgress::default(),
        });
        Self {
            gateway,
            config,
            phase: ImportPhase::Idle,
            session_id: None,
            rows: Vec::new(),
            progress: ImportBatchProgress::default(),
            next_skip: 0,
            cancel: CancelHandle::default(),
            snapshots,
        }
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    pub fn session_id(&self) -> Option<&ImportSessionId> {
        self.session_id.as_ref()
    }

    pub fn progress(&self) -> &ImportBatchProgress {
        &self.progress
    }

    pub fn config(&self) -> &ImportRunnerConfig {
        &self.config
    }

    /// Receive a snapshot after every phase change and every chunk.
    pub fn subscribe(&self) -> watch::Receiver<ImportSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> ImportSnapshot {
        ImportSnapshot {
            phase: self.phase,
            session_id: self.session_id.clone(),
            progress: self.progress.clone(),
        }
    }

    /// Handle for stopping a confirmation from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Upload `file` and open a new session, discarding any previous one.
    ///
    /// On failure the runner returns to `Idle`; nothing was persisted.
    pub async fn start(&mut self, file: ImportFile) -> Result<PreviewSummary, NetworkError> {
        self.session_id = None;
        self.rows.clear();
        self.progress = ImportBatchProgress::default();
        self.next_skip = 0;
        self.cancel.reset();
        self.set_phase(ImportPhase::Uploading);

        tracing::info!(file = %file.file_name, bytes = file.bytes.len(), "uploading import file");
        match self.gateway.upload(&file, self.config.company_id_hint).await {
            Ok(upload) => Ok(self.open_session(upload)),
            Err(err) => {
                tracing::warn!(error = %err, file = %file.file_name, "import upload failed");
                self.set_phase(ImportPhase::Idle);
                Err(err)
            }
        }
    }

    fn open_session(&mut self, upload: UploadResponse) -> PreviewSummary {
        let summary = PreviewSummary {
            session_id: upload.session_id.clone(),
            total_rows: upload.total_rows,
            valid_rows: upload.valid_rows,
            invalid_rows: upload.invalid_rows,
        };
        tracing::info!(
            session = %summary.session_id,
            total = summary.total_rows,
            valid = summary.valid_rows,
            invalid = summary.invalid_rows,
            "import preview ready"
        );
        self.session_id = Some(upload.session_id);
        self.rows = upload.rows;
        self.progress = ImportBatchProgress::new(upload.valid_rows);
        self.set_phase(ImportPhase::Previewing);
        summary
    }

    /// Page through the preview rows locally.
    pub fn preview_page(
        &self,
        filter: PreviewFilter,
        page: usize,
        page_size: usize,
    ) -> PageResult<PreviewRow> {
        let rows: Vec<PreviewRow> = self
            .rows
            .iter()
            .filter(|row| filter.accepts(row))
            .cloned()
            .collect();
        paginate(&rows, page, page_size)
    }

    /// Drop an unconfirmed session and return to `Idle`.
    ///
    /// Only `Previewing` can be cancelled this way; a running confirmation
    /// is stopped through [`BatchImportRunner::cancel_handle`]. Returns
    /// whether anything was cancelled.
    pub fn cancel(&mut self) -> bool {
        if self.phase != ImportPhase::Previewing {
            return false;
        }
        self.session_id = None;
        self.rows.clear();
        self.progress = ImportBatchProgress::default();
        self.set_phase(ImportPhase::Idle);
        true
    }

    /// Confirm all remaining chunks of the current session.
    ///
    /// Starts at the first row from `Previewing`, and resumes at the saved
    /// cursor from `Aborted`. Rows the backend already imported come back
    /// as duplicates, so resuming never double counts a success.
    pub async fn confirm(&mut self) -> ImportOutcome {
        let session_id = match (&self.phase, &self.session_id) {
            (ImportPhase::Previewing | ImportPhase::Aborted, Some(id)) => id.clone(),
            _ => return ImportOutcome::Ignored(self.phase),
        };
        let take = self.config.chunk_size.max(1);
        self.set_phase(ImportPhase::Confirming);

        loop {
            if self.cancel.take() {
                tracing::info!(session = %session_id, skip = self.next_skip, "import cancelled");
                return self.abort(AbortReason::Cancelled);
            }

            let skip = self.next_skip;
            tracing::debug!(session = %session_id, skip, take, "confirming import chunk");
            let chunk = match self.gateway.confirm_chunk(&session_id, skip, take).await {
                Ok(chunk) => chunk,
                Err(err) => {
                    tracing::warn!(session = %session_id, skip, error = %err, "import chunk failed");
                    return self.abort(AbortReason::Network(err));
                }
            };

            self.progress.absorb(&chunk);
            self.next_skip = skip + take;
            if chunk.processed_so_far != self.progress.processed_so_far {
                tracing::debug!(
                    reported = chunk.processed_so_far,
                    counted = self.progress.processed_so_far,
                    "server progress differs from accumulated counters"
                );
            }
            self.publish();

            if !chunk.has_more_batches {
                return self.complete();
            }
            if self.next_skip >= self.progress.total.saturating_add(take) {
                tracing::warn!(
                    session = %session_id,
                    skip = self.next_skip,
                    total = self.progress.total,
                    "backend still reports more batches past the last row; stopping"
                );
                return self.abort(AbortReason::Overrun {
                    skip: self.next_skip,
                    total: self.progress.total,
                });
            }
            if !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
        }
    }

    fn complete(&mut self) -> ImportOutcome {
        tracing::info!(
            success = self.progress.success_count,
            duplicate = self.progress.duplicate_count,
            failed = self.progress.failed_count,
            "import completed"
        );
        self.set_phase(ImportPhase::Completed);
        ImportOutcome::Completed(self.progress.clone())
    }

    fn abort(&mut self, reason: AbortReason) -> ImportOutcome {
        self.set_phase(ImportPhase::Aborted);
        ImportOutcome::Aborted {
            progress: self.progress.clone(),
            reason,
        }
    }

    fn set_phase(&mut self, phase: ImportPhase) {
        self.phase = phase;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
