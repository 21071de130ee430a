//! Transfer pool approvals.
//!
//! Approving a selection sends ids in batches and adds up each batch's
//! counters. A failed request stops the run; the tally so far is kept.

use polisa_core::{ApprovalResponse, NetworkError, PoolRecordId};
use std::collections::HashSet;
use std::sync::Arc;

use crate::collaborators::PoolGateway;

/// Ids per batch-approve request.
pub const DEFAULT_APPROVAL_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalTally {
    pub success_count: u64,
    pub failed_count: u64,
    pub errors: Vec<String>,
    /// Requests that returned a response.
    pub batches: u32,
}

impl ApprovalTally {
    pub fn absorb(&mut self, response: &ApprovalResponse) {
        self.success_count += response.success_count;
        self.failed_count += response.failed_count;
        self.errors.extend(response.errors.iter().cloned());
        self.batches += 1;
    }
}

/// Result of approving a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRun {
    pub tally: ApprovalTally,
    /// Ids never sent because an earlier request failed.
    pub unsent: Vec<PoolRecordId>,
    pub interrupted: Option<NetworkError>,
}

impl ApprovalRun {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

pub struct PoolApprover {
    gateway: Arc<dyn PoolGateway>,
    batch_size: usize,
}

impl PoolApprover {
    pub fn new(gateway: Arc<dyn PoolGateway>) -> Self {
        Self {
            gateway,
            batch_size: DEFAULT_APPROVAL_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn approve_one(&self, id: &PoolRecordId) -> Result<ApprovalTally, NetworkError> {
        let response = self.gateway.approve(id).await?;
        let mut tally = ApprovalTally::default();
        tally.absorb(&response);
        Ok(tally)
    }

    /// Approve every id in `selection`; duplicates in the selection are sent once.
    pub async fn approve_selection(&self, selection: &[PoolRecordId]) -> ApprovalRun {
        let mut seen = HashSet::new();
        let ids: Vec<PoolRecordId> = selection
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect();

        let mut tally = ApprovalTally::default();
        for (index, batch) in ids.chunks(self.batch_size).enumerate() {
            match self.gateway.batch_approve(batch).await {
                Ok(response) => tally.absorb(&response),
                Err(err) => {
                    let sent = index * self.batch_size;
                    tracing::warn!(error = %err, sent, remaining = ids.len() - sent, "pool approval interrupted");
                    return ApprovalRun {
                        tally,
                        unsent: ids[sent..].to_vec(),
                        interrupted: Some(err),
                    };
                }
            }
        }
        tracing::info!(
            success = tally.success_count,
            failed = tally.failed_count,
            "pool approval finished"
        );
        ApprovalRun {
            tally,
            unsent: Vec::new(),
            interrupted: None,
        }
    }
}
