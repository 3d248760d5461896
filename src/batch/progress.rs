//! Progress reporting for batch runs.
//!
//! The coordinator calls a [`ProgressSink`] unconditionally after every
//! state transition; rendering is entirely the collaborator's concern.
//! Snapshots are serializable value copies — a sink must not expect them
//! to change after delivery.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::{AccountStatus, BatchSummary};
use crate::combo::ComboReport;

/// Point-in-time view of a running batch, emitted with every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub batch_id: Uuid,
    /// Account the event concerns.
    pub account: String,
    /// Zero-based position of the account in the batch.
    pub account_index: usize,
    pub accounts_total: usize,
    pub status: AccountStatus,
    /// Failure reason for `Failed` accounts.
    pub reason: Option<String>,
    pub slots_attempted: u64,
    pub slots_succeeded: u64,
    pub slots_failed: u64,
}

/// Receiver for batch lifecycle events.
pub trait ProgressSink: Send + Sync {
    /// An account moved to a new status.
    fn on_account_status(&self, snapshot: &ProgressSnapshot);

    /// One slot recycle attempt resolved.
    fn on_slot_attempted(&self, snapshot: &ProgressSnapshot, report: &ComboReport);

    /// The batch finished; no further events will follow.
    fn on_batch_finished(&self, summary: &BatchSummary);
}

/// Sink that discards everything.
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_account_status(&self, _snapshot: &ProgressSnapshot) {}
    fn on_slot_attempted(&self, _snapshot: &ProgressSnapshot, _report: &ComboReport) {}
    fn on_batch_finished(&self, _summary: &BatchSummary) {}
}

/// Sink that logs events via `tracing`.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_account_status(&self, snapshot: &ProgressSnapshot) {
        tracing::info!(
            batch = %snapshot.batch_id,
            account = %snapshot.account,
            position = snapshot.account_index + 1,
            total = snapshot.accounts_total,
            status = %snapshot.status,
            reason = snapshot.reason.as_deref().unwrap_or(""),
            "progress: account.status"
        );
    }

    fn on_slot_attempted(&self, snapshot: &ProgressSnapshot, report: &ComboReport) {
        let panel = report
            .panel_used
            .map(|p| p.to_string())
            .unwrap_or_default();
        tracing::info!(
            batch = %snapshot.batch_id,
            account = %snapshot.account,
            slot = report.slot_index,
            success = report.success,
            panel = %panel,
            error = report.error.as_deref().unwrap_or(""),
            attempted = snapshot.slots_attempted,
            succeeded = snapshot.slots_succeeded,
            "progress: slot.attempted"
        );
    }

    fn on_batch_finished(&self, summary: &BatchSummary) {
        tracing::info!(
            batch = %summary.batch_id,
            accounts_processed = summary.accounts_processed,
            accounts_failed = summary.accounts_failed,
            slots_attempted = summary.slots_attempted,
            slots_succeeded = summary.slots_succeeded,
            slots_failed = summary.slots_failed,
            primary_wins = summary.primary_wins,
            secondary_wins = summary.secondary_wins,
            "progress: batch.finished"
        );
    }
}
