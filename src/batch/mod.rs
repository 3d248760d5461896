//! Batch coordination: accounts in input order, slots in ascending
//! index order, everything strictly sequential.
//!
//! The panels propagate mutations slowly, and concurrent mutation of one
//! account's slot set would race their eventual consistency, so the
//! coordinator never fans out. Stats live in a single accumulator owned
//! by the running task; sinks only ever see value copies.

pub mod progress;

pub use progress::{LogSink, NoopSink, ProgressSink, ProgressSnapshot};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Delay;
use crate::combo::{ComboReport, ComboRunner};
use crate::config::EngineConfig;
use crate::error::BatchError;
use crate::panel::{PanelKind, SlotScanner};

/// One batch worth of operator input, passed in whole at `run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Manager account numbers, processed in order.
    pub accounts: Vec<String>,
    /// Throwaway number cycled through every eligible slot.
    pub disposable_msisdn: String,
}

/// Lifecycle of one account within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// An account the batch could not process, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAccount {
    pub account: String,
    pub reason: String,
}

/// Final structured result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub accounts_total: usize,
    /// Accounts that reached `Completed`.
    pub accounts_processed: usize,
    pub accounts_failed: usize,
    pub slots_attempted: u64,
    pub slots_succeeded: u64,
    pub slots_failed: u64,
    /// Combos won via the primary panel.
    pub primary_wins: u64,
    /// Combos won via the secondary panel.
    pub secondary_wins: u64,
    pub failed_accounts: Vec<FailedAccount>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Mutable accumulator for one batch run. Owned exclusively by the
/// coordinator; destroyed when the batch finishes.
#[derive(Default)]
struct BatchStats {
    accounts_processed: usize,
    accounts_failed: usize,
    slots_attempted: u64,
    slots_succeeded: u64,
    slots_failed: u64,
    primary_wins: u64,
    secondary_wins: u64,
    failed_accounts: Vec<FailedAccount>,
}

impl BatchStats {
    fn record_report(&mut self, report: &ComboReport) {
        self.slots_attempted += 1;
        if report.success {
            self.slots_succeeded += 1;
            match report.panel_used {
                Some(PanelKind::Primary) => self.primary_wins += 1,
                Some(PanelKind::Secondary) => self.secondary_wins += 1,
                None => {}
            }
        } else {
            self.slots_failed += 1;
        }
    }

    fn fail_account(&mut self, account: &str, reason: &str) {
        self.accounts_failed += 1;
        self.failed_accounts.push(FailedAccount {
            account: account.to_string(),
            reason: reason.to_string(),
        });
    }

    fn into_summary(
        self,
        batch_id: Uuid,
        accounts_total: usize,
        started_at: DateTime<Utc>,
    ) -> BatchSummary {
        BatchSummary {
            batch_id,
            accounts_total,
            accounts_processed: self.accounts_processed,
            accounts_failed: self.accounts_failed,
            slots_attempted: self.slots_attempted,
            slots_succeeded: self.slots_succeeded,
            slots_failed: self.slots_failed,
            primary_wins: self.primary_wins,
            secondary_wins: self.secondary_wins,
            failed_accounts: self.failed_accounts,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Drives one batch of accounts through slot discovery and recycling.
pub struct BatchCoordinator {
    scanner: Arc<SlotScanner>,
    combo: ComboRunner,
    delay: Arc<dyn Delay>,
    config: EngineConfig,
}

impl BatchCoordinator {
    pub fn new(
        scanner: Arc<SlotScanner>,
        combo: ComboRunner,
        delay: Arc<dyn Delay>,
        config: EngineConfig,
    ) -> Self {
        Self {
            scanner,
            combo,
            delay,
            config,
        }
    }

    /// Process every account in `request`, in order, to completion.
    ///
    /// Per-account and per-slot failures are recorded in the summary,
    /// never raised; the only error paths out of `run` are invalid input
    /// and programming errors.
    pub async fn run(
        &self,
        request: &BatchRequest,
        sink: &dyn ProgressSink,
    ) -> Result<BatchSummary, BatchError> {
        if request.accounts.is_empty() {
            return Err(BatchError::NoAccounts);
        }
        if request.disposable_msisdn.trim().is_empty() {
            return Err(BatchError::MissingDisposable);
        }

        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let accounts_total = request.accounts.len();
        let mut stats = BatchStats::default();

        tracing::info!(
            batch = %batch_id,
            accounts = accounts_total,
            "Starting batch run"
        );

        for (account_index, account) in request.accounts.iter().enumerate() {
            let snapshot = |stats: &BatchStats, status: AccountStatus, reason: Option<&str>| {
                ProgressSnapshot {
                    batch_id,
                    account: account.clone(),
                    account_index,
                    accounts_total,
                    status,
                    reason: reason.map(str::to_string),
                    slots_attempted: stats.slots_attempted,
                    slots_succeeded: stats.slots_succeeded,
                    slots_failed: stats.slots_failed,
                }
            };

            let scan = self.scanner.scan(account).await;
            if scan.slots.is_empty() {
                tracing::warn!(
                    batch = %batch_id,
                    account = %account,
                    error = scan.error.as_deref().unwrap_or(""),
                    "No slots on either panel, skipping account"
                );
                stats.fail_account(account, "no_slots");
                sink.on_account_status(&snapshot(&stats, AccountStatus::Failed, Some("no_slots")));
                continue;
            }

            let open = scan.open_slots(self.config.required_add_credits);
            if open.is_empty() {
                tracing::warn!(
                    batch = %batch_id,
                    account = %account,
                    slots = scan.slots.len(),
                    "No eligible slots, skipping account"
                );
                stats.fail_account(account, "no_available_slots");
                sink.on_account_status(&snapshot(
                    &stats,
                    AccountStatus::Failed,
                    Some("no_available_slots"),
                ));
                continue;
            }

            sink.on_account_status(&snapshot(&stats, AccountStatus::Processing, None));

            let last_index = open.len() - 1;
            for (position, slot) in open.iter().enumerate() {
                let report = self
                    .combo
                    .run(account, slot.index, &request.disposable_msisdn)
                    .await;
                stats.record_report(&report);
                sink.on_slot_attempted(
                    &snapshot(&stats, AccountStatus::Processing, None),
                    &report,
                );

                if position != last_index {
                    tracing::debug!(
                        batch = %batch_id,
                        account = %account,
                        cooldown = ?self.config.slot_cooldown,
                        "Cooling down before next slot"
                    );
                    self.delay.sleep(self.config.slot_cooldown).await;
                }
            }

            stats.accounts_processed += 1;
            sink.on_account_status(&snapshot(&stats, AccountStatus::Completed, None));
        }

        let summary = stats.into_summary(batch_id, accounts_total, started_at);
        tracing::info!(
            batch = %batch_id,
            accounts_processed = summary.accounts_processed,
            accounts_failed = summary.accounts_failed,
            slots_succeeded = summary.slots_succeeded,
            slots_failed = summary.slots_failed,
            "Batch run finished"
        );
        sink.on_batch_finished(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::panel::Slot;

    fn report(success: bool, panel: Option<PanelKind>) -> ComboReport {
        ComboReport {
            success,
            panel_used: panel,
            add_ok: success,
            kick_ok: success,
            disposable_msisdn: "089999999999".to_string(),
            slot_index: 1,
            error: None,
        }
    }

    #[test]
    fn stats_count_wins_per_panel() {
        let mut stats = BatchStats::default();
        stats.record_report(&report(true, Some(PanelKind::Primary)));
        stats.record_report(&report(true, Some(PanelKind::Secondary)));
        stats.record_report(&report(false, Some(PanelKind::Primary)));

        assert_eq!(stats.slots_attempted, 3);
        assert_eq!(stats.slots_succeeded, 2);
        assert_eq!(stats.slots_failed, 1);
        assert_eq!(stats.primary_wins, 1);
        assert_eq!(stats.secondary_wins, 1);
    }

    #[test]
    fn summary_carries_failed_accounts() {
        let mut stats = BatchStats::default();
        stats.fail_account("081111111111", "no_slots");
        let summary = stats.into_summary(Uuid::new_v4(), 1, Utc::now());
        assert_eq!(summary.accounts_failed, 1);
        assert_eq!(summary.failed_accounts[0].reason, "no_slots");
    }

    #[test]
    fn account_status_display() {
        assert_eq!(AccountStatus::Processing.to_string(), "processing");
        assert_eq!(AccountStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn summary_serializes_to_json() {
        let stats = BatchStats::default();
        let summary = stats.into_summary(Uuid::new_v4(), 0, Utc::now());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["slots_attempted"], 0);
        assert!(json["failed_accounts"].as_array().unwrap().is_empty());
    }

    // Full coordinator behavior is covered by the integration scenarios
    // in tests/batch_scenarios.rs; the empty-input guards are cheap to
    // pin down here.
    #[tokio::test]
    async fn run_rejects_empty_input() {
        use crate::panel::{PanelKind, SlotDirectory, SlotMutator};
        use async_trait::async_trait;

        struct NoDirectory(PanelKind);

        #[async_trait]
        impl SlotDirectory for NoDirectory {
            fn kind(&self) -> PanelKind {
                self.0
            }
            async fn fetch_slots(
                &self,
                _account: &str,
            ) -> Result<Vec<Slot>, crate::error::PanelError> {
                Err(crate::error::PanelError::NoSlots {
                    panel: self.0.to_string(),
                })
            }
        }

        struct NoMutator(PanelKind);

        #[async_trait]
        impl SlotMutator for NoMutator {
            fn kind(&self) -> PanelKind {
                self.0
            }
            async fn add_member(
                &self,
                _account: &str,
                _slot: &Slot,
                _msisdn: &str,
            ) -> Result<crate::panel::MemberHandle, crate::error::PanelError> {
                unreachable!("no mutation expected")
            }
            async fn kick_member(
                &self,
                _account: &str,
                _handle: &crate::panel::MemberHandle,
            ) -> Result<(), crate::error::PanelError> {
                unreachable!("no mutation expected")
            }
        }

        let scanner = Arc::new(SlotScanner::new(
            Arc::new(NoDirectory(PanelKind::Primary)),
            Arc::new(NoDirectory(PanelKind::Secondary)),
        ));
        let combo = ComboRunner::new(
            Arc::clone(&scanner),
            Arc::new(NoMutator(PanelKind::Primary)),
            Arc::new(NoMutator(PanelKind::Secondary)),
            Arc::new(crate::clock::TokioDelay),
            Duration::from_secs(20),
            2,
        );
        let coordinator = BatchCoordinator::new(
            scanner,
            combo,
            Arc::new(crate::clock::TokioDelay),
            EngineConfig::default(),
        );

        let err = coordinator
            .run(
                &BatchRequest {
                    accounts: vec![],
                    disposable_msisdn: "089999999999".to_string(),
                },
                &NoopSink,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::NoAccounts));

        let err = coordinator
            .run(
                &BatchRequest {
                    accounts: vec!["081111111111".to_string()],
                    disposable_msisdn: "  ".to_string(),
                },
                &NoopSink,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::MissingDisposable));
    }
}
