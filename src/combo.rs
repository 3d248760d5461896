//! Per-slot recycle attempt: add the disposable number, wait for
//! panel-side propagation, kick it back out.
//!
//! One attempt runs the whole add→wait→kick cycle against the primary
//! panel and only falls back to the secondary when the primary *add* was
//! rejected. A successful add followed by a failed kick leaves a member
//! dangling on the panel; retrying the other panel at that point would
//! add the number a second time, so the attempt resolves as a
//! partial-mutation failure instead.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Delay;
use crate::panel::{PanelKind, Slot, SlotMutator, SlotScanner};

/// Outcome of one recycle attempt against one slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboReport {
    /// Both the add and the paired kick succeeded on one panel.
    pub success: bool,
    /// Panel whose add was accepted, `None` when no add went through.
    pub panel_used: Option<PanelKind>,
    pub add_ok: bool,
    pub kick_ok: bool,
    pub disposable_msisdn: String,
    pub slot_index: u32,
    /// Failure detail; for partial mutations this carries enough context
    /// for manual cleanup of the dangling member.
    pub error: Option<String>,
}

impl ComboReport {
    fn failure(slot_index: u32, disposable: &str, error: String) -> Self {
        Self {
            success: false,
            panel_used: None,
            add_ok: false,
            kick_ok: false,
            disposable_msisdn: disposable.to_string(),
            slot_index,
            error: Some(error),
        }
    }
}

/// One panel's add→wait→kick cycle, as a closed set of outcomes so the
/// fallback decision is a single match instead of nested error handling.
enum CycleOutcome {
    /// Add and kick both succeeded.
    Completed,
    /// The add was rejected; nothing was mutated, fallback is safe.
    AddRejected { error: String },
    /// The add succeeded but the kick failed; the member is dangling.
    KickFailed { error: String },
}

/// Runs recycle attempts for single slots.
pub struct ComboRunner {
    scanner: Arc<SlotScanner>,
    primary: Arc<dyn SlotMutator>,
    secondary: Arc<dyn SlotMutator>,
    delay: Arc<dyn Delay>,
    post_add_delay: Duration,
    required_add_credits: u32,
}

impl ComboRunner {
    pub fn new(
        scanner: Arc<SlotScanner>,
        primary: Arc<dyn SlotMutator>,
        secondary: Arc<dyn SlotMutator>,
        delay: Arc<dyn Delay>,
        post_add_delay: Duration,
        required_add_credits: u32,
    ) -> Self {
        Self {
            scanner,
            primary,
            secondary,
            delay,
            post_add_delay,
            required_add_credits,
        }
    }

    /// Run one add→wait→kick cycle against a single panel.
    async fn run_cycle(
        &self,
        mutator: &dyn SlotMutator,
        account: &str,
        slot: &Slot,
        disposable: &str,
    ) -> CycleOutcome {
        let panel = mutator.kind();

        let handle = match mutator.add_member(account, slot, disposable).await {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(
                    account = %account,
                    panel = %panel,
                    slot = slot.index,
                    error = %err,
                    "Add rejected"
                );
                return CycleOutcome::AddRejected {
                    error: err.to_string(),
                };
            }
        };

        tracing::info!(
            account = %account,
            panel = %panel,
            slot = slot.index,
            wait = ?self.post_add_delay,
            "Add accepted, waiting before kick"
        );
        self.delay.sleep(self.post_add_delay).await;

        // The kick must use the handle minted by this panel's add.
        match mutator.kick_member(account, &handle).await {
            Ok(()) => CycleOutcome::Completed,
            Err(err) => {
                tracing::error!(
                    account = %account,
                    panel = %panel,
                    slot = slot.index,
                    error = %err,
                    "Kick failed after successful add, member left dangling"
                );
                CycleOutcome::KickFailed {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Run one recycle attempt for `slot_index` under `account`.
    ///
    /// The slot is re-read fresh at entry; panel state changes after
    /// every add/kick, so the caller's earlier scan is only a hint about
    /// which indexes to try.
    pub async fn run(&self, account: &str, slot_index: u32, disposable: &str) -> ComboReport {
        let scan = self.scanner.scan(account).await;
        let slot = match scan.slots.iter().find(|s| s.index == slot_index) {
            Some(slot) => slot.clone(),
            None => {
                return ComboReport::failure(
                    slot_index,
                    disposable,
                    match scan.error {
                        Some(detail) => format!("slot {slot_index} not found on re-scan: {detail}"),
                        None => format!("slot {slot_index} not found on re-scan"),
                    },
                );
            }
        };
        if !slot.is_open(self.required_add_credits) {
            return ComboReport::failure(
                slot_index,
                disposable,
                format!("slot {slot_index} is no longer eligible"),
            );
        }

        match self
            .run_cycle(self.primary.as_ref(), account, &slot, disposable)
            .await
        {
            CycleOutcome::Completed => ComboReport {
                success: true,
                panel_used: Some(PanelKind::Primary),
                add_ok: true,
                kick_ok: true,
                disposable_msisdn: disposable.to_string(),
                slot_index,
                error: None,
            },
            CycleOutcome::KickFailed { error } => ComboReport {
                success: false,
                panel_used: Some(PanelKind::Primary),
                add_ok: true,
                kick_ok: false,
                disposable_msisdn: disposable.to_string(),
                slot_index,
                error: Some(format!(
                    "ADD succeeded / KICK failed on primary: {error} \
                     (account {account}, slot {slot_index}, member {disposable})"
                )),
            },
            CycleOutcome::AddRejected {
                error: primary_error,
            } => {
                tracing::warn!(
                    account = %account,
                    slot = slot_index,
                    "Primary add rejected, retrying combo on secondary"
                );
                match self
                    .run_cycle(self.secondary.as_ref(), account, &slot, disposable)
                    .await
                {
                    CycleOutcome::Completed => ComboReport {
                        success: true,
                        panel_used: Some(PanelKind::Secondary),
                        add_ok: true,
                        kick_ok: true,
                        disposable_msisdn: disposable.to_string(),
                        slot_index,
                        error: None,
                    },
                    CycleOutcome::KickFailed { error } => ComboReport {
                        success: false,
                        panel_used: Some(PanelKind::Secondary),
                        add_ok: true,
                        kick_ok: false,
                        error: Some(format!(
                            "primary add failed: {primary_error}; \
                             ADD succeeded / KICK failed on secondary: {error} \
                             (account {account}, slot {slot_index}, member {disposable})"
                        )),
                        disposable_msisdn: disposable.to_string(),
                        slot_index,
                    },
                    CycleOutcome::AddRejected { error } => ComboReport::failure(
                        slot_index,
                        disposable,
                        format!("primary add failed: {primary_error}; secondary add failed: {error}"),
                    ),
                }
            }
        }
    }
}
