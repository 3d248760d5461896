//! Dual-panel slot discovery.
//!
//! Tries the primary panel first and falls back to the secondary,
//! annotating which panel actually returned usable data. The policy is
//! "first non-empty wins", not "first success wins": a panel can answer
//! HTTP 200 with zero usable slots, and that must still trigger the
//! fallback.

use std::sync::Arc;

use crate::panel::{PanelKind, Slot, SlotDirectory};

/// Result of one dual-panel scan.
#[derive(Debug, Clone)]
pub struct SlotScan {
    /// Uniform slots, empty when neither panel had usable data.
    pub slots: Vec<Slot>,
    /// Panel that produced `slots`, `None` when both came up empty.
    pub source: Option<PanelKind>,
    /// Most specific failure detail when `source` is `None`.
    pub error: Option<String>,
}

impl SlotScan {
    /// Slots that pass the eligibility predicate, ascending by index.
    pub fn open_slots(&self, required_credits: u32) -> Vec<Slot> {
        let mut open: Vec<Slot> = self
            .slots
            .iter()
            .filter(|slot| slot.is_open(required_credits))
            .cloned()
            .collect();
        open.sort_by_key(|slot| slot.index);
        open
    }
}

/// Ordered pair of slot directories with non-empty-wins fallback.
pub struct SlotScanner {
    primary: Arc<dyn SlotDirectory>,
    secondary: Arc<dyn SlotDirectory>,
}

impl SlotScanner {
    /// Create a scanner over the two panels in fallback order.
    pub fn new(primary: Arc<dyn SlotDirectory>, secondary: Arc<dyn SlotDirectory>) -> Self {
        Self { primary, secondary }
    }

    /// Fetch the account's slots, primary first.
    pub async fn scan(&self, account: &str) -> SlotScan {
        let mut failures: Vec<String> = Vec::new();

        for directory in [&self.primary, &self.secondary] {
            let kind = directory.kind();
            match directory.fetch_slots(account).await {
                Ok(slots) if !slots.is_empty() => {
                    tracing::debug!(
                        account = %account,
                        panel = %kind,
                        slots = slots.len(),
                        "Slot scan succeeded"
                    );
                    return SlotScan {
                        slots,
                        source: Some(kind),
                        error: None,
                    };
                }
                Ok(_) => {
                    tracing::warn!(account = %account, panel = %kind, "Panel returned no slots");
                    failures.push(format!("{kind}: returned no slots"));
                }
                Err(err) => {
                    tracing::warn!(account = %account, panel = %kind, error = %err, "Slot scan failed");
                    failures.push(format!("{kind}: {err}"));
                }
            }
        }

        SlotScan {
            slots: Vec::new(),
            source: None,
            error: Some(failures.join("; ")),
        }
    }
}
