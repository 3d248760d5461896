//! Secondary panel client.
//!
//! One shared endpoint; the operation is selected by the `action` field
//! of a JSON POST (`info`, `add`, `kick`) alongside an operator
//! identity/password pair. Accounts and member numbers travel in local
//! (`0…`) form. The panel addresses members by slot index only and
//! returns no stable member id.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::clock::Delay;
use crate::config::SecondaryPanelConfig;
use crate::error::PanelError;
use crate::msisdn;
use crate::panel::{MemberHandle, PanelKind, Slot, SlotDirectory, SlotMutator};

const PANEL_NAME: &str = "secondary";

/// Client for the secondary panel.
pub struct SecondaryPanel {
    client: Client,
    config: SecondaryPanelConfig,
    delay: Arc<dyn Delay>,
}

/// JSON body for every secondary operation.
#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    action: &'a str,
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    nomor_hp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nomor_slot: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nomor_anggota: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nama: Option<&'a str>,
}

impl<'a> ActionRequest<'a> {
    fn new(action: &'a str, username: &'a str, password: &'a str) -> Self {
        Self {
            action,
            username,
            password,
            nomor_hp: None,
            nomor_slot: None,
            nomor_anggota: None,
            nama: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Slot record inside the `info` response's `data.data_slot`.
#[derive(Debug, Deserialize)]
struct SlotRecord {
    #[serde(default)]
    slot: u32,
    #[serde(default)]
    sisa_add: u32,
    #[serde(default)]
    msisdn: String,
    #[serde(default)]
    nama: String,
}

#[derive(Debug, Deserialize)]
struct InfoData {
    #[serde(default)]
    data_slot: Vec<SlotRecord>,
}

impl SecondaryPanel {
    /// Create a new secondary panel client.
    pub fn new(config: SecondaryPanelConfig, delay: Arc<dyn Delay>) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            config,
            delay,
        }
    }

    /// POST one action and decode the JSON envelope.
    async fn post_action(&self, request: &ActionRequest<'_>) -> Result<Envelope, PanelError> {
        tracing::debug!(action = request.action, "Sending request to secondary panel");

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(action = request.action, error = %e, "Secondary panel request failed");
                PanelError::RequestFailed {
                    panel: PANEL_NAME.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!(http_status = %status, "Secondary panel response");

        if !status.is_success() {
            return Err(PanelError::RequestFailed {
                panel: PANEL_NAME.to_string(),
                reason: format!("HTTP {}: {}", status, response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| PanelError::InvalidResponse {
            panel: PANEL_NAME.to_string(),
            reason: format!("JSON parse error: {}. Raw: {}", e, response_text),
        })
    }

    fn unwrap_envelope(envelope: Envelope) -> Result<serde_json::Value, PanelError> {
        if !envelope.status {
            return Err(PanelError::Rejected {
                panel: PANEL_NAME.to_string(),
                reason: envelope
                    .message
                    .unwrap_or_else(|| "panel returned a false status".to_string()),
            });
        }
        envelope.data.ok_or_else(|| PanelError::Rejected {
            panel: PANEL_NAME.to_string(),
            reason: "panel response has no data".to_string(),
        })
    }

    async fn fetch_slots_once(&self, account_local: &str) -> Result<Vec<Slot>, PanelError> {
        let mut request = ActionRequest::new(
            "info",
            &self.config.username,
            self.config.password.expose_secret(),
        );
        request.nomor_hp = Some(account_local);

        let envelope = self.post_action(&request).await?;
        slots_from_info(Self::unwrap_envelope(envelope)?)
    }
}

/// Fetch with the panel's empty-result quirk: one delayed retry before an
/// empty slot list is believed.
///
/// The panel sometimes serves a stale empty list right after a mutation;
/// the single retry distinguishes that from a genuinely empty account.
async fn fetch_with_empty_retry<F, Fut>(
    delay: &dyn Delay,
    retry_after: std::time::Duration,
    mut fetch: F,
) -> Result<Vec<Slot>, PanelError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<Slot>, PanelError>>,
{
    let slots = fetch().await?;
    if !slots.is_empty() {
        return Ok(slots);
    }

    tracing::debug!(
        retry_after = ?retry_after,
        "Secondary panel returned no slots, retrying once"
    );
    delay.sleep(retry_after).await;

    let slots = fetch().await?;
    if slots.is_empty() {
        return Err(PanelError::NoSlots {
            panel: PANEL_NAME.to_string(),
        });
    }
    Ok(slots)
}

/// Map the `info` payload into uniform slots.
fn slots_from_info(data: serde_json::Value) -> Result<Vec<Slot>, PanelError> {
    let info: InfoData = serde_json::from_value(data).map_err(|e| PanelError::InvalidResponse {
        panel: PANEL_NAME.to_string(),
        reason: format!("unexpected info payload shape: {e}"),
    })?;

    Ok(info
        .data_slot
        .into_iter()
        .map(|record| Slot {
            index: record.slot,
            panel_member_id: None,
            remaining_add_credits: record.sisa_add,
            occupant_msisdn: record.msisdn,
            occupant_name: record.nama,
        })
        .collect())
}

#[async_trait]
impl SlotDirectory for SecondaryPanel {
    fn kind(&self) -> PanelKind {
        PanelKind::Secondary
    }

    async fn fetch_slots(&self, account: &str) -> Result<Vec<Slot>, PanelError> {
        let account_local = msisdn::to_local(account);

        fetch_with_empty_retry(
            self.delay.as_ref(),
            self.config.empty_retry_delay,
            || self.fetch_slots_once(&account_local),
        )
        .await
    }
}

#[async_trait]
impl SlotMutator for SecondaryPanel {
    fn kind(&self) -> PanelKind {
        PanelKind::Secondary
    }

    async fn add_member(
        &self,
        account: &str,
        slot: &Slot,
        msisdn_raw: &str,
    ) -> Result<MemberHandle, PanelError> {
        let account_local = msisdn::to_local(account);
        let member_local = msisdn::to_local(msisdn_raw);

        let mut request = ActionRequest::new(
            "add",
            &self.config.username,
            self.config.password.expose_secret(),
        );
        request.nomor_hp = Some(&account_local);
        request.nomor_slot = Some(slot.index);
        request.nomor_anggota = Some(&member_local);
        // The panel requires a display name; the member number doubles as one.
        request.nama = Some(&member_local);

        let envelope = self.post_action(&request).await?;
        Self::unwrap_envelope(envelope)?;

        tracing::debug!(
            account = %account_local,
            slot = slot.index,
            "Secondary panel accepted add"
        );
        Ok(MemberHandle::SlotIndex(slot.index))
    }

    async fn kick_member(&self, account: &str, handle: &MemberHandle) -> Result<(), PanelError> {
        let MemberHandle::SlotIndex(slot_index) = handle else {
            return Err(PanelError::HandleMismatch {
                panel: PANEL_NAME.to_string(),
            });
        };

        let account_local = msisdn::to_local(account);

        let mut request = ActionRequest::new(
            "kick",
            &self.config.username,
            self.config.password.expose_secret(),
        );
        request.nomor_hp = Some(&account_local);
        request.nomor_slot = Some(*slot_index);

        let envelope = self.post_action(&request).await?;
        Self::unwrap_envelope(envelope)?;

        tracing::debug!(
            account = %account_local,
            slot = *slot_index,
            "Secondary panel accepted kick"
        );
        Ok(())
    }
}
