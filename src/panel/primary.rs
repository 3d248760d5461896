//! Primary panel client.
//!
//! Form-encoded POST per operation against a base URL. Every request
//! carries the auth token and `id_parent` (the account number in
//! international form). Responses are JSON envelopes whose `status` field
//! is a boolean on some deployments and a string on others.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::PrimaryPanelConfig;
use crate::error::PanelError;
use crate::msisdn;
use crate::panel::{MemberHandle, PanelKind, Slot, SlotDirectory, SlotMutator};

const PANEL_NAME: &str = "primary";

/// Client for the primary panel.
pub struct PrimaryPanel {
    client: Client,
    config: PrimaryPanelConfig,
}

/// JSON envelope returned by every primary operation.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: StatusFlag,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// `status` arrives as `true`/`false` or as a string flag depending on
/// the deployment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusFlag {
    Bool(bool),
    Text(String),
}

impl Default for StatusFlag {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl StatusFlag {
    fn is_ok(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => matches!(s.to_lowercase().as_str(), "true" | "success" | "ok" | "1"),
        }
    }
}

/// Member record inside the `info` response's `data`.
#[derive(Debug, Deserialize)]
struct MemberRecord {
    #[serde(default)]
    slot_id: Option<String>,
    #[serde(default)]
    slot_number: u32,
    #[serde(default)]
    msisdn: String,
    #[serde(default)]
    alias: String,
    #[serde(default)]
    add_chances: u32,
}

#[derive(Debug, Deserialize)]
struct InfoData {
    #[serde(default)]
    members: Vec<MemberRecord>,
}

impl PrimaryPanel {
    /// Create a new primary panel client.
    pub fn new(config: PrimaryPanelConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    fn api_url(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{}/{}", base, path)
    }

    /// POST one form-encoded operation and decode the JSON envelope.
    async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> Result<Envelope, PanelError> {
        let url = self.api_url(path);

        tracing::debug!(url = %url, "Sending request to primary panel");

        let response = self
            .client
            .post(&url)
            .form(fields)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Primary panel request failed");
                PanelError::RequestFailed {
                    panel: PANEL_NAME.to_string(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let response_text = response.text().await.unwrap_or_default();

        tracing::debug!(http_status = %status, "Primary panel response");

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

    /// Unwrap the envelope: a non-truthy status or an absent `data` is a
    /// rejected operation.
    fn unwrap_envelope(envelope: Envelope) -> Result<serde_json::Value, PanelError> {
        if !envelope.status.is_ok() {
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
}

/// Map the `info` payload into uniform slots.
fn slots_from_info(data: serde_json::Value) -> Result<Vec<Slot>, PanelError> {
    let info: InfoData = serde_json::from_value(data).map_err(|e| PanelError::InvalidResponse {
        panel: PANEL_NAME.to_string(),
        reason: format!("unexpected info payload shape: {e}"),
    })?;

    Ok(info
        .members
        .into_iter()
        .map(|record| Slot {
            index: record.slot_number,
            panel_member_id: record.slot_id,
            remaining_add_credits: record.add_chances,
            occupant_msisdn: record.msisdn,
            occupant_name: record.alias,
        })
        .collect())
}

/// Pull the member id from an `add` payload; arrives as a string or a
/// number depending on the deployment.
fn member_id_from_add(data: &serde_json::Value) -> Result<String, PanelError> {
    match data.get("member_id") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        _ => Err(PanelError::InvalidResponse {
            panel: PANEL_NAME.to_string(),
            reason: "add response has no member_id".to_string(),
        }),
    }
}

#[async_trait]
impl SlotDirectory for PrimaryPanel {
    fn kind(&self) -> PanelKind {
        PanelKind::Primary
    }

    async fn fetch_slots(&self, account: &str) -> Result<Vec<Slot>, PanelError> {
        let id_parent = msisdn::to_international(account);
        let token = self.config.token.expose_secret().to_string();

        let envelope = self
            .post_form(
                "info",
                &[("token", token.as_str()), ("id_parent", id_parent.as_str())],
            )
            .await?;
        let slots = slots_from_info(Self::unwrap_envelope(envelope)?)?;

        if slots.is_empty() {
            return Err(PanelError::NoSlots {
                panel: PANEL_NAME.to_string(),
            });
        }
        Ok(slots)
    }
}

#[async_trait]
impl SlotMutator for PrimaryPanel {
    fn kind(&self) -> PanelKind {
        PanelKind::Primary
    }

    async fn add_member(
        &self,
        account: &str,
        slot: &Slot,
        msisdn_raw: &str,
    ) -> Result<MemberHandle, PanelError> {
        let id_parent = msisdn::to_international(account);
        let member = msisdn::to_international(msisdn_raw);
        let token = self.config.token.expose_secret().to_string();

        let mut fields: Vec<(&str, &str)> = vec![
            ("token", token.as_str()),
            ("id_parent", id_parent.as_str()),
            ("msisdn", member.as_str()),
        ];
        if let Some(slot_id) = slot.panel_member_id.as_deref() {
            fields.push(("slot_id", slot_id));
        }

        let envelope = self.post_form("add", &fields).await?;
        let data = Self::unwrap_envelope(envelope)?;
        let member_id = member_id_from_add(&data)?;

        tracing::debug!(
            account = %id_parent,
            slot = slot.index,
            member_id = %member_id,
            "Primary panel accepted add"
        );
        Ok(MemberHandle::MemberId(member_id))
    }

    async fn kick_member(&self, account: &str, handle: &MemberHandle) -> Result<(), PanelError> {
        let MemberHandle::MemberId(member_id) = handle else {
            return Err(PanelError::HandleMismatch {
                panel: PANEL_NAME.to_string(),
            });
        };

        let id_parent = msisdn::to_international(account);
        let token = self.config.token.expose_secret().to_string();

        let envelope = self
            .post_form(
                "kick",
                &[
                    ("token", token.as_str()),
                    ("id_parent", id_parent.as_str()),
                    ("member_id", member_id.as_str()),
                ],
            )
            .await?;
        Self::unwrap_envelope(envelope)?;

        tracing::debug!(account = %id_parent, member_id = %member_id, "Primary panel accepted kick");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flag_accepts_bool_and_strings() {
        assert!(StatusFlag::Bool(true).is_ok());
        assert!(!StatusFlag::Bool(false).is_ok());
        assert!(StatusFlag::Text("success".to_string()).is_ok());
        assert!(StatusFlag::Text("TRUE".to_string()).is_ok());
        assert!(StatusFlag::Text("1".to_string()).is_ok());
        assert!(!StatusFlag::Text("error".to_string()).is_ok());
    }

    #[test]
    fn envelope_parses_bool_and_string_status() {
        let envelope: Envelope =
            serde_json::from_str(r#"{"status": true, "data": {"members": []}}"#).unwrap();
        assert!(envelope.status.is_ok());

        let envelope: Envelope =
            serde_json::from_str(r#"{"status": "success", "message": "ok"}"#).unwrap();
        assert!(envelope.status.is_ok());

        let envelope: Envelope = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        assert!(!envelope.status.is_ok());
    }

    #[test]
    fn info_payload_maps_to_slots() {
        let data = serde_json::json!({
            "members": [
                {"slot_id": "sl-0", "slot_number": 0, "msisdn": "6281111111111", "alias": "owner", "add_chances": 0},
                {"slot_id": "sl-2", "slot_number": 2, "msisdn": "", "alias": "", "add_chances": 2},
            ]
        });
        let slots = slots_from_info(data).unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].index, 2);
        assert_eq!(slots[1].panel_member_id.as_deref(), Some("sl-2"));
        assert_eq!(slots[1].remaining_add_credits, 2);
        assert!(slots[1].is_open(2));
        assert!(!slots[0].is_open(2));
    }

    #[test]
    fn info_payload_with_wrong_shape_is_invalid() {
        let err = slots_from_info(serde_json::json!({"members": "nope"})).unwrap_err();
        assert!(matches!(err, PanelError::InvalidResponse { .. }));
    }

    #[test]
    fn member_id_accepts_string_and_number() {
        let id = member_id_from_add(&serde_json::json!({"member_id": "m-123"})).unwrap();
        assert_eq!(id, "m-123");

        let id = member_id_from_add(&serde_json::json!({"member_id": 123})).unwrap();
        assert_eq!(id, "123");

        let err = member_id_from_add(&serde_json::json!({"member_id": ""})).unwrap_err();
        assert!(matches!(err, PanelError::InvalidResponse { .. }));

        let err = member_id_from_add(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, PanelError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn kick_requires_primary_handle() {
        let panel = PrimaryPanel::new(PrimaryPanelConfig {
            base_url: "http://localhost:1".to_string(),
            token: secrecy::SecretString::from("t".to_string()),
            timeout: std::time::Duration::from_secs(1),
        });
        let err = panel
            .kick_member("081111111111", &MemberHandle::SlotIndex(2))
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::HandleMismatch { .. }));
    }
}
