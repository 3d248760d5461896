//! Panel clients and the uniform slot model.
//!
//! Two independent backend panels expose the same conceptual operations
//! (list an account's member slots, add a member, kick a member) through
//! structurally different APIs. Both are normalized here into [`Slot`],
//! [`SlotDirectory`] and [`SlotMutator`] so the engine above never sees
//! wire shapes.

mod primary;
mod scan;
mod secondary;

pub use primary::PrimaryPanel;
pub use scan::{SlotScan, SlotScanner};
pub use secondary::SecondaryPanel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PanelError;

/// Which backend panel an operation ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Primary,
    Secondary,
}

impl std::str::FromStr for PanelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            _ => Err(format!(
                "invalid panel kind '{}', expected one of: primary, secondary",
                s
            )),
        }
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Secondary => write!(f, "secondary"),
        }
    }
}

/// One member position under an account.
///
/// Slots are read fresh before every mutation attempt; the panels change
/// slot state after each add/kick, so a cached `Slot` is stale by
/// definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Position under the account. Index 0 is the account holder itself.
    pub index: u32,
    /// Panel-assigned slot identifier, when the panel exposes one.
    pub panel_member_id: Option<String>,
    /// How many more adds the panel will accept on this slot.
    pub remaining_add_credits: u32,
    /// Occupant number, empty when the slot is vacant.
    pub occupant_msisdn: String,
    /// Occupant display name, empty when the slot is vacant.
    pub occupant_name: String,
}

impl Slot {
    /// Whether this slot can receive a recycle attempt.
    ///
    /// Index 0 is reserved for the account holder. Occupied slots and
    /// slots whose credit counter has drifted off `required_credits` are
    /// skipped rather than risked.
    pub fn is_open(&self, required_credits: u32) -> bool {
        self.index >= 1
            && self.remaining_add_credits == required_credits
            && self.occupant_msisdn.is_empty()
            && self.occupant_name.is_empty()
    }
}

/// Panel-paired member identifier.
///
/// The primary panel identifies a member by the opaque id returned from
/// its own add call; the secondary panel addresses by slot index and
/// returns no stable id. A kick is only valid with the handle minted by
/// the paired add, which is why the two spaces are kept in one enum
/// instead of a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberHandle {
    /// Opaque member id from the primary panel's add response.
    MemberId(String),
    /// Slot index, the secondary panel's only addressing scheme.
    SlotIndex(u32),
}

/// Read access to an account's member slots.
#[async_trait]
pub trait SlotDirectory: Send + Sync {
    /// Which panel this directory queries.
    fn kind(&self) -> PanelKind;

    /// Fetch the account's member slots.
    ///
    /// An empty or absent slot array is an error (`PanelError::NoSlots`)
    /// so the caller's fallback policy can treat it like a transport
    /// failure.
    async fn fetch_slots(&self, account: &str) -> Result<Vec<Slot>, PanelError>;
}

/// Mutation access to an account's member slots.
#[async_trait]
pub trait SlotMutator: Send + Sync {
    /// Which panel this mutator targets.
    fn kind(&self) -> PanelKind;

    /// Add `msisdn` into `slot`, returning the handle a paired kick must
    /// use.
    async fn add_member(
        &self,
        account: &str,
        slot: &Slot,
        msisdn: &str,
    ) -> Result<MemberHandle, PanelError>;

    /// Remove the member identified by `handle`.
    async fn kick_member(&self, account: &str, handle: &MemberHandle) -> Result<(), PanelError>;
}
