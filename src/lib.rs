//! slotcycle — dual-panel slot recycling engine for quota-sharing
//! accounts.
//!
//! For a batch of manager accounts the engine discovers empty, eligible
//! member slots, temporarily adds a disposable number into each slot,
//! waits, then removes it — against one of two independent backend
//! panels, falling back from primary to secondary at every step. The
//! engine exposes no network surface of its own: a front-end hands
//! [`batch::BatchRequest`] to [`batch::BatchCoordinator::run`] and
//! receives structured progress events plus a final
//! [`batch::BatchSummary`].

pub mod batch;
pub mod clock;
pub mod combo;
pub mod config;
pub mod error;
pub mod msisdn;
pub mod panel;

pub use batch::{BatchCoordinator, BatchRequest, BatchSummary, ProgressSink};
pub use clock::{Delay, TokioDelay};
pub use combo::{ComboReport, ComboRunner};
pub use config::Config;
pub use error::{Error, Result};
pub use panel::{PanelKind, PrimaryPanel, SecondaryPanel, Slot, SlotScanner};
