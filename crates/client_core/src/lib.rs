pub mod ai;
pub mod error;
pub mod export;
pub mod forms;
pub mod gateway;
pub mod report;
pub mod roster;
pub mod tracker;
pub mod views;

pub use ai::{GeminiClient, GeminiConfig, IdCardScan, OfflineReference, ReferenceService};
pub use error::{PortalError, PortalResult, ValidationErrors};
pub use forms::{ExitForm, IntakeForm};
pub use gateway::{GatewayConfig, HttpGateway, PortalGateway};
pub use roster::{Roster, RosterSnapshot};
pub use tracker::{SyncTracker, TrackingItem};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
