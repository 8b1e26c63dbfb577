//! SSH agent backed by the PIV applet of a YubiKey
//!
//! The private key never leaves the token. All hardware access goes through
//! one [`slot_manager::SlotManager`], which serializes sessions process-wide.

mod adapters;
pub mod agent;
pub mod api;
pub mod error;
mod logic;
pub mod model;
pub mod ports;
pub mod slot_manager;
pub mod use_cases;

// Re-export commonly used types
pub use error::{YkpivError, YkpivResult};

pub use adapters::{PivDeviceFinder, PivYubiKey};
pub use agent::AgentAdapter;
pub use slot_manager::SlotManager;
pub use use_cases::{ProvisioningController, ProvisioningRequest};
