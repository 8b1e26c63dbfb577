//! Domain types for token operations
//!
//! This module defines domain-specific types that wrap primitives to:
//! - Prevent primitive obsession
//! - Enforce invariants at construction
//! - Keep secrets out of logs

mod algorithm;
mod certificate;
mod identity;
mod mgmt_key;
mod pin;
mod policy;
mod reader;
mod slot;

pub use algorithm::{Algorithm, AlgorithmError, SignatureHash};
pub use certificate::{KeyUsage, ProvisioningCertificate};
pub use identity::Identity;
pub use mgmt_key::{ManagementKey, ManagementKeyError};
pub use pin::{Pin, PinError};
pub use policy::{PinPolicy, SigningPolicy, TouchPolicy};
pub use reader::{ReaderInfo, ReaderName};
pub use slot::Slot;
