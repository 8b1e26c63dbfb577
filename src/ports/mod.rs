//! Ports (traits) for token operations
//!
//! These traits define the capabilities required from a PIV token and the
//! capability set the agent offers its clients. The core depends on these
//! abstractions, not on the PC/SC implementation.

mod device_finder;
mod identity_provider;
mod key_manager;
mod mgmt_key_verifier;
mod pin_verifier;
mod signer;

pub use device_finder::{DeviceFinder, DeviceInfo};
pub use identity_provider::IdentityProvider;
pub use key_manager::KeyManager;
pub use mgmt_key_verifier::ManagementKeyVerifier;
pub use pin_verifier::PinVerifier;
pub use signer::Signer;

/// Combined trait for all token operations
///
/// A device handle typically implements this.
pub trait TokenOps: PinVerifier + ManagementKeyVerifier + KeyManager + Signer + DeviceInfo {}

// Blanket implementation for types that implement all operation traits
impl<T> TokenOps for T where T: PinVerifier + ManagementKeyVerifier + KeyManager + Signer + DeviceInfo {}
