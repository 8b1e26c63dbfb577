//! Adapters - concrete implementations of ports (traits)

mod yubikey_piv;

#[cfg(test)]
pub mod fake_yubikey;

pub use yubikey_piv::{PivDeviceFinder, PivYubiKey};
