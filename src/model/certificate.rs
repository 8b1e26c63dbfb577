//! Placeholder certificate written next to a freshly generated slot key
//!
//! The PIV applet expects every populated slot to carry a certificate. This
//! one is self-signed, is never used as a trust anchor and exists only to
//! keep the applet and reader tooling happy.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::RngCore;

/// X.509 key usage bits set on the placeholder certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsage {
    DigitalSignature,
    KeyEncipherment,
    KeyAgreement,
}

/// Certificate template for a provisioned slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningCertificate {
    serial: [u8; Self::SERIAL_LEN],
    not_before: SystemTime,
}

impl ProvisioningCertificate {
    pub const SUBJECT: &'static str = "CN=SSH";

    /// Serial numbers are drawn uniformly from a 128-bit space
    pub const SERIAL_LEN: usize = 16;

    /// Ten years of 365 days
    pub const VALIDITY: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 10);

    pub const KEY_USAGE: [KeyUsage; 3] = [
        KeyUsage::KeyEncipherment,
        KeyUsage::DigitalSignature,
        KeyUsage::KeyAgreement,
    ];

    /// Template valid from `now` with a fresh random serial
    pub fn new(now: SystemTime) -> Self {
        let mut serial = [0u8; Self::SERIAL_LEN];
        rand::rng().fill_bytes(&mut serial);
        Self::with_serial(serial, now)
    }

    /// Template with an explicit serial
    ///
    /// `now` is truncated to whole seconds, the resolution of X.509 times.
    pub fn with_serial(serial: [u8; Self::SERIAL_LEN], now: SystemTime) -> Self {
        let secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            serial,
            not_before: UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    pub fn serial(&self) -> &[u8; Self::SERIAL_LEN] {
        &self.serial
    }

    pub fn subject(&self) -> &'static str {
        Self::SUBJECT
    }

    pub fn not_before(&self) -> SystemTime {
        self.not_before
    }

    pub fn not_after(&self) -> SystemTime {
        self.not_before + Self::VALIDITY
    }

    pub fn key_usage(&self) -> &'static [KeyUsage] {
        &Self::KEY_USAGE
    }
}
