//! Management Key type for YubiKey PIV authentication
//!
//! This module defines a domain type for the PIV Management Key and
//! provides idiomatic conversions to the yubikey crate's `MgmKey`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use yubikey::MgmKey;

/// Management Key for YubiKey PIV authentication
///
/// A Management Key is a 24-byte key (3 DES keys of 8 bytes each) used to
/// authenticate for key management operations on the YubiKey.
/// This type ensures key validity at construction time.
#[derive(Clone, PartialEq, Eq)]
pub struct ManagementKey([u8; 24]);

impl ManagementKey {
    /// Management Key length in bytes
    pub const LENGTH: usize = 24;

    /// Factory default management key of the PIV applet
    pub const DEFAULT: ManagementKey = ManagementKey([
        0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
        0x08, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08,
    ]);

    pub const fn new(key: [u8; 24]) -> Self {
        Self(key)
    }

    /// Create a Management Key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly 24 bytes
    pub fn from_slice(key: &[u8]) -> Result<Self, ManagementKeyError> {
        if key.len() != Self::LENGTH {
            return Err(ManagementKeyError::InvalidLength {
                expected: Self::LENGTH,
                actual: key.len(),
            });
        }
        let mut bytes = [0u8; 24];
        bytes.copy_from_slice(key);
        Ok(Self(bytes))
    }

    /// Parse a Management Key from its 48-character hex form
    pub fn from_hex(key: &str) -> Result<Self, ManagementKeyError> {
        let bytes = hex::decode(key.trim()).map_err(|e| ManagementKeyError::InvalidHex {
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    /// Get the Management Key as a byte slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the Management Key as an array reference
    pub fn as_array(&self) -> &[u8; 24] {
        &self.0
    }
}

impl Default for ManagementKey {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for ManagementKey {
    type Err = ManagementKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for ManagementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManagementKey([REDACTED])")
    }
}

/// Errors that can occur when creating or converting a Management Key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManagementKeyError {
    /// Management Key has invalid length
    #[error("Management Key must be exactly {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Management Key is not valid hex
    #[error("Management Key is not valid hex: {reason}")]
    InvalidHex { reason: String },

    /// Underlying yubikey crate rejected the key material
    #[error("Invalid Management Key material: {reason}")]
    InvalidMaterial { reason: String },
}

/// Fallible conversion from domain `ManagementKey` to yubikey crate's `MgmKey`.
///
/// The yubikey crate refuses weak 3DES keys, so this can fail even for a
/// well-formed 24-byte value.
impl TryFrom<&ManagementKey> for MgmKey {
    type Error = ManagementKeyError;

    fn try_from(key: &ManagementKey) -> Result<Self, Self::Error> {
        MgmKey::new(*key.as_array()).map_err(|e| ManagementKeyError::InvalidMaterial {
            reason: e.to_string(),
        })
    }
}
