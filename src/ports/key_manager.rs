//! KeyManager trait - capability to inspect and (re)provision a slot

use rsa::RsaPublicKey;

use crate::error::YkpivResult;
use crate::model::{ProvisioningCertificate, SigningPolicy, Slot};

/// Capability to read, generate and certify the key in a slot
pub trait KeyManager {
    /// Read the public key of the key pair in `slot`
    ///
    /// # Errors
    ///
    /// Returns `SlotStateError::NotInitialized` when the token reports the
    /// slot as empty. Any other failure is a device or crypto error and must
    /// not be read as emptiness.
    fn read_public_key(&mut self, slot: Slot) -> YkpivResult<RsaPublicKey>;

    /// Generate a new key pair in `slot`, replacing whatever was there
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// - Device is not authenticated with the management key
    /// - Key generation fails on the device
    fn generate_key(&mut self, slot: Slot, policy: &SigningPolicy) -> YkpivResult<RsaPublicKey>;

    /// Self-sign `certificate` with the slot key and store it in `slot`
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// - Device is not authenticated with the management key
    /// - Certificate construction or storage fails
    fn write_certificate(
        &mut self,
        slot: Slot,
        public_key: &RsaPublicKey,
        certificate: &ProvisioningCertificate,
    ) -> YkpivResult<()>;
}
