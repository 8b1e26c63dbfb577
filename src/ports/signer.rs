//! Signer trait - capability to sign a digest on the token

use crate::error::YkpivResult;
use crate::model::{Algorithm, SignatureHash, Slot};

/// Capability to sign with a key that never leaves the token
pub trait Signer {
    /// Produce an RSA PKCS#1 v1.5 signature over `digest`
    ///
    /// # Arguments
    ///
    /// * `slot` - The slot holding the private key
    /// * `algorithm` - The key algorithm of that slot
    /// * `hash` - The hash `digest` was computed with
    /// * `digest` - The already-computed message digest
    ///
    /// # Errors
    ///
    /// Returns errors if:
    /// - The digest length does not match `hash`
    /// - The PIN has not been verified and the slot policy requires it
    /// - The signing operation fails on the device
    fn sign_digest(
        &mut self,
        slot: Slot,
        algorithm: Algorithm,
        hash: SignatureHash,
        digest: &[u8],
    ) -> YkpivResult<Vec<u8>>;
}
