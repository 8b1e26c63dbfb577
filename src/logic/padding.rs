//! EMSA-PKCS1-v1_5 encoding for raw RSA signing on the token
//!
//! The PIV applet performs the bare RSA private-key operation, so the host
//! has to hand it a fully padded block of exactly the modulus length.

use crate::error::{CryptoError, YkpivError, YkpivResult};
use crate::model::SignatureHash;

const SHA256_PREFIX: &[u8] = &[
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

const SHA512_PREFIX: &[u8] = &[
    0x30, 0x51, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, 0x05,
    0x00, 0x04, 0x40,
];

fn digest_info_prefix(hash: SignatureHash) -> &'static [u8] {
    match hash {
        SignatureHash::Sha256 => SHA256_PREFIX,
        SignatureHash::Sha512 => SHA512_PREFIX,
    }
}

/// Build `0x00 0x01 FF..FF 0x00 || DigestInfo(hash, digest)` of `modulus_len` bytes
pub fn pkcs1v15_signature_block(
    hash: SignatureHash,
    digest: &[u8],
    modulus_len: usize,
) -> YkpivResult<Vec<u8>> {
    if digest.len() != hash.output_len() {
        return Err(YkpivError::Crypto(CryptoError::SignatureFailed {
            reason: format!(
                "{:?} digest must be {} bytes, got {}",
                hash,
                hash.output_len(),
                digest.len()
            ),
        }));
    }

    let prefix = digest_info_prefix(hash);
    let t_len = prefix.len() + digest.len();
    // at least eight bytes of 0xFF padding
    if modulus_len < t_len + 11 {
        return Err(YkpivError::Crypto(CryptoError::SignatureFailed {
            reason: format!("modulus of {} bytes is too short for {:?}", modulus_len, hash),
        }));
    }

    let mut block = Vec::with_capacity(modulus_len);
    block.push(0x00);
    block.push(0x01);
    block.resize(modulus_len - t_len - 1, 0xff);
    block.push(0x00);
    block.extend_from_slice(prefix);
    block.extend_from_slice(digest);
    Ok(block)
}
