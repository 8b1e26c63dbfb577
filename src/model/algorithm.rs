//! Key and hash algorithms understood by the agent

use thiserror::Error;

/// Slot key algorithm
///
/// Only RSA keys are offered to SSH clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// RSA 1024-bit
    Rsa1024,
    /// RSA 2048-bit
    Rsa2048,
}

impl Algorithm {
    /// Modulus size in bits
    pub fn bits(self) -> usize {
        match self {
            Algorithm::Rsa1024 => 1024,
            Algorithm::Rsa2048 => 2048,
        }
    }

    /// Modulus size in bytes, which is also the size of a raw signature
    pub fn modulus_len(self) -> usize {
        self.bits() / 8
    }

    /// Pick the algorithm that matches a modulus of `len` bytes
    pub fn from_modulus_len(len: usize) -> Result<Self, AlgorithmError> {
        match len {
            128 => Ok(Algorithm::Rsa1024),
            256 => Ok(Algorithm::Rsa2048),
            _ => Err(AlgorithmError::Unsupported {
                algorithm: format!("RSA with {}-bit modulus", len * 8),
            }),
        }
    }

    /// Convert to yubikey crate's AlgorithmId
    pub fn to_yubikey_algorithm_id(self) -> yubikey::piv::AlgorithmId {
        match self {
            Algorithm::Rsa1024 => yubikey::piv::AlgorithmId::Rsa1024,
            Algorithm::Rsa2048 => yubikey::piv::AlgorithmId::Rsa2048,
        }
    }
}

/// Hash used for an RSA PKCS#1 v1.5 signature
///
/// Selected per request from the SSH agent sign flags. Legacy `ssh-rsa`
/// (SHA-1) signatures are not produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureHash {
    /// `rsa-sha2-256`
    Sha256,
    /// `rsa-sha2-512`
    Sha512,
}

impl SignatureHash {
    /// `SSH_AGENT_RSA_SHA2_256`
    pub const FLAG_RSA_SHA2_256: u32 = 0x02;
    /// `SSH_AGENT_RSA_SHA2_512`
    pub const FLAG_RSA_SHA2_512: u32 = 0x04;

    /// Choose the hash requested by an agent sign request.
    ///
    /// SHA-512 wins when both flags are set, as in OpenSSH. `None` when the
    /// request asks for plain `ssh-rsa`.
    pub fn from_agent_flags(flags: u32) -> Option<Self> {
        if flags & Self::FLAG_RSA_SHA2_512 != 0 {
            Some(SignatureHash::Sha512)
        } else if flags & Self::FLAG_RSA_SHA2_256 != 0 {
            Some(SignatureHash::Sha256)
        } else {
            None
        }
    }

    /// Hash `data` with this algorithm
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        use sha2::Digest;
        match self {
            SignatureHash::Sha256 => sha2::Sha256::digest(data).to_vec(),
            SignatureHash::Sha512 => sha2::Sha512::digest(data).to_vec(),
        }
    }

    /// Length of the digest in bytes
    pub fn output_len(self) -> usize {
        match self {
            SignatureHash::Sha256 => 32,
            SignatureHash::Sha512 => 64,
        }
    }

    pub fn to_ssh_hash(self) -> ssh_key::HashAlg {
        match self {
            SignatureHash::Sha256 => ssh_key::HashAlg::Sha256,
            SignatureHash::Sha512 => ssh_key::HashAlg::Sha512,
        }
    }
}

/// Errors that can occur when working with algorithms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    #[error("Algorithm not supported: {algorithm}")]
    Unsupported { algorithm: String },
}
