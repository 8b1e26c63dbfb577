//! The public half of the slot key as SSH clients see it

use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use ssh_key::public::{KeyData, RsaPublicKey as SshRsaPublicKey};
use ssh_key::{Mpint, PublicKey};

use crate::error::{CryptoError, YkpivError, YkpivResult};

/// SSH identity backed by the token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    public_key: PublicKey,
}

impl Identity {
    /// Comment attached to every identity this agent offers
    pub const COMMENT: &'static str = "yubikey-backed key";

    /// Build the identity for an RSA public key read from the slot
    pub fn from_rsa(key: &RsaPublicKey) -> YkpivResult<Self> {
        let e = Mpint::from_positive_bytes(&key.e().to_bytes_be()).map_err(ssh_key_error)?;
        let n = Mpint::from_positive_bytes(&key.n().to_bytes_be()).map_err(ssh_key_error)?;
        let key_data = KeyData::Rsa(SshRsaPublicKey { e, n });
        Ok(Self {
            public_key: PublicKey::new(key_data, Self::COMMENT),
        })
    }

    pub fn key_data(&self) -> &KeyData {
        self.public_key.key_data()
    }

    pub fn comment(&self) -> &str {
        self.public_key.comment()
    }

    /// SSH wire encoding of the public key, as sent in an identities answer
    pub fn blob(&self) -> YkpivResult<Vec<u8>> {
        self.public_key.to_bytes().map_err(ssh_key_error)
    }

    /// Byte-for-byte comparison against a key named in a request
    pub fn matches(&self, other: &KeyData) -> YkpivResult<bool> {
        let other = PublicKey::from(other.clone()).to_bytes().map_err(ssh_key_error)?;
        Ok(self.blob()? == other)
    }

    /// One line in `authorized_keys` format
    pub fn to_authorized_key(&self) -> YkpivResult<String> {
        self.public_key.to_openssh().map_err(ssh_key_error)
    }
}

fn ssh_key_error(err: ssh_key::Error) -> YkpivError {
    YkpivError::Crypto(CryptoError::InvalidKeyFormat {
        format: format!("SSH public key encoding: {}", err),
    })
}
