//! The identity-provider capability set backed by the token
//!
//! Only List and Sign touch the hardware, each through one usage session on
//! the shared `SlotManager`. Add, Remove, RemoveAll and Lock are refused
//! without opening a session; Unlock always succeeds because this agent is
//! never locked.

use std::sync::Arc;

use ssh_agent_lib::proto::AddIdentity;
use ssh_key::public::KeyData;
use ssh_key::{Algorithm as SshAlgorithm, Signature};
use tracing::{debug, warn};

use crate::error::{CapabilityError, CryptoError, YkpivError, YkpivResult};
use crate::model::{Identity, Pin, ReaderName, SignatureHash};
use crate::ports::{DeviceFinder, IdentityProvider};
use crate::slot_manager::SlotManager;

/// SSH agent over the token's SSH slot
pub struct AgentAdapter<F: DeviceFinder> {
    manager: Arc<SlotManager<F>>,
    reader: Option<ReaderName>,
    pin: Pin,
}

impl<F: DeviceFinder> AgentAdapter<F> {
    /// `reader` of `None` means the system must have exactly one reader
    pub fn new(manager: Arc<SlotManager<F>>, reader: Option<ReaderName>, pin: Pin) -> Self {
        Self {
            manager,
            reader,
            pin,
        }
    }

    fn refuse(&self, operation: &str, err: CapabilityError) -> YkpivResult<()> {
        warn!("Refusing {} request: {}", operation, err);
        Err(YkpivError::Capability(err))
    }
}

impl<F: DeviceFinder> IdentityProvider for AgentAdapter<F> {
    fn list(&self) -> YkpivResult<Vec<Identity>> {
        let mut session = self
            .manager
            .open_for_usage(self.reader.as_ref(), &self.pin)?;
        let identity = Identity::from_rsa(&session.public_key()?)?;
        session.close();

        debug!("Listing identity {}", identity.comment());
        Ok(vec![identity])
    }

    fn sign(&self, key: &KeyData, data: &[u8], flags: u32) -> YkpivResult<Signature> {
        let hash = SignatureHash::from_agent_flags(flags).ok_or_else(|| {
            warn!("Refusing ssh-rsa (SHA-1) sign request, flags {:#x}", flags);
            YkpivError::Crypto(CryptoError::UnsupportedAlgorithm {
                algorithm: "ssh-rsa".to_string(),
            })
        })?;

        let mut session = self
            .manager
            .open_for_usage(self.reader.as_ref(), &self.pin)?;

        let identity = Identity::from_rsa(&session.public_key()?)?;
        if !identity.matches(key)? {
            warn!("Sign request for a key that is not in slot {}", session.slot());
            return Err(YkpivError::IdentityMismatch);
        }

        let digest = hash.digest(data);
        let raw = session.sign(&digest, hash)?;
        session.close();

        debug!("Signed {} bytes with {:?}", data.len(), hash);
        Signature::new(
            SshAlgorithm::Rsa {
                hash: Some(hash.to_ssh_hash()),
            },
            raw,
        )
        .map_err(|e| {
            YkpivError::Crypto(CryptoError::SignatureFailed {
                reason: format!("encoding SSH signature: {}", e),
            })
        })
    }

    fn add(&self, _identity: &AddIdentity) -> YkpivResult<()> {
        self.refuse("add", CapabilityError::AddNotSupported)
    }

    fn remove(&self, _key: &KeyData) -> YkpivResult<()> {
        self.refuse("remove", CapabilityError::RemoveNotSupported)
    }

    fn remove_all(&self) -> YkpivResult<()> {
        self.refuse("remove-all", CapabilityError::RemoveNotSupported)
    }

    fn lock(&self, _passphrase: &str) -> YkpivResult<()> {
        self.refuse("lock", CapabilityError::NotLockable)
    }

    fn unlock(&self, _passphrase: &str) -> YkpivResult<()> {
        Ok(())
    }

    fn signers(&self) -> ! {
        unreachable!("signers requested from an agent server; only agent clients hold signers")
    }
}
