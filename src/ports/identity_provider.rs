//! The identity-provider capability set served to SSH clients

use ssh_agent_lib::proto::AddIdentity;
use ssh_key::public::KeyData;
use ssh_key::Signature;

use crate::error::YkpivResult;
use crate::model::Identity;

/// Operations an SSH agent answers on behalf of its clients
///
/// Every method is blocking; callers on an async runtime must move the call
/// onto a blocking thread.
pub trait IdentityProvider {
    /// Identities available for signing
    fn list(&self) -> YkpivResult<Vec<Identity>>;

    /// Sign `data` with the key identified by `key`
    ///
    /// `flags` are the raw agent sign-request flags.
    fn sign(&self, key: &KeyData, data: &[u8], flags: u32) -> YkpivResult<Signature>;

    /// Add a private key
    fn add(&self, identity: &AddIdentity) -> YkpivResult<()>;

    /// Remove the identity for `key`
    fn remove(&self, key: &KeyData) -> YkpivResult<()>;

    /// Remove every identity
    fn remove_all(&self) -> YkpivResult<()>;

    /// Lock the agent with `passphrase`
    fn lock(&self, passphrase: &str) -> YkpivResult<()>;

    /// Undo the effect of `lock`
    fn unlock(&self, passphrase: &str) -> YkpivResult<()>;

    /// Signers for all known keys
    ///
    /// Only meaningful for an agent client; a server must never be asked.
    fn signers(&self) -> !;
}
