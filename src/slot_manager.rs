//! Exclusive access to the token's SSH slot
//!
//! The PIV applet handles one authenticated session at a time. `SlotManager`
//! owns the device finder behind a single-permit lock; every session holds
//! that lock from open to close, so hardware operations from concurrent
//! callers run one after another in lock-acquisition (FIFO) order.
//!
//! The lock is acquired with `blocking_lock`, so sessions must be opened from
//! a blocking context (a plain thread or `tokio::task::spawn_blocking`),
//! never directly on an async worker.
//!
//! No timeout is applied: a hardware call that never returns stalls every
//! other caller.

use std::marker::PhantomData;

use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{DiscoveryError, YkpivError, YkpivResult};
use crate::model::{
    Algorithm, ManagementKey, Pin, ProvisioningCertificate, ReaderInfo, ReaderName,
    SignatureHash, SigningPolicy, Slot,
};
use crate::ports::{
    DeviceFinder, DeviceInfo, KeyManager, ManagementKeyVerifier, PinVerifier, Signer,
};

mod sealed {
    pub trait Sealed {}
}

/// How a session was authenticated
pub trait SessionMode: sealed::Sealed {
    const NAME: &'static str;
}

/// Unauthenticated session; may only read the slot's public key
#[derive(Debug)]
pub enum ReadOnly {}

/// PIN-authenticated session; may read and sign
#[derive(Debug)]
pub enum Usage {}

/// Management-key-authenticated session; may generate keys and write the slot
#[derive(Debug)]
pub enum Administration {}

impl sealed::Sealed for ReadOnly {}
impl sealed::Sealed for Usage {}
impl sealed::Sealed for Administration {}

impl SessionMode for ReadOnly {
    const NAME: &'static str = "read-only";
}

impl SessionMode for Usage {
    const NAME: &'static str = "usage";
}

impl SessionMode for Administration {
    const NAME: &'static str = "administration";
}

/// Single path to the physical token
pub struct SlotManager<F: DeviceFinder> {
    finder: Mutex<F>,
    slot: Slot,
}

impl<F: DeviceFinder> SlotManager<F> {
    /// Manager for the conventional SSH slot
    pub fn new(finder: F) -> Self {
        Self {
            finder: Mutex::new(finder),
            slot: Slot::default_ssh(),
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Open a session that can only read the public key
    pub fn open_for_read(
        &self,
        reader: Option<&ReaderName>,
    ) -> YkpivResult<SlotSession<'_, F, ReadOnly>> {
        self.open(reader, |_| Ok(()))
    }

    /// Open a session authenticated with the user PIN
    pub fn open_for_usage(
        &self,
        reader: Option<&ReaderName>,
        pin: &Pin,
    ) -> YkpivResult<SlotSession<'_, F, Usage>> {
        self.open(reader, |device| device.verify_pin(pin))
    }

    /// Open a session authenticated with the management key
    pub fn open_for_administration(
        &self,
        reader: Option<&ReaderName>,
        mgmt_key: &ManagementKey,
    ) -> YkpivResult<SlotSession<'_, F, Administration>> {
        self.open(reader, |device| device.authenticate(mgmt_key))
    }

    /// Every attached reader with the firmware version of its token
    ///
    /// Takes the lock for the whole sweep; a reader that cannot be opened is
    /// reported with the reason instead of a version.
    pub fn describe_readers(&self) -> YkpivResult<Vec<ReaderInfo>> {
        let guard = self.finder.blocking_lock();
        let readers = guard.readers()?;
        Ok(readers
            .into_iter()
            .map(|name| {
                let version = guard
                    .open(&name)
                    .map(|device| device.version())
                    .map_err(|e| e.to_string());
                ReaderInfo { name, version }
            })
            .collect())
    }

    fn open<M: SessionMode>(
        &self,
        reader: Option<&ReaderName>,
        login: impl FnOnce(&mut F::Device) -> YkpivResult<()>,
    ) -> YkpivResult<SlotSession<'_, F, M>> {
        let guard = self.finder.blocking_lock();
        let reader = resolve_reader(&*guard, reader)?;

        let mut device = guard.open(&reader)?;
        login(&mut device)?;
        debug!("Opened {} session on {} slot {}", M::NAME, reader, self.slot);

        Ok(SlotSession {
            device,
            slot: self.slot,
            reader,
            public_key: None,
            _guard: guard,
            _mode: PhantomData,
        })
    }
}

/// Pick the reader to open
///
/// With no explicit choice the system must have exactly one reader.
fn resolve_reader<F: DeviceFinder>(
    finder: &F,
    requested: Option<&ReaderName>,
) -> YkpivResult<ReaderName> {
    if let Some(reader) = requested {
        return Ok(reader.clone());
    }

    let mut readers = finder.readers()?;
    if readers.len() != 1 {
        return Err(YkpivError::Discovery(DiscoveryError::ReaderCount {
            found: readers.len(),
        }));
    }
    Ok(readers.remove(0))
}

/// An open connection to the slot, holding the hardware lock
///
/// Dropping the session closes the device and then releases the lock, on
/// every exit path.
pub struct SlotSession<'a, F: DeviceFinder, M: SessionMode> {
    // dropped before the guard
    device: F::Device,
    slot: Slot,
    reader: ReaderName,
    public_key: Option<RsaPublicKey>,
    _guard: MutexGuard<'a, F>,
    _mode: PhantomData<M>,
}

impl<F: DeviceFinder, M: SessionMode> SlotSession<'_, F, M> {
    pub fn reader(&self) -> &ReaderName {
        &self.reader
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Public key of the slot's current key pair
    pub fn public_key(&mut self) -> YkpivResult<RsaPublicKey> {
        if let Some(key) = &self.public_key {
            return Ok(key.clone());
        }
        let key = self.device.read_public_key(self.slot)?;
        self.public_key = Some(key.clone());
        Ok(key)
    }

    /// Close the session and release the lock
    pub fn close(self) {}
}

impl<F: DeviceFinder> SlotSession<'_, F, Usage> {
    /// Sign an already-computed `digest` with the slot key
    pub fn sign(&mut self, digest: &[u8], hash: SignatureHash) -> YkpivResult<Vec<u8>> {
        let algorithm = Algorithm::from_modulus_len(self.public_key()?.size())?;
        self.device.sign_digest(self.slot, algorithm, hash, digest)
    }
}

impl<F: DeviceFinder> SlotSession<'_, F, Administration> {
    /// Generate a fresh key pair in the slot, replacing any existing one
    pub fn generate_key(&mut self, policy: &SigningPolicy) -> YkpivResult<RsaPublicKey> {
        self.public_key = None;
        let key = self.device.generate_key(self.slot, policy)?;
        self.public_key = Some(key.clone());
        Ok(key)
    }

    /// Self-sign `certificate` for `public_key` and store it in the slot
    pub fn write_certificate(
        &mut self,
        public_key: &RsaPublicKey,
        certificate: &ProvisioningCertificate,
    ) -> YkpivResult<()> {
        self.device
            .write_certificate(self.slot, public_key, certificate)
    }
}

impl<F: DeviceFinder, M: SessionMode> Drop for SlotSession<'_, F, M> {
    fn drop(&mut self) {
        debug!("Closing {} session on {}", M::NAME, self.reader);
    }
}
