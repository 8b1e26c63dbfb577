//! In-memory token for tests
//!
//! `FakeToken` is the shared hardware state (slots, credentials, event log);
//! `FakeDeviceFinder` hands out `FakeYubiKey` connections to it the way PC/SC
//! hands out connections to a real reader. Every connection records its
//! open, sign and close events so tests can check serialization.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::error::{
    AuthenticationError, CryptoError, DeviceError, DiscoveryError, SlotStateError, YkpivError,
    YkpivResult,
};
use crate::model::{
    Algorithm, ManagementKey, Pin, PinPolicy, ProvisioningCertificate, ReaderName,
    SignatureHash, SigningPolicy, Slot,
};
use crate::ports::{
    DeviceFinder, DeviceInfo, KeyManager, ManagementKeyVerifier, PinVerifier, Signer,
};

/// Something that happened on the fake hardware, tagged with the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEvent {
    Open(usize),
    Sign(usize),
    Generate(usize),
    WriteCertificate(usize),
    Close(usize),
}

impl TokenEvent {
    pub fn connection(&self) -> usize {
        match *self {
            TokenEvent::Open(c)
            | TokenEvent::Sign(c)
            | TokenEvent::Generate(c)
            | TokenEvent::WriteCertificate(c)
            | TokenEvent::Close(c) => c,
        }
    }
}

/// Operations that can be made to fail on purpose
#[derive(Debug, Clone, Copy, Default)]
pub struct InjectedFailures {
    pub read: bool,
    pub generate: bool,
    pub write_certificate: bool,
}

#[derive(Debug, Clone)]
struct FakeSlot {
    key: RsaPrivateKey,
    pin_policy: PinPolicy,
    certificate: Option<ProvisioningCertificate>,
}

#[derive(Debug)]
struct TokenState {
    pin: Pin,
    mgmt_key: ManagementKey,
    slots: HashMap<Slot, FakeSlot>,
    events: Vec<TokenEvent>,
    next_connection: usize,
    failures: InjectedFailures,
    sign_delay: Option<Duration>,
    certificates_written: Vec<ProvisioningCertificate>,
}

/// Shared state of one fake token
#[derive(Debug, Clone)]
pub struct FakeToken {
    state: Arc<Mutex<TokenState>>,
}

impl FakeToken {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TokenState {
                pin: Pin::default(),
                mgmt_key: ManagementKey::default(),
                slots: HashMap::new(),
                events: Vec::new(),
                next_connection: 0,
                failures: InjectedFailures::default(),
                sign_delay: None,
                certificates_written: Vec::new(),
            })),
        }
    }

    /// A token whose SSH slot already holds a certified 1024-bit key
    pub fn provisioned() -> Self {
        let token = Self::new();
        let key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, 1024).expect("RSA keygen");
        token.state().slots.insert(
            Slot::default_ssh(),
            FakeSlot {
                key,
                pin_policy: PinPolicy::Never,
                certificate: Some(ProvisioningCertificate::new(std::time::SystemTime::now())),
            },
        );
        token
    }

    fn state(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().expect("fake token state poisoned")
    }

    pub fn public_key(&self, slot: Slot) -> Option<RsaPublicKey> {
        self.state()
            .slots
            .get(&slot)
            .map(|s| RsaPublicKey::from(&s.key))
    }

    pub fn events(&self) -> Vec<TokenEvent> {
        self.state().events.clone()
    }

    pub fn sign_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, TokenEvent::Sign(_)))
            .count()
    }

    pub fn certificates_written(&self) -> Vec<ProvisioningCertificate> {
        self.state().certificates_written.clone()
    }

    pub fn inject_failures(&self, failures: InjectedFailures) {
        self.state().failures = failures;
    }

    /// Hold every signing operation for `delay`, widening race windows
    pub fn set_sign_delay(&self, delay: Duration) {
        self.state().sign_delay = Some(delay);
    }

    fn connect(&self) -> FakeYubiKey {
        let mut state = self.state();
        let connection = state.next_connection;
        state.next_connection += 1;
        state.events.push(TokenEvent::Open(connection));
        FakeYubiKey {
            token: self.clone(),
            connection,
            authenticated: false,
            pin_verified: false,
        }
    }
}

impl Default for FakeToken {
    fn default() -> Self {
        Self::new()
    }
}

/// One connection to a `FakeToken`
#[derive(Debug)]
pub struct FakeYubiKey {
    token: FakeToken,
    connection: usize,
    pub authenticated: bool,
    pub pin_verified: bool,
}

impl FakeYubiKey {
    pub fn new() -> Self {
        FakeToken::new().connect()
    }

    pub fn connected_to(token: &FakeToken) -> Self {
        token.connect()
    }

    fn record(&self, event: TokenEvent) {
        self.token.state().events.push(event);
    }

    fn require_mgmt_auth(&self) -> YkpivResult<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(YkpivError::Authentication(
                AuthenticationError::ManagementKeyRejected {
                    reason: "Not authenticated".to_string(),
                },
            ))
        }
    }
}

impl Default for FakeYubiKey {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FakeYubiKey {
    fn drop(&mut self) {
        if let Ok(mut state) = self.token.state.lock() {
            state.events.push(TokenEvent::Close(self.connection));
        }
    }
}

impl PinVerifier for FakeYubiKey {
    fn verify_pin(&mut self, pin: &Pin) -> YkpivResult<()> {
        if pin == &self.token.state().pin {
            self.pin_verified = true;
            Ok(())
        } else {
            Err(YkpivError::Authentication(AuthenticationError::PinRejected {
                reason: "verification failed (tries remaining: 2)".to_string(),
            }))
        }
    }
}

impl ManagementKeyVerifier for FakeYubiKey {
    fn authenticate(&mut self, mgmt_key: &ManagementKey) -> YkpivResult<()> {
        if mgmt_key == &self.token.state().mgmt_key {
            self.authenticated = true;
            Ok(())
        } else {
            Err(YkpivError::Authentication(
                AuthenticationError::ManagementKeyRejected {
                    reason: "Invalid Management Key".to_string(),
                },
            ))
        }
    }
}

impl KeyManager for FakeYubiKey {
    fn read_public_key(&mut self, slot: Slot) -> YkpivResult<RsaPublicKey> {
        let state = self.token.state();
        if state.failures.read {
            return Err(YkpivError::Device(DeviceError::ReadFailed {
                reason: "injected read failure".to_string(),
            }));
        }
        // the public key is only readable through the slot certificate
        match state.slots.get(&slot) {
            Some(FakeSlot {
                key,
                certificate: Some(_),
                ..
            }) => Ok(RsaPublicKey::from(key)),
            _ => Err(YkpivError::SlotState(SlotStateError::NotInitialized {
                slot: slot.to_string(),
            })),
        }
    }

    fn generate_key(&mut self, slot: Slot, policy: &SigningPolicy) -> YkpivResult<RsaPublicKey> {
        self.require_mgmt_auth()?;
        if self.token.state().failures.generate {
            return Err(YkpivError::Crypto(CryptoError::KeyGenerationFailed {
                reason: "injected generation failure".to_string(),
            }));
        }

        let key = RsaPrivateKey::new(&mut rsa::rand_core::OsRng, policy.algorithm.bits())
            .map_err(|e| {
                YkpivError::Crypto(CryptoError::KeyGenerationFailed {
                    reason: e.to_string(),
                })
            })?;
        let public_key = RsaPublicKey::from(&key);

        let mut state = self.token.state();
        state.events.push(TokenEvent::Generate(self.connection));
        state.slots.insert(
            slot,
            FakeSlot {
                key,
                pin_policy: policy.pin_policy,
                certificate: None,
            },
        );
        Ok(public_key)
    }

    fn write_certificate(
        &mut self,
        slot: Slot,
        public_key: &RsaPublicKey,
        certificate: &ProvisioningCertificate,
    ) -> YkpivResult<()> {
        self.require_mgmt_auth()?;
        let connection = self.connection;
        let mut state = self.token.state();
        if state.failures.write_certificate {
            return Err(YkpivError::Crypto(CryptoError::CertificateFailed {
                reason: "injected certificate write failure".to_string(),
            }));
        }

        let fake_slot = state.slots.get_mut(&slot).ok_or_else(|| {
            YkpivError::Crypto(CryptoError::CertificateFailed {
                reason: format!("slot {} holds no key to sign with", slot),
            })
        })?;
        if &RsaPublicKey::from(&fake_slot.key) != public_key {
            return Err(YkpivError::Crypto(CryptoError::CertificateFailed {
                reason: "public key does not belong to the slot key".to_string(),
            }));
        }
        fake_slot.certificate = Some(certificate.clone());
        state.certificates_written.push(certificate.clone());
        state.events.push(TokenEvent::WriteCertificate(connection));
        Ok(())
    }
}

impl Signer for FakeYubiKey {
    fn sign_digest(
        &mut self,
        slot: Slot,
        algorithm: Algorithm,
        hash: SignatureHash,
        digest: &[u8],
    ) -> YkpivResult<Vec<u8>> {
        if digest.len() != hash.output_len() {
            return Err(YkpivError::Crypto(CryptoError::SignatureFailed {
                reason: format!("digest must be {} bytes", hash.output_len()),
            }));
        }

        let (key, delay) = {
            let state = self.token.state();
            let fake_slot = state.slots.get(&slot).ok_or_else(|| {
                YkpivError::SlotState(SlotStateError::NotInitialized {
                    slot: slot.to_string(),
                })
            })?;
            if fake_slot.pin_policy != PinPolicy::Never && !self.pin_verified {
                return Err(YkpivError::Authentication(AuthenticationError::PinRejected {
                    reason: "PIN required".to_string(),
                }));
            }
            if fake_slot.key.size() != algorithm.modulus_len() {
                return Err(YkpivError::Crypto(CryptoError::SignatureFailed {
                    reason: format!("slot key is not {:?}", algorithm),
                }));
            }
            (fake_slot.key.clone(), state.sign_delay)
        };

        self.record(TokenEvent::Sign(self.connection));
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let padding = match hash {
            SignatureHash::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
            SignatureHash::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
        };
        key.sign(padding, digest).map_err(|e| {
            YkpivError::Crypto(CryptoError::SignatureFailed {
                reason: e.to_string(),
            })
        })
    }
}

impl DeviceInfo for FakeYubiKey {
    fn version(&self) -> String {
        "5.4.3".to_string()
    }
}

/// Finder over a fixed set of readers that all lead to the same token
#[derive(Debug, Clone)]
pub struct FakeDeviceFinder {
    pub readers: Vec<ReaderName>,
    pub token: FakeToken,
}

impl FakeDeviceFinder {
    /// One reader holding `token`
    pub fn single(token: FakeToken) -> Self {
        Self {
            readers: vec![ReaderName::new("Yubico YubiKey OTP+FIDO+CCID 00 00")],
            token,
        }
    }

    pub fn with_readers(token: FakeToken, count: usize) -> Self {
        Self {
            readers: (0..count)
                .map(|i| ReaderName::new(format!("Yubico YubiKey OTP+FIDO+CCID 0{} 00", i)))
                .collect(),
            token,
        }
    }
}

impl DeviceFinder for FakeDeviceFinder {
    type Device = FakeYubiKey;

    fn readers(&self) -> YkpivResult<Vec<ReaderName>> {
        Ok(self.readers.clone())
    }

    fn open(&self, reader: &ReaderName) -> YkpivResult<Self::Device> {
        if !self.readers.contains(reader) {
            return Err(YkpivError::Discovery(DiscoveryError::ReaderNotFound {
                reader: reader.to_string(),
            }));
        }
        Ok(self.token.connect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract_tests_for;
    use crate::ports::contract_tests::token_contract;

    contract_tests_for!(
        fake_yubikey_contract,
        make = FakeYubiKey::new,
        tests = {
            test_pin_verification_success => token_contract::test_pin_verification_success,
            test_pin_verification_failure => token_contract::test_pin_verification_failure,
            test_mgmt_key_authentication_success_default => token_contract::test_mgmt_key_authentication_success_default,
            test_mgmt_key_authentication_failure => token_contract::test_mgmt_key_authentication_failure,
            test_generate_key_not_authenticated => token_contract::test_generate_key_not_authenticated,
            test_generate_certify_and_sign => token_contract::test_generate_certify_and_sign,
            test_sign_rejects_wrong_digest_length => token_contract::test_sign_rejects_wrong_digest_length,
        }
    );

    #[test]
    fn test_read_empty_slot_is_not_initialized() {
        let mut device = FakeYubiKey::new();
        let err = device.read_public_key(Slot::default_ssh()).unwrap_err();
        assert!(err.is_slot_empty());
    }

    #[test]
    fn test_injected_read_failure_is_not_emptiness() {
        let token = FakeToken::provisioned();
        token.inject_failures(InjectedFailures {
            read: true,
            ..InjectedFailures::default()
        });
        let mut device = FakeYubiKey::connected_to(&token);
        let err = device.read_public_key(Slot::default_ssh()).unwrap_err();
        assert!(!err.is_slot_empty());
    }

    #[test]
    fn test_connection_events() {
        let token = FakeToken::new();
        {
            let _first = FakeYubiKey::connected_to(&token);
        }
        let _second = FakeYubiKey::connected_to(&token);
        assert_eq!(
            token.events(),
            vec![TokenEvent::Open(0), TokenEvent::Close(0), TokenEvent::Open(1)]
        );
    }

    #[test]
    fn test_finder_rejects_unknown_reader() {
        let finder = FakeDeviceFinder::single(FakeToken::new());
        let result = finder.open(&ReaderName::new("nope"));
        assert!(matches!(
            result.unwrap_err(),
            YkpivError::Discovery(DiscoveryError::ReaderNotFound { .. })
        ));
    }
}
