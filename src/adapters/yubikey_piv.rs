//! PIV (Personal Identity Verification) implementation of token operations
//!
//! This module provides concrete implementations of the token traits using
//! the yubikey crate's PC/SC transport and PIV functionality.

use std::str::FromStr;
use std::time::SystemTime;

use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::RsaPublicKey;
use tracing::{debug, info};
use x509_cert::der::{self, Decode, Encode};
use x509_cert::ext::pkix::{BasicConstraints, KeyUsage as X509KeyUsage, KeyUsages};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};
use yubikey::certificate::yubikey_signer::{self, KeyType};
use yubikey::certificate::Certificate;
use yubikey::piv::{generate, sign_data};
use yubikey::{Buffer, Context, MgmKey, YubiKey};

use crate::error::{
    AuthenticationError, CryptoError, DeviceError, DiscoveryError, SlotStateError, YkpivError,
    YkpivResult,
};
use crate::logic::{certificate_der, pkcs1v15_signature_block};
use crate::model::{
    Algorithm, KeyUsage, ManagementKey, Pin, ProvisioningCertificate, ReaderName,
    SignatureHash, SigningPolicy, Slot,
};
use crate::ports::{
    DeviceFinder, DeviceInfo, KeyManager, ManagementKeyVerifier, PinVerifier, Signer,
};

/// PC/SC device finder
///
/// Every call opens a fresh PC/SC context, so readers attached after start-up
/// are picked up.
#[derive(Debug, Clone, Copy, Default)]
pub struct PivDeviceFinder;

impl PivDeviceFinder {
    fn context() -> YkpivResult<Context> {
        Context::open().map_err(|e| {
            YkpivError::Discovery(DiscoveryError::ListFailed {
                reason: format!("failed to open PC/SC context: {}", e),
            })
        })
    }
}

impl DeviceFinder for PivDeviceFinder {
    type Device = PivYubiKey;

    fn readers(&self) -> YkpivResult<Vec<ReaderName>> {
        let mut context = Self::context()?;
        let readers = context.iter().map_err(|e| {
            YkpivError::Discovery(DiscoveryError::ListFailed {
                reason: e.to_string(),
            })
        })?;
        Ok(readers
            .map(|reader| ReaderName::new(reader.name().into_owned()))
            .collect())
    }

    fn open(&self, reader: &ReaderName) -> YkpivResult<Self::Device> {
        let mut context = Self::context()?;
        let readers = context.iter().map_err(|e| {
            YkpivError::Discovery(DiscoveryError::ListFailed {
                reason: e.to_string(),
            })
        })?;

        for candidate in readers {
            if candidate.name() != reader.as_str() {
                continue;
            }
            let device = candidate.open().map_err(|e| {
                YkpivError::Device(DeviceError::OpenFailed {
                    reader: reader.to_string(),
                    reason: e.to_string(),
                })
            })?;
            debug!("Connected to YubiKey in reader {}", reader);
            return Ok(PivYubiKey::new(device));
        }

        Err(YkpivError::Discovery(DiscoveryError::ReaderNotFound {
            reader: reader.to_string(),
        }))
    }
}

/// PIV connection to one token
///
/// Dropping the handle releases the PC/SC card handle.
#[derive(Debug)]
pub struct PivYubiKey {
    device: YubiKey,
    authenticated: bool,
}

impl PivYubiKey {
    pub fn new(device: YubiKey) -> Self {
        Self {
            device,
            authenticated: false,
        }
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

    fn self_sign<KT: KeyType>(
        &mut self,
        slot: Slot,
        spki: SubjectPublicKeyInfoOwned,
        certificate: &ProvisioningCertificate,
    ) -> YkpivResult<()> {
        let serial = SerialNumber::new(certificate.serial()).map_err(certificate_error)?;
        let validity = Validity {
            not_before: to_x509_time(certificate.not_before())?,
            not_after: to_x509_time(certificate.not_after())?,
        };
        let subject = Name::from_str(certificate.subject()).map_err(certificate_error)?;
        let key_usage = to_x509_key_usage(certificate.key_usage());

        Certificate::generate_self_signed::<_, KT>(
            &mut self.device,
            slot.to_yubikey_slot_id(),
            serial,
            validity,
            subject,
            spki,
            |builder| {
                builder.add_extension(&key_usage).map_err(builder_error)?;
                builder
                    .add_extension(&BasicConstraints {
                        ca: false,
                        path_len_constraint: None,
                    })
                    .map_err(builder_error)
            },
        )
        .map_err(|e| {
            YkpivError::Crypto(CryptoError::CertificateFailed {
                reason: format!("failed to store certificate: {}", e),
            })
        })?;
        Ok(())
    }
}

impl ManagementKeyVerifier for PivYubiKey {
    fn authenticate(&mut self, mgmt_key: &ManagementKey) -> YkpivResult<()> {
        let mgm_key = MgmKey::try_from(mgmt_key)?;

        self.device.authenticate(mgm_key).map_err(|e| {
            YkpivError::Authentication(AuthenticationError::ManagementKeyRejected {
                reason: e.to_string(),
            })
        })?;

        self.authenticated = true;
        debug!("YubiKey authenticated with management key");
        Ok(())
    }
}

impl PinVerifier for PivYubiKey {
    fn verify_pin(&mut self, pin: &Pin) -> YkpivResult<()> {
        self.device.verify_pin(pin.as_bytes()).map_err(|e| {
            YkpivError::Authentication(AuthenticationError::PinRejected {
                reason: e.to_string(),
            })
        })?;

        debug!("PIN verified successfully");
        Ok(())
    }
}

impl KeyManager for PivYubiKey {
    fn read_public_key(&mut self, slot: Slot) -> YkpivResult<RsaPublicKey> {
        // Certificate::read reports transport errors as an empty slot, so the
        // object is fetched directly and only a not-found status means empty.
        let fetched = self.device.fetch_object(slot.certificate_object_id());
        let object = certificate_object(fetched, slot)?;
        let der = certificate_der(&object)?.ok_or_else(|| {
            YkpivError::SlotState(SlotStateError::NotInitialized {
                slot: slot.to_string(),
            })
        })?;

        let certificate = Certificate::from_bytes(der.to_vec()).map_err(|e| {
            YkpivError::Crypto(CryptoError::CertificateFailed {
                reason: format!("certificate in slot {} does not parse: {}", slot, e),
            })
        })?;
        rsa_from_spki(&certificate.subject_pki())
    }

    fn generate_key(&mut self, slot: Slot, policy: &SigningPolicy) -> YkpivResult<RsaPublicKey> {
        self.require_mgmt_auth()?;

        debug!(
            "Generating {:?} key in slot {} (PIN {:?}, touch {:?})",
            policy.algorithm, slot, policy.pin_policy, policy.touch_policy
        );

        let spki = generate(
            &mut self.device,
            slot.to_yubikey_slot_id(),
            policy.algorithm.to_yubikey_algorithm_id(),
            policy.pin_policy.to_yubikey_pin_policy(),
            policy.touch_policy.to_yubikey_touch_policy(),
        )
        .map_err(|e| {
            YkpivError::Crypto(CryptoError::KeyGenerationFailed {
                reason: e.to_string(),
            })
        })?;

        info!("Key generated in slot {}", slot);
        rsa_from_spki(&spki)
    }

    fn write_certificate(
        &mut self,
        slot: Slot,
        public_key: &RsaPublicKey,
        certificate: &ProvisioningCertificate,
    ) -> YkpivResult<()> {
        self.require_mgmt_auth()?;

        let spki = spki_from_rsa(public_key)?;
        match Algorithm::from_modulus_len(rsa::traits::PublicKeyParts::size(public_key))? {
            Algorithm::Rsa1024 => self.self_sign::<yubikey_signer::YubiRsa<yubikey_signer::Rsa1024>>(
                slot,
                spki,
                certificate,
            )?,
            Algorithm::Rsa2048 => self.self_sign::<yubikey_signer::YubiRsa<yubikey_signer::Rsa2048>>(
                slot,
                spki,
                certificate,
            )?,
        }

        info!("Certificate stored in slot {}", slot);
        Ok(())
    }
}

impl Signer for PivYubiKey {
    fn sign_digest(
        &mut self,
        slot: Slot,
        algorithm: Algorithm,
        hash: SignatureHash,
        digest: &[u8],
    ) -> YkpivResult<Vec<u8>> {
        let block = pkcs1v15_signature_block(hash, digest, algorithm.modulus_len())?;

        debug!("Signing {:?} digest with slot {}", hash, slot);

        let signature = sign_data(
            &mut self.device,
            &block,
            algorithm.to_yubikey_algorithm_id(),
            slot.to_yubikey_slot_id(),
        )
        .map_err(|e| match e {
            yubikey::Error::WrongPin { .. } | yubikey::Error::PinLocked => {
                YkpivError::Authentication(AuthenticationError::PinRejected {
                    reason: e.to_string(),
                })
            }
            other => YkpivError::Crypto(CryptoError::SignatureFailed {
                reason: other.to_string(),
            }),
        })?;

        Ok(signature.to_vec())
    }
}

impl DeviceInfo for PivYubiKey {
    fn version(&self) -> String {
        let version = self.device.version();
        format!("{}.{}.{}", version.major, version.minor, version.patch)
    }
}

fn certificate_object(fetched: yubikey::Result<Buffer>, slot: Slot) -> YkpivResult<Buffer> {
    fetched.map_err(|e| match e {
        yubikey::Error::NotFound => YkpivError::SlotState(SlotStateError::NotInitialized {
            slot: slot.to_string(),
        }),
        other => YkpivError::Device(DeviceError::ReadFailed {
            reason: format!("failed to read certificate in slot {}: {}", slot, other),
        }),
    })
}

fn rsa_from_spki(spki: &impl Encode) -> YkpivResult<RsaPublicKey> {
    let der = spki.to_der().map_err(|e| {
        YkpivError::Crypto(CryptoError::InvalidKeyFormat {
            format: format!("subject public key info: {}", e),
        })
    })?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| {
        YkpivError::Crypto(CryptoError::UnsupportedAlgorithm {
            algorithm: format!("slot key is not RSA: {}", e),
        })
    })
}

fn spki_from_rsa(key: &RsaPublicKey) -> YkpivResult<SubjectPublicKeyInfoOwned> {
    let der = key.to_public_key_der().map_err(|e| {
        YkpivError::Crypto(CryptoError::InvalidKeyFormat {
            format: format!("RSA public key: {}", e),
        })
    })?;
    SubjectPublicKeyInfoOwned::from_der(der.as_bytes()).map_err(certificate_error)
}

fn to_x509_time(time: SystemTime) -> YkpivResult<Time> {
    Time::try_from(time).map_err(certificate_error)
}

fn to_x509_key_usage(usages: &[KeyUsage]) -> X509KeyUsage {
    usages
        .iter()
        .map(|usage| match usage {
            KeyUsage::DigitalSignature => KeyUsages::DigitalSignature,
            KeyUsage::KeyEncipherment => KeyUsages::KeyEncipherment,
            KeyUsage::KeyAgreement => KeyUsages::KeyAgreement,
        })
        .fold(X509KeyUsage(Default::default()), |X509KeyUsage(acc), flag| {
            X509KeyUsage(acc | flag)
        })
}

fn builder_error(err: x509_cert::builder::Error) -> der::Error {
    match err {
        x509_cert::builder::Error::Asn1(e) => e,
        _ => der::ErrorKind::Failed.into(),
    }
}

fn certificate_error(err: der::Error) -> YkpivError {
    YkpivError::Crypto(CryptoError::CertificateFailed {
        reason: err.to_string(),
    })
}
