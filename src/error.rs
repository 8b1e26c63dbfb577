//! Error types for the agent and provisioning workflows
//!
//! Errors are organized hierarchically and use thiserror for implementation.
//! Each top-level variant is one class of failure that callers may want to
//! tell apart: reader discovery, session establishment, authentication,
//! slot state, on-device cryptography, unsupported agent operations and
//! identity mismatches.

use thiserror::Error;

/// Result type alias for agent operations
pub type YkpivResult<T> = Result<T, YkpivError>;

/// Top-level error type for all operations against the token
#[derive(Error, Debug)]
pub enum YkpivError {
    /// Reader discovery failed or was ambiguous
    #[error("Reader discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Session establishment failed
    #[error("YubiKey device error: {0}")]
    Device(#[from] DeviceError),

    /// PIN or management key rejected by the token
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// Slot is not in the state the operation requires
    #[error("Slot state error: {0}")]
    SlotState(#[from] SlotStateError),

    /// Cryptographic operation errors
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    /// A deliberately unsupported agent operation was invoked
    #[error("Unsupported agent operation: {0}")]
    Capability(#[from] CapabilityError),

    /// A sign request named a key that is not the slot's current key
    #[error("can't sign for this key: it does not match the key in the slot")]
    IdentityMismatch,

    /// Domain validation errors
    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    /// The agent socket could not be served
    #[error("Agent service error: {0}")]
    Service(#[from] ServiceError),
}

/// Reader discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// PC/SC could not enumerate readers
    #[error("failed to list readers in system: {reason}")]
    ListFailed { reason: String },

    /// No readers are attached at all
    #[error("no readers found in system")]
    NoReaders,

    /// No reader was requested and the system does not have exactly one
    #[error("expected one reader in the system, found {found}")]
    ReaderCount { found: usize },

    /// The requested reader is not attached
    #[error("reader not found: {reader}")]
    ReaderNotFound { reader: String },
}

/// Session establishment errors
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Opening the reader failed
    #[error("error opening reader {reader}: {reason}")]
    OpenFailed { reader: String, reason: String },

    /// Reading an object from the token failed
    #[error("failed to read from the token: {reason}")]
    ReadFailed { reason: String },
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// PIN verification failed
    #[error("failed logging in to yubikey. Check PIN?: {reason}")]
    PinRejected { reason: String },

    /// Management key authentication failed
    #[error("failed authenticating yubikey. Check management key?: {reason}")]
    ManagementKeyRejected { reason: String },
}

/// Slot state errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotStateError {
    /// Slot already holds a key and force was not requested
    #[error("slot {slot} appears initialized, and force not specified")]
    AlreadyInitialized { slot: String },

    /// Slot holds no key
    #[error("slot {slot} is not initialized")]
    NotInitialized { slot: String },
}

/// Cryptographic operation errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature generation failed
    #[error("failed to sign data: {reason}")]
    SignatureFailed { reason: String },

    /// Key generation failed
    #[error("failed to generate new key: {reason}")]
    KeyGenerationFailed { reason: String },

    /// Certificate construction, parsing or storage failed
    #[error("certificate error: {reason}")]
    CertificateFailed { reason: String },

    /// Invalid key format
    #[error("invalid key format: {format}")]
    InvalidKeyFormat { format: String },

    /// Algorithm not supported
    #[error("algorithm not supported: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },
}

/// Agent operations this agent refuses by contract
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("this agent does not support adding keys")]
    AddNotSupported,

    #[error("this agent does not support removing keys")]
    RemoveNotSupported,

    #[error("this agent is not lockable")]
    NotLockable,
}

/// Agent socket errors, all fatal to the service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No home directory to place the default socket in
    #[error("cannot determine home directory for the agent socket")]
    NoHomeDirectory,

    /// Binding the Unix socket failed
    #[error("failed to create agent socket listener at {path}: {source}")]
    Bind {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Restricting the socket permissions failed
    #[error("failed to restrict permissions of {path}: {source}")]
    Permissions {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The protocol listener stopped with an error
    #[error("agent listener failed: {reason}")]
    Listener { reason: String },
}

/// Domain validation errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// PIN validation error
    #[error("PIN validation error: {0}")]
    Pin(#[from] crate::model::PinError),

    /// Algorithm error
    #[error("Algorithm error: {0}")]
    Algorithm(#[from] crate::model::AlgorithmError),

    /// Management Key error
    #[error("Management Key error: {0}")]
    ManagementKey(#[from] crate::model::ManagementKeyError),
}

impl From<crate::model::PinError> for YkpivError {
    fn from(err: crate::model::PinError) -> Self {
        YkpivError::Domain(DomainError::Pin(err))
    }
}

impl From<crate::model::ManagementKeyError> for YkpivError {
    fn from(err: crate::model::ManagementKeyError) -> Self {
        YkpivError::Domain(DomainError::ManagementKey(err))
    }
}

impl From<crate::model::AlgorithmError> for YkpivError {
    fn from(err: crate::model::AlgorithmError) -> Self {
        YkpivError::Domain(DomainError::Algorithm(err))
    }
}

impl YkpivError {
    /// True when the token reported that the slot holds no key
    pub fn is_slot_empty(&self) -> bool {
        matches!(
            self,
            YkpivError::SlotState(SlotStateError::NotInitialized { .. })
        )
    }
}
