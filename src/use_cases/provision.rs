//! Provision the SSH slot with a fresh key pair and placeholder certificate
//!
//! The workflow is a chain of explicit stages. `advance` performs exactly one
//! transition, so a failure can always be attributed to the last stage that
//! completed. Nothing is rolled back and nothing is retried: a slot left
//! half-written by a failure is repaired by running again with `force`.

use std::fmt;
use std::time::SystemTime;

use rsa::RsaPublicKey;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{SlotStateError, YkpivError, YkpivResult};
use crate::model::{ManagementKey, ProvisioningCertificate, ReaderName, SigningPolicy};
use crate::ports::DeviceFinder;
use crate::slot_manager::{Administration, SlotManager, SlotSession};

/// Operator input for one provisioning run
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub reader: Option<ReaderName>,
    pub management_key: ManagementKey,
    /// Replace a key that is already in the slot
    pub force: bool,
    pub policy: SigningPolicy,
}

impl Default for ProvisioningRequest {
    fn default() -> Self {
        Self {
            reader: None,
            management_key: ManagementKey::default(),
            force: false,
            policy: SigningPolicy::reference(),
        }
    }
}

/// What the slot held before provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotContents {
    Empty,
    Populated(RsaPublicKey),
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub public_key: RsaPublicKey,
    pub certificate: ProvisioningCertificate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStage {
    Start,
    Authenticated,
    SlotInspected(SlotContents),
    KeyGenerated(RsaPublicKey),
    CertificateBuilt {
        public_key: RsaPublicKey,
        certificate: ProvisioningCertificate,
    },
    Provisioned(Provisioned),
    Aborted(SlotStateError),
}

impl ProvisioningStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProvisioningStage::Provisioned(_) | ProvisioningStage::Aborted(_)
        )
    }
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningStage::Start => f.write_str("start"),
            ProvisioningStage::Authenticated => f.write_str("authenticated"),
            ProvisioningStage::SlotInspected(SlotContents::Empty) => {
                f.write_str("slot inspected (empty)")
            }
            ProvisioningStage::SlotInspected(SlotContents::Populated(_)) => {
                f.write_str("slot inspected (populated)")
            }
            ProvisioningStage::KeyGenerated(_) => f.write_str("key generated"),
            ProvisioningStage::CertificateBuilt { .. } => f.write_str("certificate built"),
            ProvisioningStage::Provisioned(_) => f.write_str("provisioned"),
            ProvisioningStage::Aborted(_) => f.write_str("aborted"),
        }
    }
}

/// A run that did not reach `Provisioned`
#[derive(Error, Debug)]
#[error("provisioning stopped at stage '{stage}': {source}")]
pub struct ProvisioningFailure {
    /// Last stage reached
    pub stage: ProvisioningStage,
    pub source: YkpivError,
}

/// Perform the single transition out of `stage`
///
/// Terminal stages are returned unchanged.
pub fn advance<F: DeviceFinder>(
    session: &mut SlotSession<'_, F, Administration>,
    stage: &ProvisioningStage,
    request: &ProvisioningRequest,
    now: SystemTime,
) -> YkpivResult<ProvisioningStage> {
    let next = match stage {
        // the session was opened with the management key
        ProvisioningStage::Start => ProvisioningStage::Authenticated,

        ProvisioningStage::Authenticated => match session.public_key() {
            Ok(key) => ProvisioningStage::SlotInspected(SlotContents::Populated(key)),
            Err(e) if e.is_slot_empty() => ProvisioningStage::SlotInspected(SlotContents::Empty),
            Err(e) => return Err(e),
        },

        ProvisioningStage::SlotInspected(SlotContents::Populated(_)) if !request.force => {
            ProvisioningStage::Aborted(SlotStateError::AlreadyInitialized {
                slot: session.slot().to_string(),
            })
        }

        ProvisioningStage::SlotInspected(_) => {
            if request.policy.is_placeholder() {
                warn!("Generating key with the placeholder policy: no PIN, no touch");
            }
            ProvisioningStage::KeyGenerated(session.generate_key(&request.policy)?)
        }

        ProvisioningStage::KeyGenerated(public_key) => ProvisioningStage::CertificateBuilt {
            public_key: public_key.clone(),
            certificate: ProvisioningCertificate::new(now),
        },

        ProvisioningStage::CertificateBuilt {
            public_key,
            certificate,
        } => {
            session.write_certificate(public_key, certificate)?;
            ProvisioningStage::Provisioned(Provisioned {
                public_key: public_key.clone(),
                certificate: certificate.clone(),
            })
        }

        terminal => terminal.clone(),
    };
    Ok(next)
}

/// Drives a provisioning run through the slot manager
pub struct ProvisioningController<'m, F: DeviceFinder> {
    manager: &'m SlotManager<F>,
}

impl<'m, F: DeviceFinder> ProvisioningController<'m, F> {
    pub fn new(manager: &'m SlotManager<F>) -> Self {
        Self { manager }
    }

    /// Run every stage in one administration session
    pub fn run(&self, request: &ProvisioningRequest) -> Result<Provisioned, ProvisioningFailure> {
        let mut stage = ProvisioningStage::Start;

        let mut session = self
            .manager
            .open_for_administration(request.reader.as_ref(), &request.management_key)
            .map_err(|source| ProvisioningFailure {
                stage: stage.clone(),
                source,
            })?;
        info!("Provisioning slot {} on {}", session.slot(), session.reader());

        let now = SystemTime::now();
        while !stage.is_terminal() {
            stage = advance(&mut session, &stage, request, now).map_err(|source| {
                ProvisioningFailure {
                    stage: stage.clone(),
                    source,
                }
            })?;
            debug!("Provisioning stage: {}", stage);
        }
        session.close();

        match stage {
            ProvisioningStage::Provisioned(provisioned) => {
                info!("Slot initialized");
                Ok(provisioned)
            }
            ProvisioningStage::Aborted(err) => Err(ProvisioningFailure {
                stage: ProvisioningStage::Aborted(err.clone()),
                source: YkpivError::SlotState(err),
            }),
            // the loop only exits on a terminal stage
            _ => unreachable!("provisioning loop ended on a non-terminal stage"),
        }
    }
}
