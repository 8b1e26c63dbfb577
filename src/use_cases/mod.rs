//! Use cases (orchestration)
//!
//! This module contains the operator-facing workflows. Each one goes through
//! the `SlotManager`, the single path to the token.

mod export_public_key;
mod list_readers;
mod provision;

pub use export_public_key::export_public_key;
pub use list_readers::list_readers;
pub use provision::{
    advance, Provisioned, ProvisioningController, ProvisioningFailure, ProvisioningRequest,
    ProvisioningStage, SlotContents,
};
