//! Entry points bound to the PC/SC token adapter

use std::path::Path;
use std::sync::Arc;

use crate::adapters::PivDeviceFinder;
use crate::agent::{self, AgentAdapter};
use crate::error::YkpivResult;
use crate::slot_manager::SlotManager;
use crate::use_cases::{
    export_public_key, list_readers, Provisioned, ProvisioningController, ProvisioningFailure,
    ProvisioningRequest,
};

pub use crate::model::*;

/// Serve the SSH agent on `socket` until interrupted
///
/// Must run inside a multi-threaded Tokio runtime.
pub async fn serve_agent(socket: &Path, reader: Option<ReaderName>, pin: Pin) -> YkpivResult<()> {
    let manager = Arc::new(SlotManager::new(PivDeviceFinder));
    let adapter = AgentAdapter::new(manager, reader, pin);
    agent::serve(Arc::new(adapter), socket).await
}

/// Attached readers with firmware versions
pub fn readers() -> YkpivResult<Vec<ReaderInfo>> {
    list_readers(&SlotManager::new(PivDeviceFinder))
}

/// Initialize the SSH slot with a fresh key pair and certificate
pub fn initialize(request: &ProvisioningRequest) -> Result<Provisioned, ProvisioningFailure> {
    let manager = SlotManager::new(PivDeviceFinder);
    ProvisioningController::new(&manager).run(request)
}

/// The slot key as an `authorized_keys` line
pub fn public_key(reader: Option<&ReaderName>) -> YkpivResult<String> {
    export_public_key(&SlotManager::new(PivDeviceFinder), reader)
}
