//! Export the slot's public key for `authorized_keys`

use tracing::debug;

use crate::error::YkpivResult;
use crate::model::{Identity, ReaderName};
use crate::ports::DeviceFinder;
use crate::slot_manager::SlotManager;

/// Read the slot key and render it as one `authorized_keys` line
///
/// No PIN is needed: the key is read from the slot certificate.
pub fn export_public_key<F: DeviceFinder>(
    manager: &SlotManager<F>,
    reader: Option<&ReaderName>,
) -> YkpivResult<String> {
    let mut session = manager.open_for_read(reader)?;
    let identity = Identity::from_rsa(&session.public_key()?)?;
    session.close();

    debug!("Exporting public key from slot {}", manager.slot());
    identity.to_authorized_key()
}
