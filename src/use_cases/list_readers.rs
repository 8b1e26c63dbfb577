//! List attached readers

use crate::error::{DiscoveryError, YkpivError, YkpivResult};
use crate::model::ReaderInfo;
use crate::ports::DeviceFinder;
use crate::slot_manager::SlotManager;

/// Every attached reader and its firmware version
///
/// # Errors
///
/// Returns `DiscoveryError::NoReaders` when nothing is attached.
pub fn list_readers<F: DeviceFinder>(manager: &SlotManager<F>) -> YkpivResult<Vec<ReaderInfo>> {
    let readers = manager.describe_readers()?;
    if readers.is_empty() {
        return Err(YkpivError::Discovery(DiscoveryError::NoReaders));
    }
    Ok(readers)
}
