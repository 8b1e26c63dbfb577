use super::TokenOps;
use crate::error::YkpivResult;
use crate::model::ReaderName;

/// Capability to enumerate readers and connect to the token behind one
pub trait DeviceFinder {
    type Device: TokenOps;

    /// Names of every attached reader, in PC/SC order
    fn readers(&self) -> YkpivResult<Vec<ReaderName>>;

    /// Open an unauthenticated connection to the token in `reader`
    ///
    /// Dropping the returned device closes the connection.
    fn open(&self, reader: &ReaderName) -> YkpivResult<Self::Device>;
}

/// Firmware details a token reports without authentication
pub trait DeviceInfo {
    fn version(&self) -> String;
}
