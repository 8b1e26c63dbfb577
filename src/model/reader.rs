use std::fmt;

/// PC/SC name of an attached token reader
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReaderName(String);

impl ReaderName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reader together with the firmware version its token reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderInfo {
    pub name: ReaderName,
    /// Firmware version, or why it could not be queried
    pub version: Result<String, String>,
}

impl fmt::Display for ReaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Ok(version) => write!(f, "{}\t{}", self.name, version),
            Err(reason) => write!(f, "{}\t(version unavailable: {})", self.name, reason),
        }
    }
}
