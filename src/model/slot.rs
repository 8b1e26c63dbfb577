use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Authentication,
    Signature,
    KeyManagement,
    CardAuthentication,
}

impl Slot {
    /// Slot 9a, the PIV slot OpenSSH clients conventionally use
    pub fn default_ssh() -> Self {
        Self::Authentication
    }

    pub fn to_yubikey_slot_id(self) -> yubikey::piv::SlotId {
        match self {
            Slot::Authentication => yubikey::piv::SlotId::Authentication,
            Slot::Signature => yubikey::piv::SlotId::Signature,
            Slot::KeyManagement => yubikey::piv::SlotId::KeyManagement,
            Slot::CardAuthentication => yubikey::piv::SlotId::CardAuthentication,
        }
    }

    /// PIV data object holding the slot's certificate (SP 800-73-4, table 3)
    pub fn certificate_object_id(self) -> yubikey::ObjectId {
        match self {
            Slot::Authentication => 0x005f_c105,
            Slot::Signature => 0x005f_c10a,
            Slot::KeyManagement => 0x005f_c10b,
            Slot::CardAuthentication => 0x005f_c101,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Slot::Authentication => "9a",
            Slot::Signature => "9c",
            Slot::KeyManagement => "9d",
            Slot::CardAuthentication => "9e",
        };
        f.write_str(id)
    }
}
