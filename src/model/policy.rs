use super::Algorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinPolicy {
    Never,
    Once,
    Always,
}

impl PinPolicy {
    pub fn to_yubikey_pin_policy(self) -> yubikey::PinPolicy {
        match self {
            PinPolicy::Never => yubikey::PinPolicy::Never,
            PinPolicy::Once => yubikey::PinPolicy::Once,
            PinPolicy::Always => yubikey::PinPolicy::Always,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPolicy {
    Never,
    Always,
    Cached,
}

impl TouchPolicy {
    pub fn to_yubikey_touch_policy(self) -> yubikey::TouchPolicy {
        match self {
            TouchPolicy::Never => yubikey::TouchPolicy::Never,
            TouchPolicy::Always => yubikey::TouchPolicy::Always,
            TouchPolicy::Cached => yubikey::TouchPolicy::Cached,
        }
    }
}

/// Key parameters fixed at provisioning time
///
/// The reference policy is a placeholder: PIN and touch are never required,
/// which keeps the self-signed certificate step free of prompts. A real
/// deployment should choose these deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningPolicy {
    pub algorithm: Algorithm,
    pub pin_policy: PinPolicy,
    pub touch_policy: TouchPolicy,
}

impl SigningPolicy {
    pub fn reference() -> Self {
        Self {
            algorithm: Algorithm::Rsa2048,
            pin_policy: PinPolicy::Never,
            touch_policy: TouchPolicy::Never,
        }
    }

    /// Whether this is still the unreviewed placeholder policy
    pub fn is_placeholder(&self) -> bool {
        *self == Self::reference()
    }
}

impl Default for SigningPolicy {
    fn default() -> Self {
        Self::reference()
    }
}
