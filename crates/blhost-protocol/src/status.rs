use core::fmt;

/// Status word returned first in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(pub u32);

impl Status {
    pub const SUCCESS: Self = Self(0);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    pub fn name(&self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "Success",
            1 => "Fail",
            2 => "ReadOnly",
            3 => "OutOfRange",
            4 => "InvalidArgument",
            5 => "Timeout",
            6 => "NoTransferInProgress",
            101 => "FlashAlignmentError",
            102 => "FlashAddressError",
            103 => "FlashAccessError",
            104 => "FlashProtectionViolation",
            105 => "FlashCommandFailure",
            106 => "FlashUnknownProperty",
            10000 => "UnknownCommand",
            10001 => "SecurityViolation",
            10002 => "AbortDataPhase",
            10003 => "PingError",
            10004 => "NoResponse",
            10005 => "NoResponseExpected",
            10006 => "UnsupportedCommand",
            10300 => "UnknownProperty",
            10301 => "ReadOnlyProperty",
            10302 => "InvalidPropertyValue",
            _ => return None,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "unknown status ({})", self.0),
        }
    }
}
