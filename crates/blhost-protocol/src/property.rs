use core::fmt;

use derive_more::IsVariant;

/// Well-known `get-property` ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
#[repr(u32)]
pub enum Property {
    CurrentVersion = 0x01,
    AvailablePeripherals = 0x02,
    FlashStartAddress = 0x03,
    FlashSizeInBytes = 0x04,
    FlashSectorSize = 0x05,
    FlashBlockCount = 0x06,
    AvailableCommands = 0x07,
    VerifyWrites = 0x0a,
    MaxPacketSize = 0x0b,
    ReservedRegions = 0x0c,
    RamStartAddress = 0x0e,
    RamSizeInBytes = 0x0f,
    SystemDeviceId = 0x10,
    SecurityState = 0x11,
    UniqueDeviceId = 0x12,
}

impl Property {
    pub const ALL: [Self; 15] = [
        Self::CurrentVersion,
        Self::AvailablePeripherals,
        Self::FlashStartAddress,
        Self::FlashSizeInBytes,
        Self::FlashSectorSize,
        Self::FlashBlockCount,
        Self::AvailableCommands,
        Self::VerifyWrites,
        Self::MaxPacketSize,
        Self::ReservedRegions,
        Self::RamStartAddress,
        Self::RamSizeInBytes,
        Self::SystemDeviceId,
        Self::SecurityState,
        Self::UniqueDeviceId,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| *p as u32 == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CurrentVersion => "current-version",
            Self::AvailablePeripherals => "available-peripherals",
            Self::FlashStartAddress => "flash-start-address",
            Self::FlashSizeInBytes => "flash-size-in-bytes",
            Self::FlashSectorSize => "flash-sector-size",
            Self::FlashBlockCount => "flash-block-count",
            Self::AvailableCommands => "available-commands",
            Self::VerifyWrites => "verify-writes",
            Self::MaxPacketSize => "max-packet-size",
            Self::ReservedRegions => "reserved-regions",
            Self::RamStartAddress => "ram-start-address",
            Self::RamSizeInBytes => "ram-size-in-bytes",
            Self::SystemDeviceId => "system-device-id",
            Self::SecurityState => "security-state",
            Self::UniqueDeviceId => "unique-device-id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), *self as u32)
    }
}
