/// Status words returned by the Ledger Ethereum application and the device OS.
///
/// Several codes share a meaning across firmware and app versions, e.g. a locked device
/// answers `0x6982`, `0x5515` or `0x6b0c` depending on the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusWord {
    Ok,
    /// The user rejected the request on the device
    UserRejected,
    DeviceLocked,
    /// The Ethereum application is not open (or another app is)
    AppNotOpen,
    /// Invalid data, or blind signing is disabled in the app settings
    InvalidData,
    IncorrectLength,
    IncorrectP1P2,
    /// `0x6501` to `0x6504`, the app ran into an unexpected state
    AppError(u16),
    InvalidOffset,
    FileNotFound,
    NotEnoughMemorySpace,
    ReferencedDataNotFound,
    TechnicalProblem,
    MemoryProblem,
    Halted,
    Unknown(u16),
}

pub const OK: u16 = 0x9000;
pub const USER_REJECTED: u16 = 0x6985;
/// Classified as [`StatusWord::DeviceLocked`], which is what current firmware means by it.
/// Older Ethereum apps also answer `0x6982` when the user cancels, so on those a cancel
/// surfaces as a locked device.
pub const SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
pub const DEVICE_LOCKED: u16 = 0x5515;
pub const DEVICE_LOCKED_LEGACY: u16 = 0x6b0c;
pub const INS_NOT_SUPPORTED: u16 = 0x6d00;
pub const INS_NOT_SUPPORTED_ALT: u16 = 0x6d02;
pub const CLA_NOT_SUPPORTED: u16 = 0x6e00;
pub const APP_NOT_OPEN_LEGACY: u16 = 0x6804;
pub const APP_NOT_OPEN: u16 = 0x6511;
pub const INCORRECT_DATA: u16 = 0x6a80;
pub const INCORRECT_LENGTH: u16 = 0x6700;
pub const INCORRECT_P1_P2: u16 = 0x6b00;
pub const INVALID_DATA_STATUS: u16 = 0x6983;
pub const INVALID_REFERENCE: u16 = 0x6984;
pub const INVALID_OFFSET: u16 = 0x9402;
pub const FILE_NOT_FOUND: u16 = 0x9404;
pub const NOT_ENOUGH_MEMORY_SPACE: u16 = 0x6a84;
pub const REFERENCED_DATA_NOT_FOUND: u16 = 0x6a88;
pub const TECHNICAL_PROBLEM: u16 = 0x6f00;
pub const MEMORY_PROBLEM: u16 = 0x9240;
pub const HALTED: u16 = 0x6faa;

impl From<u16> for StatusWord {
    fn from(code: u16) -> StatusWord {
        match code {
            OK => StatusWord::Ok,
            USER_REJECTED => StatusWord::UserRejected,
            SECURITY_STATUS_NOT_SATISFIED | DEVICE_LOCKED | DEVICE_LOCKED_LEGACY => {
                StatusWord::DeviceLocked
            }
            INS_NOT_SUPPORTED | INS_NOT_SUPPORTED_ALT | CLA_NOT_SUPPORTED |
            APP_NOT_OPEN_LEGACY | APP_NOT_OPEN => StatusWord::AppNotOpen,
            INCORRECT_DATA | INVALID_DATA_STATUS | INVALID_REFERENCE => StatusWord::InvalidData,
            INCORRECT_LENGTH => StatusWord::IncorrectLength,
            INCORRECT_P1_P2 => StatusWord::IncorrectP1P2,
            0x6501..=0x6504 => StatusWord::AppError(code),
            INVALID_OFFSET => StatusWord::InvalidOffset,
            FILE_NOT_FOUND => StatusWord::FileNotFound,
            NOT_ENOUGH_MEMORY_SPACE => StatusWord::NotEnoughMemorySpace,
            REFERENCED_DATA_NOT_FOUND => StatusWord::ReferencedDataNotFound,
            TECHNICAL_PROBLEM => StatusWord::TechnicalProblem,
            MEMORY_PROBLEM => StatusWord::MemoryProblem,
            HALTED => StatusWord::Halted,
            _ => StatusWord::Unknown(code),
        }
    }
}

impl std::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            StatusWord::Ok => "success",
            StatusWord::UserRejected => "rejected by the user",
            StatusWord::DeviceLocked => "device is locked",
            StatusWord::AppNotOpen => "Ethereum app is not open",
            StatusWord::InvalidData => "invalid data, or blind signing is disabled",
            StatusWord::IncorrectLength => "incorrect length",
            StatusWord::IncorrectP1P2 => "incorrect P1/P2",
            StatusWord::AppError(code) => return write!(f, "app error {code:#06x}"),
            StatusWord::InvalidOffset => "invalid offset",
            StatusWord::FileNotFound => "file not found",
            StatusWord::NotEnoughMemorySpace => "not enough memory space",
            StatusWord::ReferencedDataNotFound => "referenced data not found",
            StatusWord::TechnicalProblem => "technical problem",
            StatusWord::MemoryProblem => "memory problem",
            StatusWord::Halted => "halted",
            StatusWord::Unknown(code) => return write!(f, "unknown status {code:#06x}"),
        };
        f.write_str(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_device_states() {
        assert_eq!(StatusWord::from(0x9000), StatusWord::Ok);
        assert_eq!(StatusWord::from(0x6985), StatusWord::UserRejected);
        for locked in [0x6982, 0x5515, 0x6b0c] {
            assert_eq!(StatusWord::from(locked), StatusWord::DeviceLocked);
        }
        for closed in [0x6d00, 0x6d02, 0x6e00, 0x6804, 0x6511] {
            assert_eq!(StatusWord::from(closed), StatusWord::AppNotOpen);
        }
        assert_eq!(StatusWord::from(0x6a80), StatusWord::InvalidData);
        assert_eq!(StatusWord::from(0x6502), StatusWord::AppError(0x6502));
        assert_eq!(StatusWord::from(0x1234), StatusWord::Unknown(0x1234));
    }

    #[test]
    fn display() {
        assert_eq!(StatusWord::UserRejected.to_string(), "rejected by the user");
        assert_eq!(StatusWord::Unknown(0x1234).to_string(), "unknown status 0x1234");
    }
}
