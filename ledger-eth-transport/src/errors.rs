use thiserror::Error;

/// Errors raised while moving bytes to and from a device
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no Ledger device found")]
    DeviceNotFound,
    /// Another command currently holds the device
    #[error("the device is busy with another command")]
    DeviceBusy,
    #[error("timed out waiting for the device to answer")]
    Timeout,
    /// Responses always end in a two byte status word
    #[error("response is shorter than a status word")]
    ResponseTooShort,
    #[error("invalid HID frame: {0}")]
    Framing(String),
    /// Short APDUs carry at most 255 bytes of data
    #[error("APDU data is {0} bytes long, the maximum is 255")]
    CommandTooLong(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "hid")]
    #[error(transparent)]
    Hid(#[from] hidapi::HidError),
    /// The replay transport has no recorded answer for this command
    #[error("no recorded exchange for command {0}")]
    ExchangeNotFound(String),
    #[error("invalid exchange record: {0}")]
    InvalidRecord(String),
}
