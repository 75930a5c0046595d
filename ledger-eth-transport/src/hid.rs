use crate::{
    framing::{
        wrap_command_apdu, ResponseAssembler, LEDGER_CHANNEL, LEDGER_PACKET_SIZE,
        LEDGER_USAGE_PAGE, LEDGER_VENDOR_ID,
    },
    Transport, TransportError,
};
use hidapi::{DeviceInfo, HidApi, HidDevice, HidError};
use std::{ffi::CString, time::Duration};
use tracing::{debug, instrument};

/// How long a single report read may block
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// A USB HID connection to a Ledger device
pub struct HidTransport {
    device: Option<HidDevice>,
    read_timeout: Duration,
}

impl std::fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HidTransport")
            .field("open", &self.device.is_some())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

fn is_ledger(device: &DeviceInfo) -> bool {
    device.vendor_id() == LEDGER_VENDOR_ID &&
        (device.usage_page() == LEDGER_USAGE_PAGE || device.interface_number() == 0)
}

/// A Ledger is on the bus but hidapi could not open it: another process holds it.
fn open_error(err: HidError) -> TransportError {
    match err {
        HidError::HidApiError { .. } | HidError::HidApiErrorEmpty => {
            debug!(%err, "Ledger HID device could not be opened");
            TransportError::DeviceBusy
        }
        err => err.into(),
    }
}

impl HidTransport {
    /// Opens the first Ledger device found on the bus.
    #[instrument]
    pub fn open() -> Result<Self, TransportError> {
        let api = HidApi::new()?;
        let path: CString = api
            .device_list()
            .find(|device| is_ledger(device))
            .map(|device| device.path().to_owned())
            .ok_or(TransportError::DeviceNotFound)?;
        debug!(path = ?path, "opening Ledger HID device");
        let device = api.open_path(&path).map_err(open_error)?;
        Ok(Self { device: Some(device), read_timeout: DEFAULT_READ_TIMEOUT })
    }

    /// Bounds how long a single report read may block. The user confirming on the device
    /// counts against this timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    fn device(&self) -> Result<&HidDevice, TransportError> {
        self.device.as_ref().ok_or(TransportError::DeviceNotFound)
    }
}

impl Transport for HidTransport {
    fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        let device = self.device()?;

        for packet in wrap_command_apdu(LEDGER_CHANNEL, apdu, LEDGER_PACKET_SIZE)? {
            // hidapi expects the report id first
            let mut report = Vec::with_capacity(packet.len() + 1);
            report.push(0x00);
            report.extend_from_slice(&packet);
            let written = device.write(&report)?;
            if written < packet.len() {
                return Err(TransportError::Framing(format!(
                    "short write of {written} bytes"
                )))
            }
        }

        let timeout = i32::try_from(self.read_timeout.as_millis()).unwrap_or(i32::MAX);
        let mut assembler = ResponseAssembler::new(LEDGER_CHANNEL);
        let mut buffer = [0u8; LEDGER_PACKET_SIZE];
        loop {
            let read = device.read_timeout(&mut buffer, timeout)?;
            if read == 0 {
                return Err(TransportError::Timeout)
            }
            if let Some(response) = assembler.push(&buffer[..read])? {
                return Ok(response)
            }
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // dropping the handle closes it
        self.device.take();
        Ok(())
    }
}
