use crate::{Transport, TransportError};
use std::{
    io::{self, Read, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
    time::Duration,
};
use tracing::{debug, instrument};

/// Default APDU port of the Speculos emulator
pub const DEFAULT_SPECULOS_PORT: u16 = 9999;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest answer data an APDU can carry, status word excluded
const MAX_RESPONSE_LEN: usize = u16::MAX as usize;

/// A connection to the APDU socket of the [Speculos](https://github.com/LedgerHQ/speculos)
/// emulator.
///
/// Commands are sent as `length:u32be ‖ apdu`; answers come back as
/// `length:u32be ‖ data ‖ status word`, where `length` does not count the status word.
#[derive(Debug)]
pub struct SpeculosTransport {
    stream: TcpStream,
}

impl SpeculosTransport {
    #[instrument(skip(addr))]
    pub fn open<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(map_io)?;
        stream.set_read_timeout(Some(DEFAULT_TIMEOUT))?;
        stream.set_write_timeout(Some(DEFAULT_TIMEOUT))?;
        debug!(peer = ?stream.peer_addr().ok(), "connected to Speculos");
        Ok(Self { stream })
    }

    /// Bounds how long a single answer may take
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), TransportError> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }
}

fn map_io(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
        io::ErrorKind::ConnectionRefused => TransportError::DeviceNotFound,
        _ => TransportError::Io(err),
    }
}

impl Transport for SpeculosTransport {
    fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        let length = u32::try_from(apdu.len()).map_err(|_| TransportError::CommandTooLong(apdu.len()))?;
        let mut request = Vec::with_capacity(apdu.len() + 4);
        request.extend_from_slice(&length.to_be_bytes());
        request.extend_from_slice(apdu);
        self.stream.write_all(&request).map_err(map_io)?;

        let mut length = [0u8; 4];
        self.stream.read_exact(&mut length).map_err(map_io)?;
        let length = u32::from_be_bytes(length) as usize;
        if length > MAX_RESPONSE_LEN {
            return Err(TransportError::Framing(format!(
                "answer length {length} exceeds {MAX_RESPONSE_LEN} bytes"
            )))
        }
        let mut response = vec![0u8; length + 2];
        self.stream.read_exact(&mut response).map_err(map_io)?;
        Ok(response)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err.into()),
            _ => Ok(()),
        }
    }
}
