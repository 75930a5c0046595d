#![cfg_attr(docsrs, feature(doc_cfg))]
//! Transports and APDU codec for talking to the Ledger Ethereum application.
//!
//! A [`Transport`] moves raw APDU bytes to a device and back. Everything above it works in
//! terms of [`APDUCommand`] and [`APDUAnswer`]:
//!
//! ```
//! use ledger_eth_transport::{APDUCommand, RecordStore, Transport, TransportReplayer};
//! use std::str::FromStr;
//!
//! let store = RecordStore::from_str("=> e006000000\n<= 010109039000").unwrap();
//! let mut transport = TransportReplayer::new(store);
//! let answer = transport
//!     .send(&APDUCommand { cla: 0xe0, ins: 0x06, p1: 0, p2: 0, data: vec![], response_len: None })
//!     .unwrap();
//! assert!(answer.is_success());
//! assert_eq!(answer.data(), &[0x01, 0x01, 0x09, 0x03]);
//! ```
mod apdu;
pub use apdu::{chunk_payload, APDUAnswer, APDUCommand, MAX_CHUNK_SIZE};

mod errors;
pub use errors::TransportError;

pub mod framing;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
mod hid;
#[cfg(feature = "hid")]
pub use hid::HidTransport;

mod mock;
pub use mock::{RecordStore, TransportReplayer};

mod speculos;
pub use speculos::SpeculosTransport;

mod status;
pub use status::StatusWord;

use tracing::trace;

/// A blocking, exclusive channel to a single device.
///
/// Implementations only move bytes: `exchange` takes a serialized command APDU and returns the
/// response APDU, status word included. Status words are interpreted by the caller.
pub trait Transport {
    /// Sends one command APDU and waits for its response.
    fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Releases the underlying device handle.
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Serializes `command`, exchanges it and splits the status word off the response.
    fn send(&mut self, command: &APDUCommand) -> Result<APDUAnswer, TransportError> {
        let request = command.serialize()?;
        trace!(apdu = %hex::encode(&request), "=>");
        let response = self.exchange(&request)?;
        trace!(apdu = %hex::encode(&response), "<=");
        APDUAnswer::from_answer(response)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).exchange(apdu)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }
}
