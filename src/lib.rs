#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms, unreachable_pub)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! # ledger-eth
//!
//! A client for the Ledger Ethereum application: derive accounts, sign transactions of every
//! type, personal messages and EIP-712 typed data on the device.
//!
//! # Quickstart
//!
//! A prelude is provided which imports all the important things for you. Open a transport
//! (USB HID with the `hid` feature, or the Speculos emulator), then create the app client:
//!
//! ```no_run
//! use ledger_eth::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = SpeculosTransport::open("127.0.0.1:9999")?;
//! let ledger = LedgerEthereum::new(transport, DerivationType::LedgerLive(0), 1)?;
//!
//! for account in ledger.accounts()? {
//!     println!("{account}");
//! }
//!
//! let tx = TransactionRequest::pay(ledger.address(), 100u64)
//!     .gas(21_000)
//!     .gas_price(20_000_000_000u64)
//!     .nonce(0)
//!     .chain_id(1);
//! let signed = ledger.sign_tx(&tx.into())?;
//! println!("raw transaction: {}", signed.rlp());
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! - [`core`]: Ethereum types, transaction encodings and hashing helpers
//! - [`transport`]: the APDU codec and the transports carrying it
//! - [`signers`]: the Ethereum app client and the [`Signer`](signers::Signer) trait

/// # Ethereum types and encodings
///
/// Transactions of every type the device signs, their RLP signing payloads and signed
/// encodings, signatures and the EIP-191 / EIP-712 hashing helpers.
pub mod core {
    pub use ledger_eth_core::*;
}

/// # Device transports
///
/// The [`Transport`](ledger_eth_transport::Transport) trait, the APDU codec, the status words
/// of the app and the USB HID, Speculos and replay transports.
pub mod transport {
    pub use ledger_eth_transport::*;
}

/// # The Ethereum application
///
/// ```
/// use ledger_eth::{
///     signers::{DerivationType, LedgerEthereum},
///     transport::{RecordStore, TransportReplayer},
/// };
/// use std::str::FromStr;
///
/// let store = RecordStore::from_str(
///     "=> e006000000
///      <= 01010a02 9000
///      => e002000015058000002c8000003c800000000000000000000000
///      <= 0028 37653566343535323039316136393132356435646663623762386332363539303239333935626466 9000",
/// )
/// .unwrap();
/// let ledger =
///     LedgerEthereum::new(TransportReplayer::new(store), DerivationType::LedgerLive(0), 1)
///         .unwrap();
/// assert_eq!(
///     ledger_eth::utils::to_checksum(&ledger.address()),
///     "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
/// );
/// ```
pub mod signers {
    pub use ledger_eth_signers::*;
}

pub use ledger_eth_core::{types, utils};

/// Easy import of frequently used type definitions and traits
pub mod prelude {
    pub use ledger_eth_core::types::*;

    pub use ledger_eth_signers::*;

    pub use ledger_eth_transport::{
        APDUAnswer, APDUCommand, RecordStore, SpeculosTransport, StatusWord, Transport,
        TransportError, TransportReplayer,
    };

    #[cfg(feature = "hid")]
    pub use ledger_eth_transport::HidTransport;
}
