#![cfg_attr(docsrs, feature(doc_cfg))]
//! Sign Ethereum transactions and messages with a Ledger hardware wallet.
//!
//! [`LedgerEthereum`] speaks the APDU protocol of the Ledger Ethereum application over any
//! [`Transport`](ledger_eth_transport::Transport): USB HID (`hid` feature), the Speculos
//! emulator or a replay of recorded exchanges.
//!
//! ```no_run
//! # #[cfg(feature = "hid")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ledger_eth_core::types::TransactionRequest;
//! use ledger_eth_signers::{DerivationType, LedgerEthereum, Signer};
//! use ledger_eth_transport::HidTransport;
//!
//! let ledger = LedgerEthereum::new(HidTransport::open()?, DerivationType::LedgerLive(0), 1)?;
//! let tx = TransactionRequest::new()
//!     .to(ledger.address())
//!     .nonce(0)
//!     .gas(21000)
//!     .gas_price(1_000_000_000u64)
//!     .chain_id(1);
//! let signed = ledger.sign_tx(&tx.into())?;
//! println!("0x{}", hex::encode(signed.rlp()));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "hid"))]
//! # fn main() {}
//! ```
mod ledger;
pub use ledger::{
    accounts::Account,
    app::{BusyPolicy, LedgerEthereum},
    config::{ConfigError, LedgerConfig},
    types::{
        DerivationPath, DerivationRoot, DerivationType, LedgerError, EIP712_MIN_VERSION,
        INS, MIN_APP_VERSION,
    },
};

use ledger_eth_core::types::{transaction::eip2718::TypedTransaction, Address, Signature};
use std::error::Error;

/// Applies [EIP155](https://github.com/ethereum/EIPs/blob/master/EIPS/eip-155.md)
pub fn to_eip155_v<T: Into<u8>>(recovery_id: T, chain_id: u64) -> u64 {
    (recovery_id.into() as u64) + 35 + chain_id * 2
}

/// Trait for signing transactions and messages
///
/// Implement this trait to support different signing modes, e.g. Ledger, hosted etc.
pub trait Signer: std::fmt::Debug + Send + Sync {
    type Error: Error + Send + Sync;

    /// Signs the hash of the provided message after prefixing it
    fn sign_message<S: AsRef<[u8]>>(&self, message: S) -> Result<Signature, Self::Error>;

    /// Signs the transaction
    fn sign_transaction(&self, message: &TypedTransaction) -> Result<Signature, Self::Error>;

    /// Signs an EIP-712 payload given as its domain separator and `hashStruct(message)`
    fn sign_typed_data(
        &self,
        domain_separator: [u8; 32],
        message_hash: [u8; 32],
    ) -> Result<Signature, Self::Error>;

    /// Returns the signer's Ethereum Address
    fn address(&self) -> Address;

    /// Returns the signer's chain id
    fn chain_id(&self) -> u64;

    /// Sets the signer's chain id
    #[must_use]
    fn with_chain_id<T: Into<u64>>(self, chain_id: T) -> Self;
}
