#![cfg_attr(docsrs, feature(doc_cfg))]
//! Ethereum types, RLP encoding and signature utilities used when signing with a Ledger
//! device.
//!
//! The Ledger Ethereum application never sees JSON-RPC objects. It receives the canonical
//! RLP encoding of an unsigned transaction, or the raw bytes of a message, and answers with a
//! `(v, r, s)` triple. This crate provides everything on the host side of that exchange:
//!
//! - transaction requests for legacy, [EIP-2930] and [EIP-1559] transactions and their
//!   unsigned RLP encoding ([`types::TypedTransaction::rlp`]),
//! - reassembly of a signed transaction from a device signature
//!   ([`types::SignedTransaction::from_device_signature`]),
//! - [EIP-191] and [EIP-712] digests for verifying message signatures,
//! - secp256k1 public key recovery on [`types::Signature`].
//!
//! ## Verifying a personal message signature
//!
//! ```
//! use ledger_eth_core::{types::Signature, utils::hash_message};
//! use std::str::FromStr;
//!
//! let signature = Signature::from_str(
//!     "b91467e570a6466aa9e9876cbcd013baba02900b8979d43fe208a4a4f339f5fd6007e74cd82e037b800186422fc2da167c747ef045e5d18a5f5d4300f8e1a0291c"
//! ).unwrap();
//! let signer = signature.recover(hash_message("Some data")).unwrap();
//! assert_eq!(format!("{signer:?}"), "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");
//! ```
//!
//! [EIP-191]: https://eips.ethereum.org/EIPS/eip-191
//! [EIP-712]: https://eips.ethereum.org/EIPS/eip-712
//! [EIP-2930]: https://eips.ethereum.org/EIPS/eip-2930
//! [EIP-1559]: https://eips.ethereum.org/EIPS/eip-1559
pub mod types;

/// Various utilities
pub mod utils;

// re-export k256
pub use k256;

// re-export rlp so downstream crates encode with the same version
pub use rlp;
