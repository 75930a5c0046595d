// Re-export common ethereum datatypes with more specific names

/// A transaction Hash
pub use ethabi::ethereum_types::H256 as TxHash;

pub use ethabi::ethereum_types::{Address, H160, H256, U256, U64};

mod bytes;
pub use self::bytes::Bytes;

mod signature;
pub use signature::*;

pub mod transaction;
pub use transaction::{
    decode_signed,
    eip1559::Eip1559TransactionRequest,
    eip2718::TypedTransaction,
    eip2930::{AccessList, AccessListItem, Eip2930TransactionRequest},
    eip712::EIP712Domain,
    request::TransactionRequest,
    signed::SignedTransaction,
    EncodingError, SignatureScheme, TransactionType, MAX_CHAIN_ID, MAX_LEGACY_CHAIN_ID,
};
