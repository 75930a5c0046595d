//! Transaction requests, their unsigned RLP encoding and the reassembly of device signatures
//! into signed transactions.
pub mod request;

pub mod eip1559;
pub mod eip2718;
pub mod eip2930;

pub mod eip712;

pub mod signed;
pub use signed::decode_signed;

use crate::types::{Address, SignatureError, U256, U64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fields in a legacy transaction prepared for signing with a chain id
pub(crate) const NUM_TX_FIELDS: usize = 9;

/// Largest chain id the Ledger Ethereum application accepts for legacy (EIP-155)
/// transactions: `v = chain_id * 2 + 35 + parity` must fit in a `u32`.
pub const MAX_LEGACY_CHAIN_ID: u64 = 0xFFFF_FFFF / 2 - 36;

/// Largest chain id accepted for typed transactions, where the chain id travels as a plain
/// RLP integer and `v` is only the y-parity.
pub const MAX_CHAIN_ID: u64 = 0x3FFF_FFFF_FFFF_FFFF;

/// An error while preparing, encoding or decoding a transaction.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Legacy chain ids are bounded by the size of `v`
    #[error("legacy transaction chain id {0} exceeds the maximum of {}", MAX_LEGACY_CHAIN_ID)]
    LegacyChainIdTooLarge(U64),
    #[error("chain id {0} exceeds the maximum of {}", MAX_CHAIN_ID)]
    ChainIdTooLarge(U64),
    /// EIP-2930 and EIP-1559 transactions commit to the chain id
    #[error("typed transactions require a chain id")]
    MissingChainId,
    #[error("missing required transaction field `{0}`")]
    MissingField(&'static str),
    #[error("max priority fee per gas ({max_priority_fee_per_gas}) exceeds max fee per gas ({max_fee_per_gas})")]
    PriorityFeeTooHigh { max_priority_fee_per_gas: U256, max_fee_per_gas: U256 },
    #[error("unknown transaction type {0:#04x}")]
    UnknownTransactionType(u8),
    /// The device answered with a `v` byte that yields no valid parity for the scheme
    #[error("invalid recovery id {v:#04x} for {scheme:?}")]
    InvalidRecoveryId { v: u8, scheme: SignatureScheme },
    #[error("invalid device signature length, got {0}, expected 65")]
    InvalidSignatureLength(usize),
    /// Personal messages are prefixed by a `u32` length
    #[error("message of {0} bytes does not fit a 32-bit length")]
    MessageTooLong(usize),
    #[error(transparent)]
    Rlp(#[from] rlp::DecoderError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// The EIP-2718 transaction type byte
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransactionType {
    Legacy = 0x00,
    Eip2930 = 0x01,
    Eip1559 = 0x02,
}

impl TryFrom<u8> for TransactionType {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Legacy),
            0x01 => Ok(Self::Eip2930),
            0x02 => Ok(Self::Eip1559),
            other => Err(EncodingError::UnknownTransactionType(other)),
        }
    }
}

/// How the `v` value of a signature is assembled from the secp256k1 recovery id.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    /// `v = 27 + recovery_id`, used by personal messages, typed data and unprotected legacy
    /// transactions
    Electrum,
    /// `v = recovery_id + chain_id * 2 + 35`
    Eip155 { chain_id: u64 },
    /// `v = recovery_id`, used by EIP-2718 typed transactions
    YParity,
}

impl SignatureScheme {
    /// Assembles `v` from a recovery id (`0` or `1`)
    pub fn v(&self, recovery_id: u8) -> u64 {
        let recovery_id = recovery_id as u64;
        match self {
            Self::Electrum => 27 + recovery_id,
            Self::Eip155 { chain_id } => {
                chain_id.saturating_mul(2).saturating_add(35).saturating_add(recovery_id)
            }
            Self::YParity => recovery_id,
        }
    }

    /// Extracts the recovery id from the single `v` byte returned by the device.
    ///
    /// For EIP-155 the device only returns the low byte of `v`, so the parity is recovered
    /// modulo 256 against `chain_id * 2 + 35`.
    pub fn recovery_id(&self, v: u8) -> Result<u8, EncodingError> {
        let parity = match self {
            Self::Electrum => match v {
                27 | 28 => Some(v - 27),
                0 | 1 => Some(v),
                _ => None,
            },
            Self::Eip155 { chain_id } => {
                let base = chain_id.wrapping_mul(2).wrapping_add(35) as u8;
                Some(v.wrapping_sub(base)).filter(|parity| *parity <= 1)
            }
            Self::YParity => match v {
                0 | 1 => Some(v),
                27 | 28 => Some(v - 27),
                _ => None,
            },
        };
        parity.ok_or(EncodingError::InvalidRecoveryId { v, scheme: *self })
    }
}

pub(super) fn rlp_opt<T: rlp::Encodable>(rlp: &mut rlp::RlpStream, opt: &Option<T>) {
    if let Some(inner) = opt {
        rlp.append(inner);
    } else {
        rlp.append(&"");
    }
}

/// Decodes the `to` field of the RLP encoding based on the RLP offset passed. Increments the
/// offset by one.
#[inline]
fn decode_to(rlp: &rlp::Rlp, offset: &mut usize) -> Result<Option<Address>, rlp::DecoderError> {
    let to = {
        let to = rlp.at(*offset)?;
        if to.is_empty() {
            if to.is_data() {
                None
            } else {
                return Err(rlp::DecoderError::RlpExpectedToBeData)
            }
        } else {
            Some(to.as_val()?)
        }
    };
    *offset += 1;

    Ok(to)
}

/// Decodes the `data` field, mapping an empty byte string to `None`
#[inline]
fn decode_data(
    rlp: &rlp::Rlp,
    offset: &mut usize,
) -> Result<Option<crate::types::Bytes>, rlp::DecoderError> {
    let data = rlp.at(*offset)?.data()?;
    *offset += 1;
    Ok(match data.len() {
        0 => None,
        _ => Some(data.to_vec().into()),
    })
}

#[inline]
fn decode_val<T: rlp::Decodable>(rlp: &rlp::Rlp, offset: &mut usize) -> Result<T, rlp::DecoderError> {
    let val = rlp.val_at(*offset)?;
    *offset += 1;
    Ok(val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlp::RlpStream;

    #[test]
    fn test_rlp_opt_none() {
        let mut stream = RlpStream::new_list(1);
        let empty_chainid: Option<U64> = None;
        rlp_opt(&mut stream, &empty_chainid);
        let out = stream.out();
        assert_eq!(out, vec![0xc1, 0x80]);
    }

    #[test]
    fn integers_are_minimal_big_endian() {
        assert_eq!(rlp::encode(&U256::zero()).to_vec(), vec![0x80]);
        assert_eq!(rlp::encode(&U256::from(0x7f)).to_vec(), vec![0x7f]);
        assert_eq!(rlp::encode(&U256::from(256)).to_vec(), vec![0x82, 0x01, 0x00]);
    }

    #[test]
    fn legacy_chain_id_bound() {
        assert_eq!(MAX_LEGACY_CHAIN_ID, 2_147_483_611);
    }

    #[test]
    fn eip155_v_roundtrips_through_low_byte() {
        for chain_id in [1u64, 5, 56, 109, 110, 137, 1337, 43114, MAX_LEGACY_CHAIN_ID] {
            let scheme = SignatureScheme::Eip155 { chain_id };
            for parity in [0u8, 1] {
                let v = scheme.v(parity);
                assert_eq!(v, chain_id * 2 + 35 + parity as u64);
                assert_eq!(scheme.recovery_id(v as u8).unwrap(), parity);
            }
        }

        // chain id 1: v is 37 or 38, anything else is rejected
        let mainnet = SignatureScheme::Eip155 { chain_id: 1 };
        assert!(matches!(
            mainnet.recovery_id(39),
            Err(EncodingError::InvalidRecoveryId { v: 39, .. })
        ));
        assert!(mainnet.recovery_id(27).is_err());
    }

    #[test]
    fn electrum_and_parity_schemes() {
        assert_eq!(SignatureScheme::Electrum.v(0), 27);
        assert_eq!(SignatureScheme::Electrum.v(1), 28);
        assert_eq!(SignatureScheme::Electrum.recovery_id(28).unwrap(), 1);
        assert!(SignatureScheme::Electrum.recovery_id(29).is_err());

        assert_eq!(SignatureScheme::YParity.v(1), 1);
        assert_eq!(SignatureScheme::YParity.recovery_id(0).unwrap(), 0);
        assert!(SignatureScheme::YParity.recovery_id(2).is_err());
    }

    #[test]
    fn transaction_type_byte() {
        assert_eq!(TransactionType::try_from(2).unwrap(), TransactionType::Eip1559);
        assert!(matches!(
            TransactionType::try_from(3),
            Err(EncodingError::UnknownTransactionType(3))
        ));
    }
}
