//! Reassembly of device signatures into signed transactions.
use super::{
    decode_val, eip1559::Eip1559TransactionRequest, eip2718::TypedTransaction,
    eip2930::Eip2930TransactionRequest, request::TransactionRequest, EncodingError,
    TransactionType, NUM_TX_FIELDS,
};
use crate::{
    types::{Address, Bytes, Signature, SignatureError, TxHash, U256, U64},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// An unsigned transaction together with the signature the device produced for it.
///
/// `signature.v` holds the final `v`: `chain_id * 2 + 35 + parity` for EIP-155 legacy
/// transactions, `27 + parity` for unprotected ones and the bare parity for typed transactions.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct SignedTransaction {
    pub tx: TypedTransaction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Attaches a device signature answer `v(1) ‖ r(32) ‖ s(32)` to `tx`, assembling the full
    /// `v` for the transaction's signature scheme.
    pub fn from_device_signature(
        tx: TypedTransaction,
        answer: &[u8],
    ) -> Result<Self, EncodingError> {
        if answer.len() != 65 {
            return Err(EncodingError::InvalidSignatureLength(answer.len()))
        }

        let scheme = tx.signature_scheme();
        let recovery_id = scheme.recovery_id(answer[0])?;
        let signature = Signature {
            r: U256::from_big_endian(&answer[1..33]),
            s: U256::from_big_endian(&answer[33..65]),
            v: scheme.v(recovery_id),
        };
        Ok(Self { tx, signature })
    }

    /// The raw signed transaction, ready for `eth_sendRawTransaction`
    pub fn rlp(&self) -> Bytes {
        match &self.tx {
            TypedTransaction::Legacy(inner) => inner.rlp_signed(&self.signature),
            TypedTransaction::Eip2930(inner) => {
                let mut encoded = vec![TransactionType::Eip2930 as u8];
                encoded.extend_from_slice(&inner.rlp_signed(&self.signature, self.y_parity()));
                encoded.into()
            }
            TypedTransaction::Eip1559(inner) => {
                let mut encoded = vec![TransactionType::Eip1559 as u8];
                encoded.extend_from_slice(&inner.rlp_signed(&self.signature, self.y_parity()));
                encoded.into()
            }
        }
    }

    /// The transaction hash, `keccak256` of the raw signed transaction
    pub fn hash(&self) -> TxHash {
        keccak256(self.rlp()).into()
    }

    /// Recovers the sender from the signature over the unsigned payload
    pub fn recover_from(&self) -> Result<Address, SignatureError> {
        self.signature.recover(self.tx.sighash())
    }

    fn y_parity(&self) -> u8 {
        // assembled by `from_device_signature` or `decode`, always 0 or 1 for typed transactions
        (self.signature.v & 1) as u8
    }

    /// Decodes a raw signed transaction as produced by [`SignedTransaction::rlp`].
    pub fn decode(raw: &[u8]) -> Result<Self, EncodingError> {
        let first = *raw.first().ok_or(rlp::DecoderError::RlpIsTooShort)?;
        if first >= 0xc0 {
            let rlp = rlp::Rlp::new(raw);
            if rlp.item_count()? != NUM_TX_FIELDS {
                return Err(rlp::DecoderError::RlpIncorrectListLen.into())
            }
            let mut offset = 0;
            let mut tx = TransactionRequest::decode_base_rlp(&rlp, &mut offset)?;
            let signature = decode_signature(&rlp, &mut offset)?;
            // https://eips.ethereum.org/EIPS/eip-155
            tx.chain_id = match signature.v {
                27 | 28 => None,
                v if v >= 35 => Some(U64::from((v - 35) >> 1)),
                _ => return Err(SignatureError::InvalidRecoveryId(signature.v).into()),
            };
            return Ok(Self { tx: tx.into(), signature })
        }

        let body = rlp::Rlp::new(&raw[1..]);
        let count = body.item_count()?;
        if count < 3 {
            return Err(rlp::DecoderError::RlpIncorrectListLen.into())
        }
        let unsigned = unsigned_prefix(&body, count - 3)?;
        let tx = match TransactionType::try_from(first)? {
            TransactionType::Eip2930 => TypedTransaction::Eip2930(
                Eip2930TransactionRequest::decode_unsigned_rlp(&rlp::Rlp::new(&unsigned))?,
            ),
            TransactionType::Eip1559 => TypedTransaction::Eip1559(
                Eip1559TransactionRequest::decode_unsigned_rlp(&rlp::Rlp::new(&unsigned))?,
            ),
            TransactionType::Legacy => return Err(EncodingError::UnknownTransactionType(first)),
        };
        let mut offset = count - 3;
        let signature = decode_signature(&body, &mut offset)?;
        if signature.v > 1 {
            return Err(SignatureError::InvalidRecoveryId(signature.v).into())
        }
        Ok(Self { tx, signature })
    }
}

/// Decodes an unsigned payload and attaches the device signature answer to it.
///
/// This is the entry point for callers that only kept the bytes sent to the device.
pub fn decode_signed(unsigned: &[u8], answer: &[u8]) -> Result<SignedTransaction, EncodingError> {
    let tx = TypedTransaction::decode_unsigned(unsigned)?;
    SignedTransaction::from_device_signature(tx, answer)
}

/// Decodes `v, r, s` at the given offset, incrementing it for each element
fn decode_signature(rlp: &rlp::Rlp, offset: &mut usize) -> Result<Signature, rlp::DecoderError> {
    Ok(Signature {
        v: decode_val(rlp, offset)?,
        r: decode_val(rlp, offset)?,
        s: decode_val(rlp, offset)?,
    })
}

/// Re-encodes the first `count` items of `list` as a list of their own
fn unsigned_prefix(list: &rlp::Rlp, count: usize) -> Result<Vec<u8>, rlp::DecoderError> {
    let mut stream = rlp::RlpStream::new_list(count);
    for index in 0..count {
        stream.append_raw(list.at(index)?.as_raw(), 1);
    }
    Ok(stream.out().to_vec())
}
