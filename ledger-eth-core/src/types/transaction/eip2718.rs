use super::{
    eip1559::Eip1559TransactionRequest, eip2930::Eip2930TransactionRequest, EncodingError,
    SignatureScheme, TransactionType, MAX_CHAIN_ID, MAX_LEGACY_CHAIN_ID,
};
use crate::{
    types::{Address, Bytes, TransactionRequest, H256, U256, U64},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// An unsigned transaction of any type the Ledger Ethereum application can sign
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(tag = "type")]
pub enum TypedTransaction {
    // 0x00
    #[serde(rename = "0x00")]
    Legacy(TransactionRequest),
    // 0x01
    #[serde(rename = "0x01")]
    Eip2930(Eip2930TransactionRequest),
    // 0x02
    #[serde(rename = "0x02")]
    Eip1559(Eip1559TransactionRequest),
}

use TypedTransaction::*;

impl TypedTransaction {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Legacy(_) => TransactionType::Legacy,
            Eip2930(_) => TransactionType::Eip2930,
            Eip1559(_) => TransactionType::Eip1559,
        }
    }

    pub fn from(&self) -> Option<&Address> {
        match self {
            Legacy(inner) => inner.from.as_ref(),
            Eip2930(inner) => inner.tx.from.as_ref(),
            Eip1559(inner) => inner.from.as_ref(),
        }
    }

    pub fn set_from(&mut self, from: Address) {
        match self {
            Legacy(inner) => inner.from = Some(from),
            Eip2930(inner) => inner.tx.from = Some(from),
            Eip1559(inner) => inner.from = Some(from),
        };
    }

    pub fn to(&self) -> Option<&Address> {
        match self {
            Legacy(inner) => inner.to.as_ref(),
            Eip2930(inner) => inner.tx.to.as_ref(),
            Eip1559(inner) => inner.to.as_ref(),
        }
    }

    pub fn nonce(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.nonce.as_ref(),
            Eip2930(inner) => inner.tx.nonce.as_ref(),
            Eip1559(inner) => inner.nonce.as_ref(),
        }
    }

    pub fn value(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.value.as_ref(),
            Eip2930(inner) => inner.tx.value.as_ref(),
            Eip1559(inner) => inner.value.as_ref(),
        }
    }

    pub fn gas(&self) -> Option<&U256> {
        match self {
            Legacy(inner) => inner.gas.as_ref(),
            Eip2930(inner) => inner.tx.gas.as_ref(),
            Eip1559(inner) => inner.gas.as_ref(),
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        match self {
            Legacy(inner) => inner.data.as_ref(),
            Eip2930(inner) => inner.tx.data.as_ref(),
            Eip1559(inner) => inner.data.as_ref(),
        }
    }

    pub fn chain_id(&self) -> Option<U64> {
        match self {
            Legacy(inner) => inner.chain_id,
            Eip2930(inner) => inner.tx.chain_id,
            Eip1559(inner) => inner.chain_id,
        }
    }

    pub fn set_chain_id<T: Into<U64>>(&mut self, chain_id: T) {
        let chain_id = chain_id.into();
        match self {
            Legacy(inner) => inner.chain_id = Some(chain_id),
            Eip2930(inner) => inner.tx.chain_id = Some(chain_id),
            Eip1559(inner) => inner.chain_id = Some(chain_id),
        };
    }

    /// How `v` is assembled for a signature over this transaction
    pub fn signature_scheme(&self) -> SignatureScheme {
        match self {
            Legacy(inner) => match inner.protected_chain_id() {
                Some(chain_id) => SignatureScheme::Eip155 { chain_id: chain_id.as_u64() },
                None => SignatureScheme::Electrum,
            },
            Eip2930(_) | Eip1559(_) => SignatureScheme::YParity,
        }
    }

    /// Checks that the transaction can be encoded and signed by the device.
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.gas().is_none() {
            return Err(EncodingError::MissingField("gas"))
        }

        match self {
            Legacy(inner) => {
                if inner.gas_price.is_none() {
                    return Err(EncodingError::MissingField("gas_price"))
                }
                if let Some(chain_id) = inner.chain_id {
                    if chain_id > U64::from(MAX_LEGACY_CHAIN_ID) {
                        return Err(EncodingError::LegacyChainIdTooLarge(chain_id))
                    }
                }
            }
            Eip2930(inner) => {
                if inner.tx.gas_price.is_none() {
                    return Err(EncodingError::MissingField("gas_price"))
                }
                check_typed_chain_id(inner.tx.chain_id)?;
            }
            Eip1559(inner) => {
                check_typed_chain_id(inner.chain_id)?;
                let max_fee_per_gas =
                    inner.max_fee_per_gas.ok_or(EncodingError::MissingField("max_fee_per_gas"))?;
                let max_priority_fee_per_gas = inner
                    .max_priority_fee_per_gas
                    .ok_or(EncodingError::MissingField("max_priority_fee_per_gas"))?;
                if max_priority_fee_per_gas > max_fee_per_gas {
                    return Err(EncodingError::PriorityFeeTooHigh {
                        max_priority_fee_per_gas,
                        max_fee_per_gas,
                    })
                }
            }
        }
        Ok(())
    }

    /// The unsigned payload the device signs: the legacy signing list, or the type byte
    /// followed by the RLP list for typed transactions.
    pub fn rlp(&self) -> Bytes {
        let mut encoded = vec![];
        match self {
            Legacy(inner) => {
                encoded.extend_from_slice(inner.rlp().as_ref());
            }
            Eip2930(inner) => {
                encoded.push(TransactionType::Eip2930 as u8);
                encoded.extend_from_slice(inner.rlp().as_ref());
            }
            Eip1559(inner) => {
                encoded.push(TransactionType::Eip1559 as u8);
                encoded.extend_from_slice(inner.rlp().as_ref());
            }
        };

        encoded.into()
    }

    /// Hashes the unsigned payload. Does not double-RLP encode
    pub fn sighash(&self) -> H256 {
        keccak256(self.rlp()).into()
    }

    /// Decodes an unsigned payload as produced by [`TypedTransaction::rlp`]
    pub fn decode_unsigned(bytes: &[u8]) -> Result<Self, EncodingError> {
        let first = *bytes.first().ok_or(rlp::DecoderError::RlpIsTooShort)?;
        // a legacy payload starts with an RLP list header
        if first >= 0xc0 {
            let rlp = rlp::Rlp::new(bytes);
            return Ok(Legacy(TransactionRequest::decode_unsigned_rlp(&rlp)?))
        }

        let rlp = rlp::Rlp::new(&bytes[1..]);
        match TransactionType::try_from(first)? {
            TransactionType::Eip2930 => {
                Ok(Eip2930(Eip2930TransactionRequest::decode_unsigned_rlp(&rlp)?))
            }
            TransactionType::Eip1559 => {
                Ok(Eip1559(Eip1559TransactionRequest::decode_unsigned_rlp(&rlp)?))
            }
            TransactionType::Legacy => Err(EncodingError::UnknownTransactionType(first)),
        }
    }
}

fn check_typed_chain_id(chain_id: Option<U64>) -> Result<(), EncodingError> {
    let chain_id = chain_id.ok_or(EncodingError::MissingChainId)?;
    if chain_id > U64::from(MAX_CHAIN_ID) {
        return Err(EncodingError::ChainIdTooLarge(chain_id))
    }
    Ok(())
}

impl From<TransactionRequest> for TypedTransaction {
    fn from(src: TransactionRequest) -> TypedTransaction {
        TypedTransaction::Legacy(src)
    }
}

impl From<Eip2930TransactionRequest> for TypedTransaction {
    fn from(src: Eip2930TransactionRequest) -> TypedTransaction {
        TypedTransaction::Eip2930(src)
    }
}

impl From<Eip1559TransactionRequest> for TypedTransaction {
    fn from(src: Eip1559TransactionRequest) -> TypedTransaction {
        TypedTransaction::Eip1559(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessList, AccessListItem};
    use std::str::FromStr;

    fn recipient() -> Address {
        Address::from_str("0xf0155486a14539f784739be1c02e93f28eb8e960").unwrap()
    }

    #[test]
    fn serde_legacy_tx() {
        let tx = TransactionRequest::new().to(Address::zero()).value(U256::from(100));
        let tx: TypedTransaction = tx.into();
        let serialized = serde_json::to_string(&tx).unwrap();

        // deserializes to either the envelope type or the inner type
        let de: TypedTransaction = serde_json::from_str(&serialized).unwrap();
        assert_eq!(tx, de);

        let de: TransactionRequest = serde_json::from_str(&serialized).unwrap();
        assert_eq!(tx, TypedTransaction::Legacy(de));
    }

    #[test]
    fn type_prefixes() {
        let eip2930: TypedTransaction = Eip2930TransactionRequest::new(
            TransactionRequest::new().chain_id(1).nonce(1).gas_price(1).gas(21000),
            AccessList::default(),
        )
        .into();
        assert_eq!(eip2930.rlp()[0], 0x01);

        let eip1559: TypedTransaction = Eip1559TransactionRequest::new()
            .chain_id(1)
            .max_fee_per_gas(1)
            .max_priority_fee_per_gas(1)
            .gas(21000)
            .into();
        assert_eq!(eip1559.rlp()[0], 0x02);
        assert_eq!(eip1559.sighash(), H256(keccak256(eip1559.rlp())));

        let legacy: TypedTransaction =
            TransactionRequest::new().chain_id(1).gas_price(1).gas(21000).into();
        assert!(legacy.rlp()[0] >= 0xc0);
    }

    #[test]
    fn decode_unsigned_inverts_rlp() {
        let access_list = AccessList(vec![AccessListItem {
            address: recipient(),
            storage_keys: vec![H256::repeat_byte(0x01), H256::repeat_byte(0x02)],
        }]);
        let txs: Vec<TypedTransaction> = vec![
            TransactionRequest::new().nonce(3).gas_price(10).gas(21000).to(recipient()).into(),
            TransactionRequest::new()
                .nonce(3)
                .gas_price(10)
                .gas(21000)
                .to(recipient())
                .value(U256::exp10(18))
                .chain_id(MAX_LEGACY_CHAIN_ID)
                .into(),
            Eip2930TransactionRequest::new(
                TransactionRequest::new().chain_id(5).nonce(7).gas_price(9).gas(60000),
                access_list.clone(),
            )
            .into(),
            Eip1559TransactionRequest::new()
                .chain_id(137)
                .nonce(0)
                .max_priority_fee_per_gas(1)
                .max_fee_per_gas(2)
                .gas(90000)
                .to(recipient())
                .data(vec![0xa9, 0x05, 0x9c, 0xbb])
                .access_list(access_list)
                .into(),
        ];

        for tx in txs {
            let encoded = tx.rlp();
            let decoded = TypedTransaction::decode_unsigned(&encoded).unwrap();
            assert_eq!(decoded.transaction_type(), tx.transaction_type());
            assert_eq!(decoded.rlp(), encoded);
        }
    }

    #[test]
    fn decode_rejects_unknown_types() {
        assert!(matches!(
            TypedTransaction::decode_unsigned(&[0x03, 0xc0]),
            Err(EncodingError::UnknownTransactionType(0x03))
        ));
        assert!(TypedTransaction::decode_unsigned(&[]).is_err());
    }

    #[test]
    fn validation() {
        let legacy = TransactionRequest::new().gas_price(1).gas(21000);
        assert!(<TypedTransaction as From<_>>::from(legacy.clone()).validate().is_ok());
        assert!(<TypedTransaction as From<_>>::from(legacy.clone().chain_id(MAX_LEGACY_CHAIN_ID))
            .validate()
            .is_ok());
        assert!(matches!(
            <TypedTransaction as From<_>>::from(legacy.clone().chain_id(MAX_LEGACY_CHAIN_ID + 1)).validate(),
            Err(EncodingError::LegacyChainIdTooLarge(_))
        ));
        assert!(matches!(
            <TypedTransaction as From<_>>::from(TransactionRequest::new().gas_price(1)).validate(),
            Err(EncodingError::MissingField("gas"))
        ));

        let eip1559 = Eip1559TransactionRequest::new().gas(21000).max_fee_per_gas(10);
        assert!(matches!(
            <TypedTransaction as From<_>>::from(eip1559.clone()).validate(),
            Err(EncodingError::MissingChainId)
        ));
        assert!(matches!(
            <TypedTransaction as From<_>>::from(eip1559.clone().chain_id(1)).validate(),
            Err(EncodingError::MissingField("max_priority_fee_per_gas"))
        ));
        assert!(matches!(
            <TypedTransaction as From<_>>::from(eip1559.clone().chain_id(1).max_priority_fee_per_gas(11))
                .validate(),
            Err(EncodingError::PriorityFeeTooHigh { .. })
        ));
        assert!(matches!(
            <TypedTransaction as From<_>>::from(
                eip1559.clone().chain_id(MAX_CHAIN_ID + 1).max_priority_fee_per_gas(1)
            )
            .validate(),
            Err(EncodingError::ChainIdTooLarge(_))
        ));
        assert!(<TypedTransaction as From<_>>::from(eip1559.chain_id(1).max_priority_fee_per_gas(10))
            .validate()
            .is_ok());
    }

    #[test]
    fn signature_schemes() {
        let legacy = TransactionRequest::new();
        assert_eq!(
            <TypedTransaction as From<_>>::from(legacy.clone()).signature_scheme(),
            SignatureScheme::Electrum
        );
        assert_eq!(
            <TypedTransaction as From<_>>::from(legacy.clone().chain_id(0)).signature_scheme(),
            SignatureScheme::Electrum
        );
        assert_eq!(
            <TypedTransaction as From<_>>::from(legacy.chain_id(56)).signature_scheme(),
            SignatureScheme::Eip155 { chain_id: 56 }
        );
        assert_eq!(
            <TypedTransaction as From<_>>::from(Eip1559TransactionRequest::new()).signature_scheme(),
            SignatureScheme::YParity
        );
    }
}
