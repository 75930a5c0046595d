use super::{decode_val, request::TransactionRequest, NUM_TX_FIELDS};
use crate::types::{Address, Bytes, Signature, H256, U64};

use rlp::RlpStream;
use rlp_derive::{RlpDecodable, RlpDecodableWrapper, RlpEncodable, RlpEncodableWrapper};
use serde::{Deserialize, Serialize};

const NUM_EIP2930_FIELDS: usize = NUM_TX_FIELDS - 1;

/// Access list
#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    RlpEncodableWrapper,
    RlpDecodableWrapper,
)]
pub struct AccessList(pub Vec<AccessListItem>);

impl From<Vec<AccessListItem>> for AccessList {
    fn from(src: Vec<AccessListItem>) -> AccessList {
        AccessList(src)
    }
}

/// Access list item
#[derive(
    Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, RlpEncodable, RlpDecodable,
)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// Accessed address
    pub address: Address,
    /// Accessed storage keys
    pub storage_keys: Vec<H256>,
}

/// An [EIP-2930](https://eips.ethereum.org/EIPS/eip-2930) transaction: the legacy fields plus
/// a mandatory chain id and an access list.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq, Debug)]
pub struct Eip2930TransactionRequest {
    #[serde(flatten)]
    pub tx: TransactionRequest,
    #[serde(rename = "accessList", default)]
    pub access_list: AccessList,
}

impl Eip2930TransactionRequest {
    pub fn new(tx: TransactionRequest, access_list: AccessList) -> Self {
        Self { tx, access_list }
    }

    /// Gets the unsigned transaction's RLP list, without the type byte
    pub fn rlp(&self) -> Bytes {
        let mut rlp = RlpStream::new();
        rlp.begin_list(NUM_EIP2930_FIELDS);
        self.rlp_base(&mut rlp);
        rlp.out().freeze().into()
    }

    /// Produces the RLP list of the transaction with the provided signature, without the type
    /// byte. `v` is written as the y-parity.
    pub fn rlp_signed(&self, signature: &Signature, y_parity: u8) -> Bytes {
        let mut rlp = RlpStream::new();
        rlp.begin_list(NUM_EIP2930_FIELDS + 3);
        self.rlp_base(&mut rlp);

        rlp.append(&y_parity);
        rlp.append(&signature.r);
        rlp.append(&signature.s);
        rlp.out().freeze().into()
    }

    fn rlp_base(&self, rlp: &mut RlpStream) {
        rlp.append(&self.tx.chain_id.unwrap_or_default());
        self.tx.rlp_base(rlp);
        rlp.append(&self.access_list);
    }

    /// Decodes the RLP list following the type byte
    pub fn decode_unsigned_rlp(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        if rlp.item_count()? != NUM_EIP2930_FIELDS {
            return Err(rlp::DecoderError::RlpIncorrectListLen)
        }
        let mut offset = 0;
        let chain_id: U64 = decode_val(rlp, &mut offset)?;
        let mut tx = TransactionRequest::decode_base_rlp(rlp, &mut offset)?;
        tx.chain_id = Some(chain_id);
        let access_list = decode_val(rlp, &mut offset)?;
        Ok(Self { tx, access_list })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::str::FromStr;

    #[test]
    fn access_list_encoding() {
        let list = AccessList(vec![AccessListItem {
            address: Address::from_str("0x0000000000000000000000000000000000000001").unwrap(),
            storage_keys: vec![H256::zero()],
        }]);
        let encoded = rlp::encode(&list);
        assert_eq!(
            encoded.to_vec(),
            hex!("f838f7940000000000000000000000000000000000000001e1a00000000000000000000000000000000000000000000000000000000000000000")
        );
        let decoded: AccessList = rlp::decode(&encoded).unwrap();
        assert_eq!(decoded, list);

        assert_eq!(rlp::encode(&AccessList::default()).to_vec(), vec![0xc0]);
    }

    #[test]
    fn access_list_serde() {
        let json = r#"[{"address":"0x0000000000000000000000000000000000000001","storageKeys":[]}]"#;
        let list: AccessList = serde_json::from_str(json).unwrap();
        assert_eq!(list.0.len(), 1);
        assert_eq!(serde_json::to_string(&list).unwrap(), json);
    }

    #[test]
    fn field_layout() {
        let tx = Eip2930TransactionRequest::new(
            TransactionRequest::new().chain_id(1).nonce(0).gas_price(1).gas(21000),
            AccessList::default(),
        );
        let encoded = tx.rlp();
        let rlp = rlp::Rlp::new(&encoded);
        assert_eq!(rlp.item_count().unwrap(), 8);
        assert_eq!(rlp.val_at::<U64>(0).unwrap(), 1u64.into());
        // `to` is empty for contract creation
        assert!(rlp.at(4).unwrap().is_empty());
        assert_eq!(rlp.at(7).unwrap().as_raw(), &[0xc0]);

        let decoded = Eip2930TransactionRequest::decode_unsigned_rlp(&rlp).unwrap();
        assert_eq!(decoded.rlp(), encoded);
    }
}
