use super::{decode_data, decode_to, decode_val, eip2930::AccessList, rlp_opt};
use crate::{
    types::{Address, Bytes, Signature, H256, U256, U64},
    utils::keccak256,
};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

/// EIP-1559 transactions have 9 fields
const NUM_TX_FIELDS: usize = 9;

/// Parameters of an [EIP-1559](https://eips.ethereum.org/EIPS/eip-1559) transaction
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct Eip1559TransactionRequest {
    /// Sender address, informational only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    /// Recipient address (None for contract creation)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,

    /// Gas limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,

    /// Transfered value (None for no transfer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,

    #[serde(rename = "accessList", default)]
    pub access_list: AccessList,

    /// The maximum tip paid to the block producer per unit of gas
    #[serde(rename = "maxPriorityFeePerGas", default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,

    /// The maximum total fee (base fee plus tip) paid per unit of gas
    #[serde(rename = "maxFeePerGas", default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<U64>,
}

impl Eip1559TransactionRequest {
    /// Creates an empty transaction request with all fields left empty
    pub fn new() -> Self {
        Self::default()
    }

    // Builder pattern helpers

    #[must_use]
    pub fn from<T: Into<Address>>(mut self, from: T) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn to<T: Into<Address>>(mut self, to: T) -> Self {
        self.to = Some(to.into());
        self
    }

    #[must_use]
    pub fn gas<T: Into<U256>>(mut self, gas: T) -> Self {
        self.gas = Some(gas.into());
        self
    }

    #[must_use]
    pub fn max_priority_fee_per_gas<T: Into<U256>>(mut self, max_priority_fee_per_gas: T) -> Self {
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas.into());
        self
    }

    #[must_use]
    pub fn max_fee_per_gas<T: Into<U256>>(mut self, max_fee_per_gas: T) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas.into());
        self
    }

    #[must_use]
    pub fn value<T: Into<U256>>(mut self, value: T) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    #[must_use]
    pub fn access_list<T: Into<AccessList>>(mut self, access_list: T) -> Self {
        self.access_list = access_list.into();
        self
    }

    #[must_use]
    pub fn nonce<T: Into<U256>>(mut self, nonce: T) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    #[must_use]
    pub fn chain_id<T: Into<U64>>(mut self, chain_id: T) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }

    /// Hashes the transaction's signing payload, including the type byte
    pub fn sighash(&self) -> H256 {
        let mut encoded = vec![0x02];
        encoded.extend_from_slice(self.rlp().as_ref());
        keccak256(encoded).into()
    }

    /// Gets the unsigned transaction's RLP list, without the type byte
    pub fn rlp(&self) -> Bytes {
        let mut rlp = RlpStream::new();
        rlp.begin_list(NUM_TX_FIELDS);
        self.rlp_base(&mut rlp);
        rlp.out().freeze().into()
    }

    /// Produces the RLP list of the transaction with the provided signature, without the type
    /// byte. `v` is written as the y-parity.
    pub fn rlp_signed(&self, signature: &Signature, y_parity: u8) -> Bytes {
        let mut rlp = RlpStream::new();
        rlp.begin_list(NUM_TX_FIELDS + 3);
        self.rlp_base(&mut rlp);

        rlp.append(&y_parity);
        rlp.append(&signature.r);
        rlp.append(&signature.s);
        rlp.out().freeze().into()
    }

    pub(crate) fn rlp_base(&self, rlp: &mut RlpStream) {
        rlp.append(&self.chain_id.unwrap_or_default());
        rlp_opt(rlp, &self.nonce);
        rlp_opt(rlp, &self.max_priority_fee_per_gas);
        rlp_opt(rlp, &self.max_fee_per_gas);
        rlp_opt(rlp, &self.gas);
        rlp_opt(rlp, &self.to);
        rlp_opt(rlp, &self.value);
        rlp_opt(rlp, &self.data);
        rlp.append(&self.access_list);
    }

    /// Decodes the RLP list following the type byte
    pub fn decode_unsigned_rlp(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        if rlp.item_count()? != NUM_TX_FIELDS {
            return Err(rlp::DecoderError::RlpIncorrectListLen)
        }
        let mut offset = 0;
        let mut tx = Self::new();
        tx.chain_id = Some(decode_val(rlp, &mut offset)?);
        tx.nonce = Some(decode_val(rlp, &mut offset)?);
        tx.max_priority_fee_per_gas = Some(decode_val(rlp, &mut offset)?);
        tx.max_fee_per_gas = Some(decode_val(rlp, &mut offset)?);
        tx.gas = Some(decode_val(rlp, &mut offset)?);
        tx.to = decode_to(rlp, &mut offset)?;
        tx.value = Some(decode_val(rlp, &mut offset)?);
        tx.data = decode_data(rlp, &mut offset)?;
        tx.access_list = decode_val(rlp, &mut offset)?;
        Ok(tx)
    }
}
