//! [EIP-712](https://eips.ethereum.org/EIPS/eip-712) domain separators.
//!
//! The Ledger Ethereum application signs typed data from two precomputed hashes: the domain
//! separator and `hashStruct(message)`. Encoding arbitrary structs is left to the caller; this
//! module only computes the separator of the standard domain.
use crate::{
    types::{Address, H256, U256},
    utils::{keccak256, typed_data_hash},
};
use ethabi::{encode, Token};
use serde::{Deserialize, Serialize};

/// The standard EIP-712 domain. Fields left as `None` are omitted from the domain type.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EIP712Domain {
    ///  The user readable name of signing domain, i.e. the name of the DApp or the protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The current major version of the signing domain. Signatures from different versions are not
    /// compatible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// The EIP-155 chain id. The user-agent should refuse signing if it does not match the
    /// currently active chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U256>,

    /// The address of the contract that will verify the signature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,

    /// A disambiguating salt for the protocol. This can be used as a domain separator of last
    /// resort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<H256>,
}

impl EIP712Domain {
    /// Computes the domain separator, `hashStruct(eip712Domain)`.
    ///
    /// The full type is `EIP712Domain(string name,string version,uint256 chainId,address
    /// verifyingContract,bytes32 salt)`, restricted to the fields that are set.
    pub fn separator(&self) -> [u8; 32] {
        let mut fields = Vec::new();
        let mut tokens = Vec::new();

        if let Some(ref name) = self.name {
            fields.push("string name");
            tokens.push(Token::FixedBytes(keccak256(name).to_vec()));
        }
        if let Some(ref version) = self.version {
            fields.push("string version");
            tokens.push(Token::FixedBytes(keccak256(version).to_vec()));
        }
        if let Some(chain_id) = self.chain_id {
            fields.push("uint256 chainId");
            tokens.push(Token::Uint(chain_id));
        }
        if let Some(verifying_contract) = self.verifying_contract {
            fields.push("address verifyingContract");
            tokens.push(Token::Address(verifying_contract));
        }
        if let Some(salt) = self.salt {
            fields.push("bytes32 salt");
            tokens.push(Token::FixedBytes(salt.as_bytes().to_vec()));
        }

        let ty = format!("EIP712Domain({})", fields.join(","));
        tokens.insert(0, Token::FixedBytes(keccak256(ty).to_vec()));

        keccak256(encode(&tokens))
    }

    /// The digest signed for `message_hash` under this domain
    pub fn digest(&self, message_hash: [u8; 32]) -> H256 {
        typed_data_hash(self.separator(), message_hash)
    }
}
