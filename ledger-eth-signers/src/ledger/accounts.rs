use super::types::{DerivationPath, LedgerError, INS};
use ledger_eth_core::{
    types::Address,
    utils::{public_key_to_address, to_checksum},
};
use std::fmt;

/// An account held by the device: the address at a derivation path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub path: DerivationPath,
    pub address: Address,
    /// Uncompressed SEC1 public key, when the device returned one
    pub public_key: Option<Vec<u8>>,
}

impl Account {
    /// Decodes a `GET_PUBLIC_KEY` answer: `pk_len ‖ public key ‖ addr_len ‖ ascii hex address`.
    ///
    /// When a public key is present the address is checked against it.
    pub(crate) fn from_answer(path: DerivationPath, answer: &[u8]) -> Result<Self, LedgerError> {
        let malformed = |reason: String| LedgerError::MalformedResponse { ins: INS::GET_PUBLIC_KEY, reason };

        let (&pk_len, rest) =
            answer.split_first().ok_or_else(|| malformed("empty response".to_string()))?;
        let pk_len = pk_len as usize;
        if rest.len() < pk_len + 1 {
            return Err(malformed(format!("{} bytes cannot hold a {pk_len} byte public key", answer.len())))
        }
        let (public_key, rest) = rest.split_at(pk_len);
        let addr_len = rest[0] as usize;
        let address_hex = rest
            .get(1..1 + addr_len)
            .ok_or_else(|| malformed(format!("address truncated, expected {addr_len} bytes")))?;
        let address_hex = address_hex.strip_prefix(b"0x").unwrap_or(address_hex);
        let bytes = hex::decode(address_hex)?;
        if bytes.len() != 20 {
            return Err(malformed(format!("address is {} bytes long", bytes.len())))
        }
        let address = Address::from_slice(&bytes);

        let public_key = if public_key.is_empty() {
            None
        } else {
            let derived = public_key_to_address(public_key)
                .ok_or_else(|| malformed(format!("invalid {pk_len} byte public key")))?;
            if derived != address {
                return Err(malformed(format!(
                    "address {address:?} does not match public key address {derived:?}"
                )))
            }
            Some(public_key.to_vec())
        };

        Ok(Self { path, address, public_key })
    }

    /// The EIP-55 checksummed address
    pub fn checksum_address(&self) -> String {
        to_checksum(&self.address)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.checksum_address())
    }
}
