#![allow(clippy::upper_case_acronyms)]
//! Helpers for interacting with the Ethereum Ledger App
//! [Official Docs](https://github.com/LedgerHQ/app-ethereum/blob/master/doc/ethapp.adoc)
use super::config::ConfigError;
use ledger_eth_core::types::{
    transaction::EncodingError, Address, SignatureError,
};
use ledger_eth_transport::TransportError;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Class byte of the Ethereum application
pub const CLA: u8 = 0xe0;

/// Oldest app version implementing `SIGN_ETH_EIP_712`
pub const EIP712_MIN_VERSION: &str = ">=1.6.0";

/// Oldest app version the client talks to, checked on connect
pub const MIN_APP_VERSION: &str = ">=1.2.4";

/// The BIP-32 hardened flag
const HARDENED: u32 = 0x8000_0000;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Ledger wallet type
pub enum DerivationType {
    /// Ledger Live-generated HD path
    LedgerLive(usize),
    /// Legacy generated HD Path
    Legacy(usize),
    /// Any other path
    Other(String),
}

impl fmt::Display for DerivationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DerivationType::Legacy(index) => write!(f, "m/44'/60'/0'/{index}"),
            DerivationType::LedgerLive(index) => write!(f, "m/44'/60'/{index}'/0/0"),
            DerivationType::Other(inner) => f.write_str(inner),
        }
    }
}

impl DerivationType {
    /// Parses the path this derivation designates
    pub fn path(&self) -> Result<DerivationPath, LedgerError> {
        self.to_string().parse()
    }

    /// The discovery tree this derivation belongs to, `None` for custom paths
    pub fn root(&self) -> Option<DerivationRoot> {
        match self {
            DerivationType::LedgerLive(_) => Some(DerivationRoot::LedgerLive),
            DerivationType::Legacy(_) => Some(DerivationRoot::Legacy),
            DerivationType::Other(_) => None,
        }
    }
}

/// The account tree walked by account discovery
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DerivationRoot {
    /// `m/44'/60'/{index}'/0/0`
    #[default]
    LedgerLive,
    /// `m/44'/60'/0'/{index}`
    Legacy,
}

impl DerivationRoot {
    /// The derivation of the account at `index`
    pub fn derivation(&self, index: usize) -> DerivationType {
        match self {
            DerivationRoot::LedgerLive => DerivationType::LedgerLive(index),
            DerivationRoot::Legacy => DerivationType::Legacy(index),
        }
    }
}

/// A parsed BIP-32 derivation path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// The app rejects paths deeper than this
    pub const MAX_DEPTH: usize = 10;

    pub fn new(indices: Vec<u32>) -> Result<Self, LedgerError> {
        if indices.is_empty() || indices.len() > Self::MAX_DEPTH {
            return Err(LedgerError::UnsupportedDerivation(format!(
                "path depth must be between 1 and {}, got {}",
                Self::MAX_DEPTH,
                indices.len()
            )))
        }
        Ok(Self(indices))
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// Wire encoding: `depth:u8 ‖ index:u32be*`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 4 * self.0.len());
        bytes.push(self.0.len() as u8);
        for index in &self.0 {
            bytes.extend_from_slice(&index.to_be_bytes());
        }
        bytes
    }
}

impl FromStr for DerivationPath {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::UnsupportedDerivation(s.to_string());
        let s = s.strip_prefix("m/").unwrap_or(s);
        let indices = s
            .split('/')
            .map(|element| {
                let (digits, hardened) = match element.strip_suffix('\'') {
                    Some(digits) => (digits, true),
                    None => (element, false),
                };
                let index = digits.parse::<u32>().map_err(|_| invalid())?;
                if index & HARDENED != 0 {
                    return Err(invalid())
                }
                Ok(if hardened { index | HARDENED } else { index })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(indices)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
/// Error when using the Ledger transport
pub enum LedgerError {
    /// Underlying transport error
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("{ins} was rejected on the device")]
    UserRejected { ins: INS },
    #[error("{ins} failed, the device is locked (status {status:#06x})")]
    DeviceLocked { ins: INS, status: u16 },
    #[error("{ins} failed, the Ethereum app is not open (status {status:#06x})")]
    AppNotOpen { ins: INS, status: u16 },
    /// Also returned when blind signing is disabled for contract data
    #[error("{ins} failed, the app rejected the data or blind signing is disabled (status {status:#06x})")]
    InvalidData { ins: INS, status: u16 },
    #[error("{ins} failed with status {status:#06x}: {description}")]
    Device { ins: INS, status: u16, description: String },
    /// Got a response, but it could not be decoded
    #[error("malformed {ins} response: {reason}")]
    MalformedResponse { ins: INS, reason: String },
    #[error("unsupported derivation path: {0}")]
    UnsupportedDerivation(String),
    #[error("{address:?} not found in the first {searched} accounts")]
    DiscoveryExhausted { address: Address, searched: usize },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// The device signed with a different key than the one at the signing path
    #[error("signature recovers to {recovered:?}, expected {expected:?}")]
    SignatureMismatch { expected: Address, recovered: Address },
    /// Error when signing EIP712 struct with not compatible Ledger ETH app
    #[error("Ledger ethereum app requires at least version: {0:?}")]
    UnsupportedAppVersion(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    /// Error when converting a semver requirement
    SemVer(#[from] semver::Error),
    #[error(transparent)]
    /// Error when converting from a hex string
    Hex(#[from] hex::FromHexError),
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum INS {
    GET_PUBLIC_KEY = 0x02,
    SIGN = 0x04,
    GET_APP_CONFIGURATION = 0x06,
    SIGN_PERSONAL_MESSAGE = 0x08,
    SIGN_ETH_EIP_712 = 0x0C,
}

impl std::fmt::Display for INS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            INS::GET_PUBLIC_KEY => write!(f, "GET_PUBLIC_KEY"),
            INS::SIGN => write!(f, "SIGN"),
            INS::GET_APP_CONFIGURATION => write!(f, "GET_APP_CONFIGURATION"),
            INS::SIGN_PERSONAL_MESSAGE => write!(f, "SIGN_PERSONAL_MESSAGE"),
            INS::SIGN_ETH_EIP_712 => write!(f, "SIGN_ETH_EIP_712"),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum P1 {
    NON_CONFIRM = 0x00,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
pub enum P2 {
    NO_CHAINCODE = 0x00,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_types() {
        assert_eq!(DerivationType::LedgerLive(2).to_string(), "m/44'/60'/2'/0/0");
        assert_eq!(DerivationType::Legacy(2).to_string(), "m/44'/60'/0'/2");
        assert_eq!(DerivationRoot::Legacy.derivation(4), DerivationType::Legacy(4));
        assert_eq!(DerivationType::Legacy(4).root(), Some(DerivationRoot::Legacy));
        assert_eq!(DerivationType::LedgerLive(1).root(), Some(DerivationRoot::LedgerLive));
        assert_eq!(DerivationType::Other("m/44'/60'/0'/0/0".into()).root(), None);
        assert_eq!(DerivationRoot::default().derivation(4), DerivationType::LedgerLive(4));
    }

    #[test]
    fn path_wire_encoding() {
        let path = DerivationType::LedgerLive(0).path().unwrap();
        assert_eq!(
            path.to_bytes(),
            vec![
                0x05, 0x80, 0x00, 0x00, 0x2c, 0x80, 0x00, 0x00, 0x3c, 0x80, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00
            ]
        );
        assert_eq!(path.to_string(), "m/44'/60'/0'/0/0");
    }

    #[test]
    fn parses_with_and_without_root() {
        let with_root: DerivationPath = "m/44'/60'/0'/0/0".parse().unwrap();
        let without: DerivationPath = "44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(with_root, without);
        assert_eq!(without.indices()[1], 0x8000_003c);
    }

    #[test]
    fn rejects_invalid_paths() {
        for path in ["", "m/", "m/44'/x", "m/2147483648", "m/44''/0", "1/2/3/4/5/6/7/8/9/10/11"] {
            assert!(
                matches!(path.parse::<DerivationPath>(), Err(LedgerError::UnsupportedDerivation(_))),
                "{path}"
            );
        }
        assert!(DerivationType::Other("m/44'/60'/0'".to_string()).path().is_ok());
        assert!("1/2/3/4/5/6/7/8/9/10".parse::<DerivationPath>().is_ok());
    }
}
