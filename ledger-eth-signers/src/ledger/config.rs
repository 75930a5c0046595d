use super::types::DerivationRoot;
use std::num::ParseIntError;
use thiserror::Error;

pub const MAX_ACCOUNTS_FETCH_VAR: &str = "MAX_ACCOUNTS_FETCH";
pub const DEFAULT_ACCOUNTS_FETCH_VAR: &str = "DEFAULT_ACCOUNTS_FETCH";
pub const LEGACY_ACCOUNTS_VAR: &str = "LEDGER_LEGACY_ACCOUNTS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {source}")]
    InvalidInteger {
        var: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

/// Account discovery settings, captured once and handed to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound on how many accounts discovery probes
    pub max_accounts_fetch: usize,
    /// How many accounts [`LedgerEthereum::accounts`](super::app::LedgerEthereum::accounts)
    /// returns
    pub default_accounts_fetch: usize,
    pub derivation_root: DerivationRoot,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_accounts_fetch: 5,
            default_accounts_fetch: 3,
            derivation_root: DerivationRoot::LedgerLive,
        }
    }
}

impl LedgerConfig {
    /// Reads `MAX_ACCOUNTS_FETCH`, `DEFAULT_ACCOUNTS_FETCH` and `LEDGER_LEGACY_ACCOUNTS` from the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Builds the configuration from `(name, value)` pairs. Unset variables keep their
    /// defaults; `LEDGER_LEGACY_ACCOUNTS` selects the legacy root when present, whatever its
    /// value.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                MAX_ACCOUNTS_FETCH_VAR => {
                    config.max_accounts_fetch = parse_count(MAX_ACCOUNTS_FETCH_VAR, value)?
                }
                DEFAULT_ACCOUNTS_FETCH_VAR => {
                    config.default_accounts_fetch = parse_count(DEFAULT_ACCOUNTS_FETCH_VAR, value)?
                }
                LEGACY_ACCOUNTS_VAR => config.derivation_root = DerivationRoot::Legacy,
                _ => {}
            }
        }
        Ok(config)
    }

    #[must_use]
    pub fn derivation_root(mut self, derivation_root: DerivationRoot) -> Self {
        self.derivation_root = derivation_root;
        self
    }

    #[must_use]
    pub fn max_accounts_fetch(mut self, max_accounts_fetch: usize) -> Self {
        self.max_accounts_fetch = max_accounts_fetch;
        self
    }
}

fn parse_count(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|source| ConfigError::InvalidInteger {
        var,
        value: value.to_string(),
        source,
    })
}
