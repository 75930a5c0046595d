use super::{
    accounts::Account,
    config::LedgerConfig,
    types::{
        DerivationPath, DerivationRoot, DerivationType, LedgerError, CLA, EIP712_MIN_VERSION,
        INS, MIN_APP_VERSION, P1, P2,
    },
};
use ledger_eth_core::{
    types::{
        transaction::EncodingError, Address, Signature, SignatureScheme, SignedTransaction,
        TypedTransaction, U256,
    },
    utils::{hash_message, typed_data_hash},
};
use ledger_eth_transport::{chunk_payload, APDUAnswer, StatusWord, Transport, TransportError};
use std::{
    fmt,
    sync::{Mutex, MutexGuard, TryLockError},
};
use tracing::{debug, instrument, warn};

/// What a command does when another command holds the device
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Block until the device is free
    #[default]
    Wait,
    /// Return [`TransportError::DeviceBusy`] immediately
    FailFast,
}

/// A Ledger Ethereum App.
///
/// Every command, including all chunks of a chunked payload, runs while holding the lock on
/// the transport, so a client can be shared between threads.
pub struct LedgerEthereum<T> {
    transport: Mutex<T>,
    derivation: DerivationType,
    path: DerivationPath,
    config: LedgerConfig,
    busy_policy: BusyPolicy,
    pub(crate) chain_id: u64,
    pub(crate) address: Address,
}

impl<T> fmt::Debug for LedgerEthereum<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerEthereum")
            .field("derivation", &self.derivation)
            .field("config", &self.config)
            .field("busy_policy", &self.busy_policy)
            .field("chain_id", &self.chain_id)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> LedgerEthereum<T> {
    /// Instantiate the application over `transport`, checking the app version and fetching the
    /// address at `derivation`. Discovery walks the tree `derivation` belongs to.
    ///
    /// ```
    /// use ledger_eth_signers::{DerivationType, LedgerEthereum};
    /// use ledger_eth_transport::{RecordStore, TransportReplayer};
    /// use std::str::FromStr;
    ///
    /// let store = RecordStore::from_str(
    ///     "=> e006000000
    ///      <= 01010a02 9000
    ///      => e002000015058000002c8000003c800000000000000000000000
    ///      <= 0028 37653566343535323039316136393132356435646663623762386332363539303239333935626466 9000",
    /// )
    /// .unwrap();
    /// let ledger =
    ///     LedgerEthereum::new(TransportReplayer::new(store), DerivationType::LedgerLive(0), 1)
    ///         .unwrap();
    /// assert_eq!(format!("{:?}", ledger.address()), "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    /// ```
    pub fn new(transport: T, derivation: DerivationType, chain_id: u64) -> Result<Self, LedgerError> {
        let root = derivation.root().unwrap_or_default();
        let config = LedgerConfig::default().derivation_root(root);
        Self::with_config(transport, derivation, chain_id, config)
    }

    /// Like [`LedgerEthereum::new`], with explicit account discovery settings.
    ///
    /// A Ledger Live or legacy `derivation` must belong to `config.derivation_root`, so that the
    /// signing account is one discovery can return.
    pub fn with_config(
        transport: T,
        derivation: DerivationType,
        chain_id: u64,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        check_root(&derivation, config.derivation_root)?;
        let path = derivation.path()?;
        let mut ledger = Self {
            transport: Mutex::new(transport),
            derivation,
            path,
            config,
            busy_policy: BusyPolicy::default(),
            chain_id,
            address: Address::zero(),
        };
        ledger.require_version(MIN_APP_VERSION)?;
        ledger.address = ledger.get_address()?;
        Ok(ledger)
    }

    #[must_use]
    pub fn with_busy_policy(mut self, busy_policy: BusyPolicy) -> Self {
        self.busy_policy = busy_policy;
        self
    }

    /// The address at the signing path, fetched on creation
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn derivation(&self) -> &DerivationType {
        &self.derivation
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Consume self and close the transport
    pub fn close(self) -> Result<(), LedgerError> {
        let mut transport = self.transport.into_inner().unwrap_or_else(|e| e.into_inner());
        transport.close()?;
        Ok(())
    }

    /// Get the account which corresponds to our derivation path
    pub fn get_address(&self) -> Result<Address, LedgerError> {
        Ok(self.get_address_with_path(&self.derivation)?.address)
    }

    /// Gets the account which corresponds to the provided derivation path
    #[instrument(skip(self), fields(path = %derivation))]
    pub fn get_address_with_path(&self, derivation: &DerivationType) -> Result<Account, LedgerError> {
        let path = derivation.path()?;
        let answer = self.exchange(INS::GET_PUBLIC_KEY, P1::NON_CONFIRM as u8, path.to_bytes())?;
        let account = Account::from_answer(path, &answer)?;
        debug!(address = ?account.address, "fetched account");
        Ok(account)
    }

    /// The first `default_accounts_fetch` accounts under the configured root
    pub fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        self.get_accounts(self.config.default_accounts_fetch)
    }

    /// Fetches the accounts at indices `0..count` under the configured derivation root.
    ///
    /// `count` is capped at `max_accounts_fetch`. Accounts are fetched one at a time and the
    /// first error aborts discovery.
    pub fn get_accounts(&self, count: usize) -> Result<Vec<Account>, LedgerError> {
        let max = self.config.max_accounts_fetch;
        if count > max {
            warn!(count, max, "requested more accounts than MAX_ACCOUNTS_FETCH, capping");
        }
        (0..count.min(max))
            .map(|index| self.get_address_with_path(&self.config.derivation_root.derivation(index)))
            .collect()
    }

    /// Finds the account holding `address` among the first `max_accounts_fetch` accounts
    pub fn find_account(&self, address: Address) -> Result<Account, LedgerError> {
        let searched = self.config.max_accounts_fetch;
        for index in 0..searched {
            let account =
                self.get_address_with_path(&self.config.derivation_root.derivation(index))?;
            if account.address == address {
                return Ok(account)
            }
        }
        Err(LedgerError::DiscoveryExhausted { address, searched })
    }

    /// Returns the semver of the Ethereum ledger app
    pub fn version(&self) -> Result<String, LedgerError> {
        let answer = self.exchange(INS::GET_APP_CONFIGURATION, P1::NON_CONFIRM as u8, vec![])?;
        if answer.len() < 4 {
            return Err(LedgerError::MalformedResponse {
                ins: INS::GET_APP_CONFIGURATION,
                reason: format!("expected 4 bytes, got {}", answer.len()),
            })
        }
        Ok(format!("{}.{}.{}", answer[1], answer[2], answer[3]))
    }

    /// Signs an Ethereum transaction (requires confirmation on the ledger).
    ///
    /// The transaction is signed as given: a legacy transaction without a chain id yields an
    /// unprotected signature.
    #[instrument(skip(self, tx), fields(tx_type = ?tx.transaction_type()))]
    pub fn sign_tx(&self, tx: &TypedTransaction) -> Result<SignedTransaction, LedgerError> {
        tx.validate()?;
        let mut payload = self.path.to_bytes();
        payload.extend_from_slice(tx.rlp().as_ref());

        let answer = self.sign_payload(INS::SIGN, payload)?;
        let signed = SignedTransaction::from_device_signature(tx.clone(), &answer)?;
        self.check_signer(signed.recover_from()?)?;
        Ok(signed)
    }

    /// Signs an ethereum personal message. The device applies the EIP-191 prefix.
    #[instrument(skip(self, message))]
    pub fn sign_message<S: AsRef<[u8]>>(&self, message: S) -> Result<Signature, LedgerError> {
        let message = message.as_ref();
        let length = message_length(message.len())?;

        let mut payload = self.path.to_bytes();
        payload.extend_from_slice(&length.to_be_bytes());
        payload.extend_from_slice(message);

        let answer = self.sign_payload(INS::SIGN_PERSONAL_MESSAGE, payload)?;
        let signature = electrum_signature(INS::SIGN_PERSONAL_MESSAGE, &answer)?;
        self.check_signer(signature.recover(hash_message(message))?)?;
        Ok(signature)
    }

    /// Signs an EIP-712 payload from its domain separator and `hashStruct(message)`.
    ///
    /// Requires the Ethereum app `>= 1.6.0`.
    #[instrument(skip(self, domain_separator, message_hash))]
    pub fn sign_typed_data(
        &self,
        domain_separator: [u8; 32],
        message_hash: [u8; 32],
    ) -> Result<Signature, LedgerError> {
        self.require_version(EIP712_MIN_VERSION)?;

        let mut payload = self.path.to_bytes();
        payload.extend_from_slice(&domain_separator);
        payload.extend_from_slice(&message_hash);

        let answer = self.sign_payload(INS::SIGN_ETH_EIP_712, payload)?;
        let signature = electrum_signature(INS::SIGN_ETH_EIP_712, &answer)?;
        self.check_signer(signature.recover(typed_data_hash(domain_separator, message_hash))?)?;
        Ok(signature)
    }

    /// Fails with [`LedgerError::UnsupportedAppVersion`] unless the app matches `requirement`
    fn require_version(&self, requirement: &str) -> Result<(), LedgerError> {
        let req = semver::VersionReq::parse(requirement)?;
        let version = semver::Version::parse(&self.version()?)?;
        if !req.matches(&version) {
            warn!(%version, requirement, "unsupported Ethereum app version");
            return Err(LedgerError::UnsupportedAppVersion(requirement.to_string()))
        }
        Ok(())
    }

    // Helper function for signing either transaction data or personal messages. Returns the
    // raw `v ‖ r ‖ s` answer.
    fn sign_payload(&self, ins: INS, payload: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let answer = self.exchange(ins, 0x00, payload)?;
        if answer.len() < 65 {
            return Err(LedgerError::MalformedResponse {
                ins,
                reason: format!("expected a 65 byte signature, got {} bytes", answer.len()),
            })
        }
        Ok(answer[..65].to_vec())
    }

    /// Sends `payload` in as many chunks as needed while holding the device, and returns the
    /// data of the last answer.
    fn exchange(&self, ins: INS, p1: u8, payload: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let mut transport = self.lock()?;
        let mut commands = chunk_payload(CLA, ins as u8, P2::NO_CHAINCODE as u8, &payload);
        if let Some(first) = commands.first_mut() {
            first.p1 = p1;
        }

        let count = commands.len();
        let mut data = Vec::new();
        for (index, command) in commands.iter().enumerate() {
            debug!(%ins, chunk = index + 1, of = count, len = command.data.len(), "sending");
            data = check_answer(ins, transport.send(command)?)?;
        }
        Ok(data)
    }

    fn lock(&self) -> Result<MutexGuard<'_, T>, LedgerError> {
        let guard = match self.busy_policy {
            BusyPolicy::Wait => self.transport.lock().unwrap_or_else(|e| e.into_inner()),
            BusyPolicy::FailFast => match self.transport.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return Err(TransportError::DeviceBusy.into()),
            },
        };
        Ok(guard)
    }

    fn check_signer(&self, recovered: Address) -> Result<(), LedgerError> {
        if recovered != self.address {
            return Err(LedgerError::SignatureMismatch { expected: self.address, recovered })
        }
        Ok(())
    }
}

fn check_root(derivation: &DerivationType, root: DerivationRoot) -> Result<(), LedgerError> {
    match derivation.root() {
        Some(own) if own != root => Err(LedgerError::UnsupportedDerivation(format!(
            "{derivation} is outside the {root:?} account tree"
        ))),
        _ => Ok(()),
    }
}

fn message_length(len: usize) -> Result<u32, EncodingError> {
    u32::try_from(len).map_err(|_| EncodingError::MessageTooLong(len))
}

/// Maps a non-success status word to its error
fn check_answer(ins: INS, answer: APDUAnswer) -> Result<Vec<u8>, LedgerError> {
    let status = answer.retcode();
    match answer.status() {
        StatusWord::Ok => Ok(answer.into_data()),
        StatusWord::UserRejected => Err(LedgerError::UserRejected { ins }),
        StatusWord::DeviceLocked => Err(LedgerError::DeviceLocked { ins, status }),
        StatusWord::AppNotOpen => Err(LedgerError::AppNotOpen { ins, status }),
        StatusWord::InvalidData => Err(LedgerError::InvalidData { ins, status }),
        other => Err(LedgerError::Device { ins, status, description: other.to_string() }),
    }
}

/// Builds a `v ∈ {27, 28}` signature from a `v ‖ r ‖ s` answer
fn electrum_signature(ins: INS, answer: &[u8]) -> Result<Signature, LedgerError> {
    let scheme = SignatureScheme::Electrum;
    let recovery_id = scheme.recovery_id(answer[0]).map_err(|_| LedgerError::MalformedResponse {
        ins,
        reason: format!("invalid v {:#04x}", answer[0]),
    })?;
    Ok(Signature {
        r: U256::from_big_endian(&answer[1..33]),
        s: U256::from_big_endian(&answer[33..65]),
        v: scheme.v(recovery_id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_eth_transport::{RecordStore, TransportReplayer};
    use std::str::FromStr;

    const GET_ADDRESS: &str = "=> e002000015058000002c8000003c800000000000000000000000
        <= 0028 37653566343535323039316136393132356435646663623762386332363539303239333935626466 9000";

    /// A session answering `GET_APP_CONFIGURATION` with `config` and the first Ledger Live
    /// address
    fn replayer(config: &str) -> TransportReplayer {
        let records = format!("=> e006000000\n<= {config} 9000\n{GET_ADDRESS}");
        TransportReplayer::new(RecordStore::from_str(&records).unwrap())
    }

    #[test]
    fn fetches_address_on_creation() {
        let ledger =
            LedgerEthereum::new(replayer("01010a02"), DerivationType::LedgerLive(0), 1).unwrap();
        assert_eq!(
            ledger.address,
            Address::from_str("7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap()
        );
        assert_eq!(ledger.version().unwrap(), "1.10.2");
    }

    #[test]
    fn refuses_outdated_app_on_creation() {
        let err = LedgerEthereum::new(replayer("01010203"), DerivationType::LedgerLive(0), 1)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnsupportedAppVersion(req) if req == ">=1.2.4"));

        assert!(LedgerEthereum::new(replayer("01010204"), DerivationType::LedgerLive(0), 1).is_ok());
    }

    #[test]
    fn typed_data_requires_recent_app() {
        let ledger =
            LedgerEthereum::new(replayer("01010509"), DerivationType::LedgerLive(0), 1).unwrap();
        assert!(matches!(
            ledger.sign_typed_data([0; 32], [0; 32]),
            Err(LedgerError::UnsupportedAppVersion(req)) if req == ">=1.6.0"
        ));
    }

    #[test]
    fn signing_path_must_match_discovery_root() {
        assert!(check_root(&DerivationType::LedgerLive(0), DerivationRoot::LedgerLive).is_ok());
        assert!(check_root(&DerivationType::Legacy(3), DerivationRoot::Legacy).is_ok());
        assert!(matches!(
            check_root(&DerivationType::LedgerLive(0), DerivationRoot::Legacy),
            Err(LedgerError::UnsupportedDerivation(_))
        ));
        assert!(matches!(
            check_root(&DerivationType::Legacy(0), DerivationRoot::LedgerLive),
            Err(LedgerError::UnsupportedDerivation(_))
        ));
        let custom = DerivationType::Other("m/44'/60'/0'/0/9".to_string());
        assert!(check_root(&custom, DerivationRoot::Legacy).is_ok());
    }

    #[test]
    fn message_length_is_a_u32() {
        assert_eq!(message_length(19).unwrap(), 19);
        assert_eq!(message_length(u32::MAX as usize).unwrap(), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert!(matches!(
            message_length(u32::MAX as usize + 1),
            Err(EncodingError::MessageTooLong(len)) if len == u32::MAX as usize + 1
        ));
    }

    #[test]
    fn maps_status_words() {
        let answer = |sw: &[u8]| APDUAnswer::from_answer(sw.to_vec()).unwrap();
        assert!(matches!(
            check_answer(INS::SIGN, answer(&[0x69, 0x85])),
            Err(LedgerError::UserRejected { ins: INS::SIGN })
        ));
        assert!(matches!(
            check_answer(INS::SIGN, answer(&[0x55, 0x15])),
            Err(LedgerError::DeviceLocked { status: 0x5515, .. })
        ));
        assert!(matches!(
            check_answer(INS::GET_PUBLIC_KEY, answer(&[0x6e, 0x00])),
            Err(LedgerError::AppNotOpen { status: 0x6e00, .. })
        ));
        assert!(matches!(
            check_answer(INS::SIGN, answer(&[0x6a, 0x80])),
            Err(LedgerError::InvalidData { .. })
        ));
        assert!(matches!(
            check_answer(INS::SIGN, answer(&[0x6f, 0x00])),
            Err(LedgerError::Device { status: 0x6f00, .. })
        ));
        assert_eq!(check_answer(INS::SIGN, answer(&[0x01, 0x90, 0x00])).unwrap(), vec![0x01]);
    }
}
