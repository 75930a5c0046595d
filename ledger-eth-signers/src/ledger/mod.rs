pub mod accounts;
pub mod app;
pub mod config;
pub mod types;

use crate::Signer;
use app::LedgerEthereum;
use ledger_eth_core::types::{Address, Signature, TypedTransaction};
use ledger_eth_transport::Transport;
use types::LedgerError;

impl<T: Transport + Send> Signer for LedgerEthereum<T> {
    type Error = LedgerError;

    /// Signs the hash of the provided message after prefixing it
    fn sign_message<S: AsRef<[u8]>>(&self, message: S) -> Result<Signature, Self::Error> {
        self.sign_message(message)
    }

    /// Signs the transaction, using the signer's chain id when the transaction has none
    fn sign_transaction(&self, message: &TypedTransaction) -> Result<Signature, Self::Error> {
        if message.chain_id().is_some() {
            return Ok(self.sign_tx(message)?.signature)
        }
        let mut tx = message.clone();
        tx.set_chain_id(self.chain_id);
        Ok(self.sign_tx(&tx)?.signature)
    }

    fn sign_typed_data(
        &self,
        domain_separator: [u8; 32],
        message_hash: [u8; 32],
    ) -> Result<Signature, Self::Error> {
        self.sign_typed_data(domain_separator, message_hash)
    }

    /// Returns the signer's Ethereum Address
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn with_chain_id<C: Into<u64>>(mut self, chain_id: C) -> Self {
        self.chain_id = chain_id.into();
        self
    }
}
