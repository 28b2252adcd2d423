//! Ordered key storage shared by every keyring variant.

use std::collections::HashSet;

use tracing::debug;

use crate::blockchain::bitcoin::sighash::{SighashCache, SighashType, SigningFlags};
use crate::blockchain::bitcoin::transaction::{p2pkh_unlocking_script, Transaction};
use crate::blockchain::bitcoin::{verify_message, KeyPair};
use crate::core::config::Network;
use crate::core::errors::KeyringError;

/// Keys in insertion order, unique by address.
#[derive(Debug, Clone)]
pub struct KeyStore {
    network: Network,
    sighash_type: SighashType,
    keys: Vec<KeyPair>,
    addresses: HashSet<String>,
}

impl KeyStore {
    pub fn new(network: Network, sighash_type: SighashType) -> Self {
        Self {
            network,
            sighash_type,
            keys: Vec::new(),
            addresses: HashSet::new(),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn sighash_type(&self) -> SighashType {
        self.sighash_type
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    pub fn keys(&self) -> &[KeyPair] {
        &self.keys
    }

    pub fn addresses(&self) -> Vec<String> {
        self.keys.iter().map(|k| k.address().to_string()).collect()
    }

    /// Append `key`, rejecting a duplicate address.
    pub fn push(&mut self, key: KeyPair) -> Result<(), KeyringError> {
        if !self.addresses.insert(key.address().to_string()) {
            return Err(KeyringError::InvalidInput(format!(
                "Address {} already exists in this keyring",
                key.address()
            )));
        }
        self.keys.push(key);
        Ok(())
    }

    /// Key for `address`.
    pub fn find(&self, address: &str) -> Result<&KeyPair, KeyringError> {
        if address.trim().is_empty() {
            return Err(KeyringError::InvalidInput("Must specify address.".to_string()));
        }
        if !self.addresses.contains(address) {
            return Err(not_found(address));
        }
        self.keys
            .iter()
            .find(|k| k.address() == address)
            .ok_or_else(|| not_found(address))
    }

    /// Drop the key for `address` and return it.
    pub fn remove(&mut self, address: &str) -> Result<KeyPair, KeyringError> {
        if address.trim().is_empty() {
            return Err(KeyringError::InvalidInput("Must specify address.".to_string()));
        }
        if !self.addresses.remove(address) {
            return Err(not_found(address));
        }
        let position = self
            .keys
            .iter()
            .position(|k| k.address() == address)
            .ok_or_else(|| not_found(address))?;
        Ok(self.keys.remove(position))
    }

    /// Sign every input of `tx` with the key for `address`.
    ///
    /// Each input must carry the output it spends; that output's script is
    /// the subscript. Unlocking scripts are written only once every input has
    /// been signed.
    pub fn sign_transaction(&self, address: &str, tx: &mut Transaction) -> Result<(), KeyringError> {
        let key = self.find(address)?;
        let flags = SigningFlags::default();

        let scripts = {
            let cache = SighashCache::new(tx);
            let mut scripts = Vec::with_capacity(tx.inputs.len());
            for (index, input) in tx.inputs.iter().enumerate() {
                let prevout = input.prevout.as_ref().ok_or_else(|| {
                    KeyringError::InvalidInput(format!(
                        "input {} is missing the output it spends",
                        index
                    ))
                })?;
                let signature = cache.sign(
                    key.secret_key(),
                    self.sighash_type,
                    index,
                    &prevout.script_pubkey,
                    prevout.value,
                    flags,
                )?;
                scripts.push(p2pkh_unlocking_script(&signature, key.public_key())?);
            }
            scripts
        };

        for (input, script) in tx.inputs.iter_mut().zip(scripts) {
            input.set_script(script);
        }
        debug!("signed {} inputs for {}", tx.inputs.len(), address);
        Ok(())
    }

    pub fn sign_message(&self, address: &str, message: &str) -> Result<String, KeyringError> {
        Ok(self.find(address)?.sign_message(message))
    }

    /// Check `signature` against `address`; the key need not be held.
    pub fn verify_message(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<bool, KeyringError> {
        verify_message(address, message, signature, self.network)
    }
}

fn not_found(address: &str) -> KeyringError {
    KeyringError::NotFound(format!("Address {} not found in this keyring", address))
}
