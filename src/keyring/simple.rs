//! Keyring over an explicit list of keys.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use super::store::KeyStore;
use super::Keyring;
use crate::blockchain::bitcoin::KeyPair;
use crate::core::config::KeyringConfig;
use crate::core::errors::KeyringError;
use crate::crypto::EntropySource;

/// Imported or randomly generated keys, no derivation.
///
/// Serialized state is the JSON array of WIF strings in insertion order.
#[derive(Debug)]
pub struct SimpleKeyring {
    config: KeyringConfig,
    entropy: Arc<dyn EntropySource>,
    store: KeyStore,
}

impl SimpleKeyring {
    pub const TYPE: &'static str = "Simple Key Pair";

    /// Empty keyring; fails with `Config` when `config` does not validate.
    pub fn new(config: KeyringConfig, entropy: Arc<dyn EntropySource>) -> Result<Self, KeyringError> {
        config.validate()?;
        let store = KeyStore::new(config.network, config.sighash_type());
        Ok(Self {
            config,
            entropy,
            store,
        })
    }

    /// Keyring holding the keys in `wifs`; a repeated key is kept once.
    pub fn from_wifs<S: AsRef<str>>(
        config: KeyringConfig,
        entropy: Arc<dyn EntropySource>,
        wifs: &[S],
    ) -> Result<Self, KeyringError> {
        let mut keyring = Self::new(config, entropy)?;
        keyring.store = keyring.store_from_wifs(wifs.iter().map(AsRef::as_ref))?;
        Ok(keyring)
    }

    pub fn config(&self) -> &KeyringConfig {
        &self.config
    }

    fn empty_store(&self) -> KeyStore {
        KeyStore::new(self.config.network, self.config.sighash_type())
    }

    fn store_from_wifs<'a, I>(&self, wifs: I) -> Result<KeyStore, KeyringError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut store = self.empty_store();
        for wif in wifs {
            let key = KeyPair::from_wif(wif, self.config.network)?;
            if store.contains(key.address()) {
                debug!("skipping repeated key for {}", key.address());
                continue;
            }
            store.push(key)?;
        }
        Ok(store)
    }
}

impl Keyring for SimpleKeyring {
    fn keyring_type(&self) -> &'static str {
        Self::TYPE
    }

    fn store(&self) -> &KeyStore {
        &self.store
    }

    fn serialize(&self) -> Result<Value, KeyringError> {
        let wifs: Vec<String> = self.store.keys().iter().map(KeyPair::to_wif).collect();
        Ok(serde_json::to_value(wifs)?)
    }

    fn deserialize(&mut self, state: &Value) -> Result<(), KeyringError> {
        let wifs: Vec<String> = match state {
            Value::Null => Vec::new(),
            other => Vec::<String>::deserialize(other)?,
        };
        self.store = self.store_from_wifs(wifs.iter().map(String::as_str))?;
        info!("restored simple keyring with {} accounts", self.store.len());
        Ok(())
    }

    fn add_accounts(&mut self, n: usize) -> Result<Vec<String>, KeyringError> {
        let mut staged = self.store.clone();
        let mut added = Vec::with_capacity(n);
        while added.len() < n {
            let key = KeyPair::generate(self.config.network, self.entropy.as_ref())?;
            if staged.contains(key.address()) {
                return Err(KeyringError::EntropyFailure(
                    "entropy source repeated an existing key".to_string(),
                ));
            }
            added.push(key.address().to_string());
            staged.push(key)?;
        }
        self.store = staged;
        info!("added {} simple accounts", added.len());
        Ok(added)
    }

    fn remove_account(&mut self, address: &str) -> Result<(), KeyringError> {
        self.store.remove(address)?;
        info!("removed account {}", address);
        Ok(())
    }
}
