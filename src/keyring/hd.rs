//! Hierarchical-deterministic keyring.
//!
//! Keys are derived from a BIP39 mnemonic (empty passphrase) along a BIP32
//! base path, `m/44'/0'/0'/0` unless configured otherwise. Account `i` is the
//! non-hardened child `<base>/i`.
//!
//! Derived keys are cached per index. A cache entry is inserted once and never
//! replaced, so an index always resolves to the same key for the lifetime of
//! the root.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::store::KeyStore;
use super::Keyring;
use crate::blockchain::bitcoin::KeyPair;
use crate::core::config::{KeyringConfig, DEFAULT_HD_PATH};
use crate::core::errors::KeyringError;
use crate::crypto::{random_bytes, EntropySource, SECP};

/// Persisted HD keyring state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdKeyringState {
    #[serde(default)]
    pub mnemonic: Option<String>,
    #[serde(rename = "hdPath", default = "HdKeyringState::default_hd_path")]
    pub hd_path: String,
    #[serde(rename = "activeIndexes", default)]
    pub active_indexes: Vec<u32>,
}

impl HdKeyringState {
    fn default_hd_path() -> String {
        DEFAULT_HD_PATH.to_string()
    }
}

impl Default for HdKeyringState {
    fn default() -> Self {
        Self {
            mnemonic: None,
            hd_path: Self::default_hd_path(),
            active_indexes: Vec::new(),
        }
    }
}

/// Discovery entry; `index` is the derivation index plus one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedAddress {
    pub address: String,
    pub index: u32,
}

struct HdRoot {
    mnemonic: Secret<String>,
    xpriv: Xpriv,
}

pub struct HdKeyring {
    config: KeyringConfig,
    entropy: Arc<dyn EntropySource>,
    hd_path: String,
    base_path: DerivationPath,
    root: Option<HdRoot>,
    store: KeyStore,
    active_indexes: Vec<u32>,
    cache: RwLock<BTreeMap<u32, KeyPair>>,
    page: u32,
}

impl HdKeyring {
    pub const TYPE: &'static str = "HD Key Tree";

    /// Empty keyring on the configured base path; no mnemonic yet.
    pub fn new(config: KeyringConfig, entropy: Arc<dyn EntropySource>) -> Result<Self, KeyringError> {
        let hd_path = config.hd_path.clone();
        Self::with_path(config, entropy, &hd_path)
    }

    fn with_path(
        config: KeyringConfig,
        entropy: Arc<dyn EntropySource>,
        hd_path: &str,
    ) -> Result<Self, KeyringError> {
        config.validate()?;
        let hd_path = if hd_path.trim().is_empty() {
            DEFAULT_HD_PATH
        } else {
            hd_path.trim()
        };
        let base_path = DerivationPath::from_str(hd_path)
            .map_err(|e| KeyringError::InvalidInput(format!("invalid hd path {}: {}", hd_path, e)))?;
        let store = KeyStore::new(config.network, config.sighash_type());
        Ok(Self {
            config,
            entropy,
            hd_path: hd_path.to_string(),
            base_path,
            root: None,
            store,
            active_indexes: Vec::new(),
            cache: RwLock::new(BTreeMap::new()),
            page: 0,
        })
    }

    /// Keyring restored from `mnemonic` with account 0 active.
    pub fn from_mnemonic(
        config: KeyringConfig,
        entropy: Arc<dyn EntropySource>,
        mnemonic: &str,
    ) -> Result<Self, KeyringError> {
        let mut keyring = Self::new(config, entropy)?;
        keyring.init_from_mnemonic(mnemonic)?;
        keyring.active_accounts(&[0])?;
        Ok(keyring)
    }

    /// Keyring rebuilt from persisted state.
    pub fn from_state(
        config: KeyringConfig,
        entropy: Arc<dyn EntropySource>,
        state: &HdKeyringState,
    ) -> Result<Self, KeyringError> {
        let mut keyring = Self::with_path(config, entropy, &state.hd_path)?;
        if let Some(mnemonic) = state.mnemonic.as_deref().filter(|m| !m.trim().is_empty()) {
            keyring.init_from_mnemonic(mnemonic)?;
        }
        if !state.active_indexes.is_empty() {
            keyring.active_accounts(&state.active_indexes)?;
        }
        Ok(keyring)
    }

    /// Install a new root; the derivation cache is reset.
    fn init_from_mnemonic(&mut self, phrase: &str) -> Result<(), KeyringError> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));
        let master = Xpriv::new_master(self.config.network.to_bitcoin(), &seed[..])?;
        let xpriv = master.derive_priv(&SECP, &self.base_path)?;

        self.root = Some(HdRoot {
            mnemonic: Secret::new(phrase.to_string()),
            xpriv,
        });
        self.cache.write().clear();
        debug!("HD root initialized at {}", self.hd_path);
        Ok(())
    }

    fn generate_mnemonic(&self) -> Result<String, KeyringError> {
        let entropy = random_bytes(self.entropy.as_ref(), self.config.mnemonic_entropy_bytes)?;
        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)?;
        Ok(mnemonic.to_string())
    }

    fn root(&self) -> Result<&Xpriv, KeyringError> {
        self.root.as_ref().map(|r| &r.xpriv).ok_or_else(|| {
            KeyringError::PreconditionFailed(
                "HD keyring has no mnemonic; add an account or restore state first".to_string(),
            )
        })
    }

    /// Key at `index`, derived on first use.
    fn account_at(&self, index: u32) -> Result<KeyPair, KeyringError> {
        if let Some(key) = self.cache.read().get(&index) {
            return Ok(key.clone());
        }

        let root = self.root()?;
        let child = ChildNumber::from_normal_idx(index)?;
        let xpriv = root.derive_priv(&SECP, &[child])?;
        let key = KeyPair::from_private_key(xpriv.to_priv(), self.config.network);

        let mut cache = self.cache.write();
        Ok(cache.entry(index).or_insert(key).clone())
    }

    /// Address of account `index`.
    pub fn address_from_index(&self, index: u32) -> Result<String, KeyringError> {
        Ok(self.account_at(index)?.address().to_string())
    }

    /// Activate exactly `indexes`, skipping ones already active.
    ///
    /// Returns the address of every requested index, in order.
    pub fn active_accounts(&mut self, indexes: &[u32]) -> Result<Vec<String>, KeyringError> {
        let mut addresses = Vec::with_capacity(indexes.len());
        let mut activated: Vec<(u32, KeyPair)> = Vec::new();
        for &index in indexes {
            let key = self.account_at(index)?;
            addresses.push(key.address().to_string());
            let already = self.active_indexes.contains(&index)
                || activated.iter().any(|(i, _)| *i == index);
            if !already {
                activated.push((index, key));
            }
        }

        let count = activated.len();
        self.commit(activated)?;
        debug!("activated {} HD accounts", count);
        Ok(addresses)
    }

    fn commit(&mut self, accounts: Vec<(u32, KeyPair)>) -> Result<(), KeyringError> {
        let mut staged = self.store.clone();
        for (_, key) in &accounts {
            staged.push(key.clone())?;
        }
        self.store = staged;
        self.active_indexes.extend(accounts.iter().map(|(i, _)| *i));
        Ok(())
    }

    /// First `n` indices, from 0 up, whose address is not held yet.
    fn scan_unused(&self, n: usize) -> Result<Vec<(u32, KeyPair)>, KeyringError> {
        let mut found = Vec::with_capacity(n);
        let mut index = 0u32;
        while found.len() < n {
            if index >= self.config.max_scan_indexes {
                return Err(KeyringError::KeyDerivation(format!(
                    "no {} unused indexes below {}",
                    n, self.config.max_scan_indexes
                )));
            }
            let key = self.account_at(index)?;
            if !self.store.contains(key.address()) {
                found.push((index, key));
            }
            index += 1;
        }
        Ok(found)
    }

    pub fn get_first_page(&mut self) -> Result<Vec<PagedAddress>, KeyringError> {
        self.page = 0;
        self.get_page(1)
    }

    pub fn get_next_page(&mut self) -> Result<Vec<PagedAddress>, KeyringError> {
        self.get_page(1)
    }

    pub fn get_previous_page(&mut self) -> Result<Vec<PagedAddress>, KeyringError> {
        self.get_page(-1)
    }

    fn get_page(&mut self, increment: i64) -> Result<Vec<PagedAddress>, KeyringError> {
        let page = (i64::from(self.page) + increment).clamp(1, i64::from(u32::MAX)) as u32;
        let from = (page - 1).saturating_mul(self.config.per_page);
        let to = from.saturating_add(self.config.per_page);
        let accounts = self.get_addresses(from, to)?;
        self.page = page;
        Ok(accounts)
    }

    /// Addresses for indices `start..end`, derived but not activated.
    pub fn get_addresses(&self, start: u32, end: u32) -> Result<Vec<PagedAddress>, KeyringError> {
        (start..end)
            .map(|i| {
                Ok(PagedAddress {
                    address: self.address_from_index(i)?,
                    index: i + 1,
                })
            })
            .collect()
    }

    /// Lowest derived index whose address is `address`.
    pub fn get_index_by_address(&self, address: &str) -> Option<u32> {
        self.cache
            .read()
            .iter()
            .find(|(_, key)| key.address() == address)
            .map(|(index, _)| *index)
    }

    /// Full derivation path of an active account, e.g. `m/44'/0'/0'/0/3`.
    pub fn derivation_path_for(&self, address: &str) -> Result<String, KeyringError> {
        self.store.find(address)?;
        let index = self.get_index_by_address(address).ok_or_else(|| {
            KeyringError::NotFound(format!("Address {} not found in this keyring", address))
        })?;
        Ok(format!("{}/{}", self.hd_path, index))
    }

    /// Backup phrase, once a root exists.
    pub fn mnemonic(&self) -> Option<&str> {
        self.root.as_ref().map(|r| r.mnemonic.expose_secret().as_str())
    }

    pub fn hd_path(&self) -> &str {
        &self.hd_path
    }

    pub fn active_indexes(&self) -> &[u32] {
        &self.active_indexes
    }

    /// Current discovery page; 0 until paging starts.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn state(&self) -> HdKeyringState {
        HdKeyringState {
            mnemonic: self.mnemonic().map(str::to_string),
            hd_path: self.hd_path.clone(),
            active_indexes: self.active_indexes.clone(),
        }
    }
}

impl Keyring for HdKeyring {
    fn keyring_type(&self) -> &'static str {
        Self::TYPE
    }

    fn store(&self) -> &KeyStore {
        &self.store
    }

    fn ensure_ready(&self) -> Result<(), KeyringError> {
        self.root().map(|_| ())
    }

    fn serialize(&self) -> Result<Value, KeyringError> {
        Ok(serde_json::to_value(self.state())?)
    }

    fn deserialize(&mut self, state: &Value) -> Result<(), KeyringError> {
        let state = match state {
            Value::Null => HdKeyringState::default(),
            other => HdKeyringState::deserialize(other)?,
        };
        let mut restored = Self::from_state(self.config.clone(), Arc::clone(&self.entropy), &state)?;
        restored.page = self.page;
        *self = restored;
        info!(
            "restored HD keyring with {} accounts on {}",
            self.active_indexes.len(),
            self.hd_path
        );
        Ok(())
    }

    fn add_accounts(&mut self, n: usize) -> Result<Vec<String>, KeyringError> {
        let generated = self.root.is_none();
        if generated {
            let phrase = Zeroizing::new(self.generate_mnemonic()?);
            self.init_from_mnemonic(&phrase)?;
            info!("generated new HD mnemonic");
        }

        let added = self.scan_unused(n).and_then(|found| {
            let addresses: Vec<String> = found.iter().map(|(_, k)| k.address().to_string()).collect();
            self.commit(found)?;
            Ok(addresses)
        });

        match added {
            Ok(addresses) => {
                info!("added {} HD accounts", addresses.len());
                Ok(addresses)
            }
            Err(e) => {
                if generated {
                    self.root = None;
                    self.cache.write().clear();
                }
                Err(e)
            }
        }
    }

    fn remove_account(&mut self, address: &str) -> Result<(), KeyringError> {
        self.store.remove(address)?;
        let cache = self.cache.read();
        self.active_indexes
            .retain(|i| cache.get(i).map(KeyPair::address) != Some(address));
        drop(cache);
        info!("removed HD account {}", address);
        Ok(())
    }
}

impl fmt::Debug for HdKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdKeyring")
            .field("network", &self.config.network)
            .field("hd_path", &self.hd_path)
            .field("has_root", &self.root.is_some())
            .field("active_indexes", &self.active_indexes)
            .field("page", &self.page)
            .finish()
    }
}
