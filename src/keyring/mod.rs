//! Keyrings: account containers that hold private keys and sign with them.
//!
//! Two variants share the [`Keyring`] contract:
//!
//! - [`SimpleKeyring`] keeps an explicit list of imported or random keys.
//! - [`HdKeyring`] derives keys from one mnemonic along a BIP32 path.
//!
//! State crosses the vault boundary only as the JSON produced by
//! [`Keyring::serialize`]; encryption at rest belongs to the caller.

pub mod hd;
pub mod registry;
pub mod simple;
pub mod store;

use std::fmt;

use serde_json::Value;

use crate::blockchain::bitcoin::Transaction;
use crate::core::config::Network;
use crate::core::errors::KeyringError;

pub use self::hd::{HdKeyring, HdKeyringState, PagedAddress};
pub use self::registry::{KeyringFactory, KeyringRegistry};
pub use self::simple::SimpleKeyring;
pub use self::store::KeyStore;

/// Lifecycle and signing contract shared by every keyring.
pub trait Keyring: Send + Sync + fmt::Debug {
    /// Persisted type tag, e.g. `"Simple Key Pair"`.
    fn keyring_type(&self) -> &'static str;

    fn store(&self) -> &KeyStore;

    /// Minimal state that rebuilds identical accounts.
    fn serialize(&self) -> Result<Value, KeyringError>;

    /// Replace all state with the state rebuilt from `state`.
    ///
    /// On error the keyring is unchanged.
    fn deserialize(&mut self, state: &Value) -> Result<(), KeyringError>;

    /// Add `n` unused accounts and return their addresses.
    fn add_accounts(&mut self, n: usize) -> Result<Vec<String>, KeyringError>;

    fn remove_account(&mut self, address: &str) -> Result<(), KeyringError>;

    /// Fails when the keyring has no key material to sign or export with.
    fn ensure_ready(&self) -> Result<(), KeyringError> {
        Ok(())
    }

    fn network(&self) -> Network {
        self.store().network()
    }

    fn get_accounts(&self) -> Vec<String> {
        self.store().addresses()
    }

    /// WIF of the key for `address`.
    fn export_account(&self, address: &str) -> Result<String, KeyringError> {
        self.ensure_ready()?;
        Ok(self.store().find(address)?.to_wif())
    }

    /// Sign every input of `tx` with the key for `address`.
    fn sign_transaction(&self, address: &str, tx: &mut Transaction) -> Result<(), KeyringError> {
        self.ensure_ready()?;
        self.store().sign_transaction(address, tx)
    }

    /// Base64 signed-message signature.
    fn sign_message(&self, address: &str, message: &str) -> Result<String, KeyringError> {
        self.ensure_ready()?;
        self.store().sign_message(address, message)
    }

    fn verify_message(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<bool, KeyringError> {
        self.store().verify_message(address, message, signature)
    }
}
