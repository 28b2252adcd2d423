//! Type-tag to constructor table used when restoring keyrings from the vault.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::{HdKeyring, Keyring, SimpleKeyring};
use crate::core::config::KeyringConfig;
use crate::core::errors::KeyringError;
use crate::crypto::{EntropySource, OsEntropy};

/// Builds an empty keyring of one type.
pub type KeyringFactory =
    fn(&KeyringConfig, Arc<dyn EntropySource>) -> Result<Box<dyn Keyring>, KeyringError>;

fn simple_factory(
    config: &KeyringConfig,
    entropy: Arc<dyn EntropySource>,
) -> Result<Box<dyn Keyring>, KeyringError> {
    Ok(Box::new(SimpleKeyring::new(config.clone(), entropy)?))
}

fn hd_factory(
    config: &KeyringConfig,
    entropy: Arc<dyn EntropySource>,
) -> Result<Box<dyn Keyring>, KeyringError> {
    Ok(Box::new(HdKeyring::new(config.clone(), entropy)?))
}

#[derive(Debug, Clone)]
pub struct KeyringRegistry {
    config: KeyringConfig,
    entropy: Arc<dyn EntropySource>,
    factories: BTreeMap<String, KeyringFactory>,
}

impl KeyringRegistry {
    /// Empty registry; `config` is validated once here.
    pub fn new(config: KeyringConfig, entropy: Arc<dyn EntropySource>) -> Result<Self, KeyringError> {
        config.validate()?;
        Ok(Self {
            config,
            entropy,
            factories: BTreeMap::new(),
        })
    }

    /// Registry knowing both built-in keyring types, backed by the OS RNG.
    pub fn with_defaults(config: KeyringConfig) -> Result<Self, KeyringError> {
        Self::with_entropy(config, Arc::new(OsEntropy))
    }

    pub fn with_entropy(
        config: KeyringConfig,
        entropy: Arc<dyn EntropySource>,
    ) -> Result<Self, KeyringError> {
        let mut registry = Self::new(config, entropy)?;
        registry.register(SimpleKeyring::TYPE, simple_factory);
        registry.register(HdKeyring::TYPE, hd_factory);
        Ok(registry)
    }

    pub fn config(&self) -> &KeyringConfig {
        &self.config
    }

    /// Add or replace the factory for `keyring_type`.
    pub fn register(&mut self, keyring_type: &str, factory: KeyringFactory) {
        self.factories.insert(keyring_type.to_string(), factory);
    }

    pub fn types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Fresh empty keyring of `keyring_type`.
    pub fn create(&self, keyring_type: &str) -> Result<Box<dyn Keyring>, KeyringError> {
        let factory = self.factories.get(keyring_type).ok_or_else(|| {
            KeyringError::NotFound(format!("No keyring found for the requested type: {}", keyring_type))
        })?;
        factory(&self.config, Arc::clone(&self.entropy))
    }

    /// Keyring of `keyring_type` rebuilt from persisted `state`.
    pub fn restore(&self, keyring_type: &str, state: &Value) -> Result<Box<dyn Keyring>, KeyringError> {
        let mut keyring = self.create(keyring_type)?;
        keyring.deserialize(state)?;
        info!(
            "restored {} keyring with {} accounts",
            keyring_type,
            keyring.get_accounts().len()
        );
        Ok(keyring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_types() {
        let registry = KeyringRegistry::with_defaults(KeyringConfig::default()).unwrap();
        assert_eq!(registry.types(), vec!["HD Key Tree", "Simple Key Pair"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = KeyringConfig {
            max_scan_indexes: 0,
            ..KeyringConfig::default()
        };
        let err = KeyringRegistry::with_defaults(config).unwrap_err();
        assert!(matches!(err, KeyringError::Config(_)));
    }

    #[test]
    fn test_unknown_type() {
        let registry = KeyringRegistry::with_defaults(KeyringConfig::default()).unwrap();
        let err = registry.create("Ledger Hardware").unwrap_err();
        assert!(matches!(err, KeyringError::NotFound(_)));
    }

    #[test]
    fn test_create_reports_type() {
        let registry = KeyringRegistry::with_defaults(KeyringConfig::default()).unwrap();
        let kr = registry.create(SimpleKeyring::TYPE).unwrap();
        assert_eq!(kr.keyring_type(), SimpleKeyring::TYPE);
        assert!(kr.get_accounts().is_empty());
    }

    #[test]
    fn test_restore_empty_hd_state() {
        let registry = KeyringRegistry::with_defaults(KeyringConfig::default()).unwrap();
        let kr = registry
            .restore(HdKeyring::TYPE, &json!({"mnemonic": null, "hdPath": "m/44'/0'/0'/0", "activeIndexes": []}))
            .unwrap();
        assert!(kr.get_accounts().is_empty());
        assert!(kr.ensure_ready().is_err());
    }
}
