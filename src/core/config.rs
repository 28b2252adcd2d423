use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::blockchain::bitcoin::sighash::SighashType;
use crate::core::errors::KeyringError;

/// Default BIP44 base path; account `i` lives at `<base>/i`.
pub const DEFAULT_HD_PATH: &str = "m/44'/0'/0'/0";

/// Target network of a keyring's addresses and WIF exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn to_bitcoin(self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl FromStr for Network {
    type Err = KeyringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(KeyringError::Config(format!("unknown network: {}", other))),
        }
    }
}

/// Keyring configuration.
///
/// Every field has a default so a partial TOML document is enough:
///
/// ```toml
/// network = "testnet"
/// per_page = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyringConfig {
    /// Network used for address encoding and WIF export.
    #[serde(default = "KeyringConfig::default_network")]
    pub network: Network,

    /// Base derivation path for HD keyrings created without persisted state.
    #[serde(default = "KeyringConfig::default_hd_path")]
    pub hd_path: String,

    /// Page size for HD address discovery.
    #[serde(default = "KeyringConfig::default_per_page")]
    pub per_page: u32,

    /// Upper bound on indices inspected by one `add_accounts` scan.
    #[serde(default = "KeyringConfig::default_max_scan_indexes")]
    pub max_scan_indexes: u32,

    /// Sighash type used when a keyring signs a spend.
    #[serde(default = "KeyringConfig::default_sighash_type")]
    pub sighash_type: u32,

    /// Entropy length for freshly generated mnemonics (16 bytes = 12 words).
    #[serde(default = "KeyringConfig::default_mnemonic_entropy_bytes")]
    pub mnemonic_entropy_bytes: usize,
}

impl KeyringConfig {
    fn default_network() -> Network { Network::Mainnet }
    fn default_hd_path() -> String { DEFAULT_HD_PATH.to_string() }
    fn default_per_page() -> u32 { 5 }
    fn default_max_scan_indexes() -> u32 { 10_000 }
    fn default_sighash_type() -> u32 { SighashType::ALL.to_u32() }
    fn default_mnemonic_entropy_bytes() -> usize { 16 }

    /// Default configuration bound to `network`.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, KeyringError> {
        let config: KeyringConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), KeyringError> {
        if self.per_page == 0 {
            return Err(KeyringError::Config("per_page must be at least 1".to_string()));
        }
        if self.max_scan_indexes == 0 {
            return Err(KeyringError::Config(
                "max_scan_indexes must be at least 1".to_string(),
            ));
        }
        if !matches!(self.mnemonic_entropy_bytes, 16 | 20 | 24 | 28 | 32) {
            return Err(KeyringError::Config(format!(
                "mnemonic_entropy_bytes must be one of 16, 20, 24, 28, 32, got {}",
                self.mnemonic_entropy_bytes
            )));
        }
        SighashType::from_u32(self.sighash_type)
            .validate()
            .map_err(|e| KeyringError::Config(e.to_string()))?;
        bitcoin::bip32::DerivationPath::from_str(&self.hd_path)
            .map_err(|e| KeyringError::Config(format!("invalid hd_path {}: {}", self.hd_path, e)))?;
        Ok(())
    }

    pub fn sighash_type(&self) -> SighashType {
        SighashType::from_u32(self.sighash_type)
    }
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            network: Self::default_network(),
            hd_path: Self::default_hd_path(),
            per_page: Self::default_per_page(),
            max_scan_indexes: Self::default_max_scan_indexes(),
            sighash_type: Self::default_sighash_type(),
            mnemonic_entropy_bytes: Self::default_mnemonic_entropy_bytes(),
        }
    }
}
