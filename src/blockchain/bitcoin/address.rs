//! P2PKH address encoding and validation.

use bitcoin::address::Address;
use bitcoin::{PublicKey, ScriptBuf};
use std::str::FromStr;

use crate::core::config::Network;
use crate::core::errors::KeyringError;

/// P2PKH address helpers.
pub struct P2pkhAddress;

impl P2pkhAddress {
    /// Address string for `public_key` on `network`.
    pub fn from_public_key(public_key: &PublicKey, network: Network) -> String {
        Address::p2pkh(public_key, network.to_bitcoin()).to_string()
    }

    /// Locking script paying to `public_key`.
    pub fn script_pubkey(public_key: &PublicKey) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&public_key.pubkey_hash())
    }

    /// Parse `address` and require it to belong to `network`.
    pub fn parse(address: &str, network: Network) -> Result<Address, KeyringError> {
        if address.trim().is_empty() {
            return Err(KeyringError::InvalidInput("Must specify address.".to_string()));
        }
        Address::from_str(address)
            .map_err(|e| KeyringError::InvalidInput(format!("invalid address {}: {}", address, e)))?
            .require_network(network.to_bitcoin())
            .map_err(|e| {
                KeyringError::InvalidInput(format!(
                    "address {} is not a {} address: {}",
                    address,
                    network.as_str(),
                    e
                ))
            })
    }

    pub fn validate(address: &str, network: Network) -> bool {
        Self::parse(address, network).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Public key of secret 0x...01 (compressed).
    const GENERATOR_PUBKEY: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn test_known_mainnet_address() {
        let pk = PublicKey::from_str(GENERATOR_PUBKEY).unwrap();
        assert_eq!(
            P2pkhAddress::from_public_key(&pk, Network::Mainnet),
            "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"
        );
    }

    #[test]
    fn test_testnet_prefix() {
        let pk = PublicKey::from_str(GENERATOR_PUBKEY).unwrap();
        let addr = P2pkhAddress::from_public_key(&pk, Network::Testnet);
        assert!(addr.starts_with('m') || addr.starts_with('n'));
        assert!(P2pkhAddress::validate(&addr, Network::Testnet));
        assert!(!P2pkhAddress::validate(&addr, Network::Mainnet));
    }

    #[test]
    fn test_script_pubkey_matches_address() {
        let pk = PublicKey::from_str(GENERATOR_PUBKEY).unwrap();
        let addr = P2pkhAddress::parse(
            &P2pkhAddress::from_public_key(&pk, Network::Mainnet),
            Network::Mainnet,
        )
        .unwrap();
        assert_eq!(addr.script_pubkey(), P2pkhAddress::script_pubkey(&pk));
    }

    #[test]
    fn test_blank_address_rejected() {
        let err = P2pkhAddress::parse("  ", Network::Mainnet).unwrap_err();
        assert!(matches!(err, KeyringError::InvalidInput(_)));
    }
}
