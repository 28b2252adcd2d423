//! secp256k1 key pairs held by keyrings.
//!
//! A [`KeyPair`] is a private key plus its compressed-or-not public key and
//! the P2PKH address it yields on the keyring's network.

use std::fmt;

use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Message, SecretKey};
use bitcoin::sign_message::{signed_msg_hash, MessageSignature};
use bitcoin::{PrivateKey, PublicKey, ScriptBuf};
use tracing::debug;

use super::address::P2pkhAddress;
use crate::core::config::Network;
use crate::core::errors::KeyringError;
use crate::crypto::{random_secret_key, EntropySource, SECP};

/// Private key with its derived public key and address.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    private_key: PrivateKey,
    public_key: PublicKey,
    address: String,
    network: Network,
}

impl KeyPair {
    /// Fresh random compressed key pair.
    pub fn generate(network: Network, entropy: &dyn EntropySource) -> Result<Self, KeyringError> {
        let secret_key = random_secret_key(entropy)?;
        let keypair = Self::from_secret_key(secret_key, network);
        debug!("generated key pair for {}", keypair.address);
        Ok(keypair)
    }

    /// Compressed key pair from a raw secret.
    pub fn from_secret_key(secret_key: SecretKey, network: Network) -> Self {
        Self::from_private_key(PrivateKey::new(secret_key, network.to_bitcoin()), network)
    }

    /// Wrap `private_key`, re-tagging it for `network`.
    ///
    /// The compression flag is kept, since it changes the address.
    pub fn from_private_key(mut private_key: PrivateKey, network: Network) -> Self {
        private_key.network = network.to_bitcoin();
        let public_key = private_key.public_key(&SECP);
        let address = P2pkhAddress::from_public_key(&public_key, network);
        Self {
            private_key,
            public_key,
            address,
            network,
        }
    }

    pub fn from_wif(wif: &str, network: Network) -> Result<Self, KeyringError> {
        let private_key = PrivateKey::from_wif(wif.trim())?;
        Ok(Self::from_private_key(private_key, network))
    }

    pub fn to_wif(&self) -> String {
        self.private_key.to_wif()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_compressed(&self) -> bool {
        self.private_key.compressed
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.private_key.inner
    }

    /// P2PKH locking script for this key.
    pub fn script_pubkey(&self) -> ScriptBuf {
        P2pkhAddress::script_pubkey(&self.public_key)
    }

    /// Signed-message signature, base64 encoded.
    pub fn sign_message(&self, message: &str) -> String {
        let msg_hash = signed_msg_hash(message);
        let msg = Message::from_digest(msg_hash.to_byte_array());
        let signature = SECP.sign_ecdsa_recoverable(&msg, &self.private_key.inner);
        MessageSignature::new(signature, self.private_key.compressed).to_base64()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .field("network", &self.network)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Check a base64 signed-message signature against `address`.
///
/// A well-formed signature from another key is `Ok(false)`; malformed input
/// is an error.
pub fn verify_message(
    address: &str,
    message: &str,
    signature: &str,
    network: Network,
) -> Result<bool, KeyringError> {
    let address = P2pkhAddress::parse(address, network)?;
    let signature = MessageSignature::from_base64(signature.trim())
        .map_err(|e| KeyringError::InvalidInput(format!("invalid message signature: {}", e)))?;
    Ok(signature
        .is_signed_by_address(&SECP, &address, signed_msg_hash(message))
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::OsEntropy;

    // WIF of secret 0x...01, compressed, mainnet.
    const WIF_ONE: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";

    #[test]
    fn test_wif_roundtrip() {
        let kp = KeyPair::from_wif(WIF_ONE, Network::Mainnet).unwrap();
        assert_eq!(kp.to_wif(), WIF_ONE);
        assert_eq!(kp.address(), "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert!(kp.is_compressed());
    }

    #[test]
    fn test_wif_retagged_for_testnet() {
        let kp = KeyPair::from_wif(WIF_ONE, Network::Testnet).unwrap();
        assert!(kp.to_wif().starts_with('c'));
        assert!(P2pkhAddress::validate(kp.address(), Network::Testnet));
    }

    #[test]
    fn test_invalid_wif() {
        let err = KeyPair::from_wif("not-a-wif", Network::Mainnet).unwrap_err();
        assert!(matches!(err, KeyringError::InvalidInput(_)));
    }

    #[test]
    fn test_generate_is_unique() {
        let a = KeyPair::generate(Network::Mainnet, &OsEntropy).unwrap();
        let b = KeyPair::generate(Network::Mainnet, &OsEntropy).unwrap();
        assert_ne!(a.address(), b.address());
        assert_eq!(a.public_key().to_bytes().len(), 33);
    }

    #[test]
    fn test_message_sign_verify() {
        let kp = KeyPair::from_wif(WIF_ONE, Network::Mainnet).unwrap();
        let sig = kp.sign_message("hello keyring");
        assert!(verify_message(kp.address(), "hello keyring", &sig, Network::Mainnet).unwrap());
        assert!(!verify_message(kp.address(), "tampered", &sig, Network::Mainnet).unwrap());
    }

    #[test]
    fn test_verify_rejects_garbage_signature() {
        let kp = KeyPair::from_wif(WIF_ONE, Network::Mainnet).unwrap();
        let err = verify_message(kp.address(), "m", "%%%", Network::Mainnet).unwrap_err();
        assert!(matches!(err, KeyringError::InvalidInput(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let kp = KeyPair::from_wif(WIF_ONE, Network::Mainnet).unwrap();
        let rendered = format!("{:?}", kp);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(WIF_ONE));
    }
}
