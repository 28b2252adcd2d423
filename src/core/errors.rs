use std::fmt;

/// Error type for keyring and signing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyringError {
    /// Address not held by this keyring, or unknown keyring type.
    NotFound(String),
    /// Malformed WIF, blank address, bad sighash flags, bad index range.
    InvalidInput(String),
    /// Operation requires state the keyring does not have yet (e.g. no HD root).
    PreconditionFailed(String),
    /// The entropy source could not produce randomness.
    EntropyFailure(String),
    /// BIP32 derivation errors, including an exhausted index scan.
    KeyDerivation(String),
    /// secp256k1 / signing errors.
    Crypto(String),
    /// Serialized keyring state could not be read or written.
    Serialization(String),
    /// Invalid configuration.
    Config(String),
}

impl fmt::Display for KeyringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyringError::NotFound(msg) => write!(f, "Not found: {}", msg),
            KeyringError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            KeyringError::PreconditionFailed(msg) => write!(f, "Precondition failed: {}", msg),
            KeyringError::EntropyFailure(msg) => write!(f, "Entropy failure: {}", msg),
            KeyringError::KeyDerivation(msg) => write!(f, "Key derivation error: {}", msg),
            KeyringError::Crypto(msg) => write!(f, "Crypto error: {}", msg),
            KeyringError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            KeyringError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for KeyringError {}

impl KeyringError {
    /// Caller mistakes that leave the keyring usable (wrong address, bad argument).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeyringError::NotFound(_) | KeyringError::InvalidInput(_)
        )
    }

    /// Conditions the caller must not paper over.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            KeyringError::EntropyFailure(_) | KeyringError::Crypto(_)
        )
    }
}

impl From<serde_json::Error> for KeyringError {
    fn from(err: serde_json::Error) -> Self {
        KeyringError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for KeyringError {
    fn from(err: toml::de::Error) -> Self {
        KeyringError::Config(err.to_string())
    }
}

impl From<bitcoin::key::Error> for KeyringError {
    fn from(err: bitcoin::key::Error) -> Self {
        KeyringError::InvalidInput(format!("invalid private key: {}", err))
    }
}

impl From<bitcoin::bip32::Error> for KeyringError {
    fn from(err: bitcoin::bip32::Error) -> Self {
        KeyringError::KeyDerivation(err.to_string())
    }
}

impl From<bip39::Error> for KeyringError {
    fn from(err: bip39::Error) -> Self {
        KeyringError::InvalidInput(format!("invalid mnemonic: {}", err))
    }
}

impl From<bitcoin::secp256k1::Error> for KeyringError {
    fn from(err: bitcoin::secp256k1::Error) -> Self {
        KeyringError::Crypto(err.to_string())
    }
}
