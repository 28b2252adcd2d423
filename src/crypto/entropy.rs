//! Entropy sources for key and mnemonic generation.
//!
//! Everything that needs randomness goes through [`EntropySource`], so a
//! failure of the OS generator surfaces as [`KeyringError::EntropyFailure`]
//! instead of a panic or a weaker fallback.

use std::fmt;

use bitcoin::secp256k1::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;
use zeroize::Zeroizing;

use crate::core::errors::KeyringError;

/// Redraws allowed when 32 random bytes fall outside the secp256k1 scalar range.
const MAX_SECRET_KEY_ATTEMPTS: usize = 8;

/// Supplier of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync + fmt::Debug {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), KeyringError>;
}

/// Operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), KeyringError> {
        let mut rng = OsRng;
        rng.try_fill_bytes(dest)
            .map_err(|e| KeyringError::EntropyFailure(format!("OS random generator failed: {}", e)))
    }
}

/// `len` fresh random bytes in a buffer that is wiped on drop.
pub fn random_bytes(source: &dyn EntropySource, len: usize) -> Result<Zeroizing<Vec<u8>>, KeyringError> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    source.fill_bytes(&mut buf)?;
    Ok(buf)
}

/// Draw a valid secp256k1 secret key, redrawing out-of-range scalars.
pub fn random_secret_key(source: &dyn EntropySource) -> Result<SecretKey, KeyringError> {
    for attempt in 1..=MAX_SECRET_KEY_ATTEMPTS {
        let mut bytes = Zeroizing::new([0u8; 32]);
        source.fill_bytes(&mut bytes[..])?;
        match SecretKey::from_slice(&bytes[..]) {
            Ok(key) => return Ok(key),
            Err(_) => warn!("random scalar out of range, redrawing (attempt {})", attempt),
        }
    }
    Err(KeyringError::EntropyFailure(format!(
        "no valid secret key after {} draws",
        MAX_SECRET_KEY_ATTEMPTS
    )))
}
