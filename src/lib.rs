#![allow(clippy::doc_lazy_continuation)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::len_zero)]
// src/lib.rs

//! Key custody and fork-id transaction signing for a Bitcoin-family UTXO wallet.
//!
//! Keyrings hold private keys and hand out P2PKH addresses; the signing
//! engine in [`blockchain::bitcoin::sighash`] produces the per-input
//! signatures keyrings write into transactions.

pub mod blockchain;
pub mod core;
pub mod crypto;
pub mod keyring;

pub use crate::blockchain::bitcoin::{
    KeyPair, P2pkhAddress, SighashDigest, SighashType, SigningFlags, Transaction, TxSignature,
};
pub use crate::core::{KeyringConfig, KeyringError, Network};
pub use crate::crypto::{EntropySource, OsEntropy};
pub use crate::keyring::{HdKeyring, Keyring, KeyringRegistry, SimpleKeyring};

// Test logging setup. Included under `cargo test` or with the `test-env` feature.
#[cfg(any(test, feature = "test-env"))]
mod test_env;
