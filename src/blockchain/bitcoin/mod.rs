//! Bitcoin-family UTXO primitives.
//!
//! - P2PKH addresses
//! - secp256k1 key pairs and signed messages
//! - transactions with their spent outputs attached
//! - fork-id sighash and input signing

pub mod account;
pub mod address;
pub mod sighash;
pub mod transaction;

pub use account::{verify_message, KeyPair};
pub use address::P2pkhAddress;
pub use sighash::{
    sighash, sighash_preimage, sign, verify, SighashCache, SighashDigest, SighashType,
    SigningFlags, TxSignature, SIGHASH_SINGLE_BUG,
};
pub use transaction::{p2pkh_unlocking_script, Input, Transaction};
