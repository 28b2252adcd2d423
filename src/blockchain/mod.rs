//! Chain-specific primitives used by the keyrings.

pub mod bitcoin;

pub use self::bitcoin::{KeyPair, P2pkhAddress, SighashType, SigningFlags, Transaction};
