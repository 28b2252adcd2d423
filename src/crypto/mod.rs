pub mod entropy;

use bitcoin::secp256k1::{All, Secp256k1};
use once_cell::sync::Lazy;

pub use self::entropy::{random_bytes, random_secret_key, EntropySource, OsEntropy};

/// Shared signing/verification context.
pub(crate) static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);
