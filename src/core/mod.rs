pub mod config;
pub mod errors;

pub use config::{KeyringConfig, Network, DEFAULT_HD_PATH};
pub use errors::KeyringError;
