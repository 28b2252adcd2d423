#![cfg(any(test, feature = "test-env"))]

use ctor::ctor;
use tracing_subscriber::EnvFilter;

// Route tracing output through the test harness so it only shows for failing
// tests. RUST_LOG overrides the default filter.
#[ctor]
fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("utxo_keyring=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
