// tests/util.rs
// Shared fixtures for the integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use bitcoin::consensus::encode::deserialize;
use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut, Txid};
use utxo_keyring::blockchain::bitcoin::Input;
use utxo_keyring::{EntropySource, KeyPair, KeyringConfig, KeyringError, OsEntropy, Transaction};

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// m/44'/0'/0'/0/{0,1,2} of `MNEMONIC` on mainnet.
pub const MNEMONIC_ADDRESSES: [&str; 3] = [
    "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA",
    "1Ak8PffB2meyfYnbXZR9EGfLfFZVpzJvQP",
    "1MNF5RSaabFwcbtJirJwKnDytsXXEsVsNb",
];

pub const MNEMONIC_WIF_0: &str = "L4p2b9VAf8k5aUahF1JCJUzZkgNEAqLfq8DDdQiyAprQAKSbu8hf";

/// Secret key 1, compressed, mainnet.
pub const WIF_ONE: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
pub const WIF_ONE_ADDRESS: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";

/// BIP143 native P2WPKH example transaction (two inputs, two outputs).
pub const BIP143_TX: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";

pub const BIP143_SCRIPT_0: &str =
    "2103c9f4836b9a4f77fc0d81f7bcb01b7f1b35916864b9476c241ce9fc198bd25432ac";
pub const BIP143_AMOUNT_0: u64 = 625_000_000;
/// scriptCode of input 1 (the P2PKH form of its witness program).
pub const BIP143_SCRIPT_1: &str = "76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac";
pub const BIP143_AMOUNT_1: u64 = 600_000_000;

/// BIP143 P2SH-P2WSH 6-of-6 multisig example transaction (one input).
pub const BIP143_MULTISIG_TX: &str = "010000000136641869ca081e70f394c6948e8af409e18b619df2ed74aa106c1ca29787b96e0100000000ffffffff0200e9a435000000001976a914389ffce9cd9ae88dcc0631e88a821ffdbe9bfe2688acc0832f05000000001976a9147480a33f950689af511e6e84c138dbbd3c3ee41588ac00000000";

/// witnessScript of the multisig input, used as its scriptCode.
pub const BIP143_MULTISIG_SCRIPT: &str = "56210307b8ae49ac90a048e9b53357a2354b3334e9c8bee813ecb98e99a7e07e8c3ba32103b28f0c28bfab54554ae8c658ac5c3e0ce6e79ad336331f78c428dd43eea8449b21034b8113d703413d57761b8b9781957b8c0ac1dfe69f492580ca4195f50376ba4a21033400f6afecb833092a9a21cfdf1ed1376e58c5d1f47de74683123987e967a8f42103a6d48b1131e94ba04d9737d61acdaa1322008af9602b3b14862c07a1789aac162102d8b661b0b3302ee2f162b09e07a55ad5dfbe673a9f01d9f0c19617681024306b56ae";
pub const BIP143_MULTISIG_AMOUNT: u64 = 987_654_321;

pub fn script(hex: &str) -> ScriptBuf {
    ScriptBuf::from_hex(hex).unwrap()
}

pub fn bip143_tx() -> Transaction {
    let raw = hex::decode(BIP143_TX).unwrap();
    let btc: bitcoin::Transaction = deserialize(&raw).unwrap();
    let prevouts = vec![
        TxOut {
            value: Amount::from_sat(BIP143_AMOUNT_0),
            script_pubkey: script(BIP143_SCRIPT_0),
        },
        TxOut {
            value: Amount::from_sat(BIP143_AMOUNT_1),
            script_pubkey: script("00141d0f172a0ecb48aee1be1f2687d2963ae33f71a1"),
        },
    ];
    Transaction::from_bitcoin(btc, prevouts).unwrap()
}

/// Unsigned transaction spending `inputs` P2PKH outputs of `key`.
pub fn spend_tx(key: &KeyPair, inputs: u32) -> Transaction {
    let txid = Txid::from_str("8ac60eb9575db5b2d987e29f301b5b819ea83a5c6579d282d189cc04b8e151ef").unwrap();
    let mut tx = Transaction::new(2, 0);
    for vout in 0..inputs {
        tx.add_input(Input::new(
            OutPoint { txid, vout },
            TxOut {
                value: Amount::from_sat(50_000 + u64::from(vout)),
                script_pubkey: key.script_pubkey(),
            },
        ));
    }
    tx.add_output(TxOut {
        value: Amount::from_sat(40_000),
        script_pubkey: key.script_pubkey(),
    });
    tx
}

pub fn os_entropy() -> Arc<dyn EntropySource> {
    Arc::new(OsEntropy)
}

pub fn config() -> KeyringConfig {
    KeyringConfig::default()
}

/// Entropy source that always fails.
#[derive(Debug)]
pub struct BrokenEntropy;

impl EntropySource for BrokenEntropy {
    fn fill_bytes(&self, _dest: &mut [u8]) -> Result<(), KeyringError> {
        Err(KeyringError::EntropyFailure("device unavailable".to_string()))
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn bip143_multisig_tx() -> Transaction {
    let raw = hex::decode(BIP143_MULTISIG_TX).unwrap();
    let btc: bitcoin::Transaction = deserialize(&raw).unwrap();
    let prevouts = vec![TxOut {
        value: Amount::from_sat(BIP143_MULTISIG_AMOUNT),
        script_pubkey: script("a9149993a429037b5d912407a71c252019287b8d27a587"),
    }];
    Transaction::from_bitcoin(btc, prevouts).unwrap()
}
