//! Transaction model at the signing boundary.
//!
//! Unlike `bitcoin::Transaction`, every input here carries the output it
//! spends, because the fork-id sighash commits to that output's script and
//! value. Conversions to and from the `bitcoin` types are provided for
//! serialization.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, PublicKey, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness};

use super::sighash::TxSignature;
use crate::core::errors::KeyringError;

/// One transaction input plus the previous output it redeems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub previous_output: OutPoint,
    pub sequence: u32,
    /// Unlocking script; empty until signed.
    pub script_sig: ScriptBuf,
    /// Output being spent. Required for signing.
    pub prevout: Option<TxOut>,
}

impl Input {
    /// Unsigned input spending `prevout` at `previous_output`, final sequence.
    pub fn new(previous_output: OutPoint, prevout: TxOut) -> Self {
        Self {
            previous_output,
            sequence: Sequence::MAX.0,
            script_sig: ScriptBuf::new(),
            prevout: Some(prevout),
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn set_script(&mut self, script: ScriptBuf) {
        self.script_sig = script;
    }

    pub fn is_signed(&self) -> bool {
        !self.script_sig.is_empty()
    }

    pub fn amount(&self) -> Option<Amount> {
        self.prevout.as_ref().map(|o| o.value)
    }
}

/// Mutable transaction aggregate owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub lock_time: u32,
    pub inputs: Vec<Input>,
    pub outputs: Vec<TxOut>,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            version: 1,
            lock_time: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl Transaction {
    pub fn new(version: i32, lock_time: u32) -> Self {
        Self {
            version,
            lock_time,
            ..Self::default()
        }
    }

    pub fn add_input(&mut self, input: Input) -> &mut Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output(&mut self, output: TxOut) -> &mut Self {
        self.outputs.push(output);
        self
    }

    /// Attach previous outputs to a decoded `bitcoin::Transaction`.
    ///
    /// `prevouts[i]` must be the output spent by input `i`.
    pub fn from_bitcoin(tx: bitcoin::Transaction, prevouts: Vec<TxOut>) -> Result<Self, KeyringError> {
        if tx.input.len() != prevouts.len() {
            return Err(KeyringError::InvalidInput(format!(
                "transaction has {} inputs but {} previous outputs were supplied",
                tx.input.len(),
                prevouts.len()
            )));
        }

        let inputs = tx
            .input
            .into_iter()
            .zip(prevouts)
            .map(|(txin, prevout)| Input {
                previous_output: txin.previous_output,
                sequence: txin.sequence.0,
                script_sig: txin.script_sig,
                prevout: Some(prevout),
            })
            .collect();

        Ok(Self {
            version: tx.version.0,
            lock_time: tx.lock_time.to_consensus_u32(),
            inputs,
            outputs: tx.output,
        })
    }

    /// Wire-level view (previous outputs dropped).
    pub fn to_bitcoin(&self) -> bitcoin::Transaction {
        bitcoin::Transaction {
            version: Version(self.version),
            lock_time: LockTime::from_consensus(self.lock_time),
            input: self
                .inputs
                .iter()
                .map(|input| TxIn {
                    previous_output: input.previous_output,
                    script_sig: input.script_sig.clone(),
                    sequence: Sequence(input.sequence),
                    witness: Witness::new(),
                })
                .collect(),
            output: self.outputs.clone(),
        }
    }

    /// Consensus serialization as hex.
    pub fn serialize_hex(&self) -> String {
        hex::encode(serialize(&self.to_bitcoin()))
    }

    pub fn txid(&self) -> Txid {
        self.to_bitcoin().txid()
    }
}

/// P2PKH unlocking script: `<der signature || sighash byte> <pubkey>`.
pub fn p2pkh_unlocking_script(
    signature: &TxSignature,
    public_key: &PublicKey,
) -> Result<ScriptBuf, KeyringError> {
    let sig_push = PushBytesBuf::try_from(signature.to_checksig_bytes())
        .map_err(|e| KeyringError::Crypto(format!("signature push failed: {:?}", e)))?;
    let pk_push = PushBytesBuf::try_from(public_key.to_bytes())
        .map_err(|e| KeyringError::Crypto(format!("public key push failed: {:?}", e)))?;

    Ok(Builder::new()
        .push_slice(sig_push)
        .push_slice(pk_push)
        .into_script())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::consensus::encode::deserialize;
    use std::str::FromStr;

    const TWO_INPUT_TX: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";

    fn prevouts() -> Vec<TxOut> {
        vec![
            TxOut {
                value: Amount::from_sat(625_000_000),
                script_pubkey: ScriptBuf::from_hex(
                    "2103c9f4836b9a4f77fc0d81f7bcb01b7f1b35916864b9476c241ce9fc198bd25432ac",
                )
                .unwrap(),
            },
            TxOut {
                value: Amount::from_sat(600_000_000),
                script_pubkey: ScriptBuf::from_hex("00141d0f172a0ecb48aee1be1f2687d2963ae33f71a1").unwrap(),
            },
        ]
    }

    #[test]
    fn test_bitcoin_roundtrip_preserves_wire_bytes() {
        let raw = hex::decode(TWO_INPUT_TX).unwrap();
        let btc: bitcoin::Transaction = deserialize(&raw).unwrap();
        let tx = Transaction::from_bitcoin(btc, prevouts()).unwrap();

        assert_eq!(tx.version, 1);
        assert_eq!(tx.lock_time, 0x11);
        assert_eq!(tx.inputs[0].sequence, 0xffff_ffee);
        assert_eq!(tx.inputs[1].amount(), Some(Amount::from_sat(600_000_000)));
        assert_eq!(tx.serialize_hex(), TWO_INPUT_TX);
    }

    #[test]
    fn test_from_bitcoin_rejects_prevout_mismatch() {
        let raw = hex::decode(TWO_INPUT_TX).unwrap();
        let btc: bitcoin::Transaction = deserialize(&raw).unwrap();
        let err = Transaction::from_bitcoin(btc, vec![]).unwrap_err();
        assert!(matches!(err, KeyringError::InvalidInput(_)));
    }

    #[test]
    fn test_builder_defaults() {
        let txid = Txid::from_str("9f96ade4b41d5433f4eda31e1738ec2b36f6e7d1420d94a6af99801a88f7f7ff").unwrap();
        let mut tx = Transaction::new(2, 0);
        tx.add_input(Input::new(OutPoint { txid, vout: 0 }, prevouts()[0].clone()))
            .add_output(prevouts()[1].clone());

        assert_eq!(tx.inputs[0].sequence, 0xffff_ffff);
        assert!(!tx.inputs[0].is_signed());
        assert_eq!(tx.outputs.len(), 1);
    }
}
