//! Fork-id signature hashing and ECDSA signing of transaction inputs.
//!
//! Preimage layout for input `i`:
//!
//! ```text
//! version(4 LE) || hashPrevouts(32) || hashSequence(32)
//! || prev txid(32) || prev vout(4 LE)
//! || varint(len(subscript)) || subscript
//! || amount(8 LE) || sequence(4 LE)
//! || hashOutputs(32) || lock_time(4 LE) || sighash_type(4 LE)
//! ```
//!
//! The digest is `sha256d(preimage)` in reversed byte order. Signing reverses
//! it back, so the ECDSA message is the plain double hash.

use std::fmt;
use std::ops::BitOr;

use bitcoin::consensus::encode::{serialize, VarInt};
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::secp256k1::{ecdsa, Message, PublicKey, SecretKey};
use bitcoin::{Amount, Script};
use once_cell::unsync::OnceCell;

use super::transaction::Transaction;
use crate::core::errors::KeyringError;
use crate::crypto::SECP;

/// Returned as the digest, unhashed, when the preimage equals it.
pub const SIGHASH_SINGLE_BUG: [u8; 32] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
];

/// XOR mask applied to the fork value under replay protection.
const REPLAY_PROTECTION_FORK_MASK: u32 = 0xdead;

const ZERO_HASH: [u8; 32] = [0u8; 32];

/// Sighash flag word.
///
/// The low five bits select ALL/NONE/SINGLE, `0x40` marks fork-id and `0x80`
/// ANYONECANPAY. The upper 24 bits carry the fork value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SighashType(u32);

impl SighashType {
    pub const ALL: Self = Self(0x01);
    pub const NONE: Self = Self(0x02);
    pub const SINGLE: Self = Self(0x03);
    pub const FORKID: Self = Self(0x40);
    pub const ANYONECANPAY: Self = Self(0x80);

    const BASE_MASK: u32 = 0x1f;

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub fn base_type(self) -> u32 {
        self.0 & Self::BASE_MASK
    }

    pub fn has_anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY.0 != 0
    }

    pub fn has_fork_id(self) -> bool {
        self.0 & Self::FORKID.0 != 0
    }

    fn is_single(self) -> bool {
        self.base_type() == Self::SINGLE.0
    }

    fn is_none(self) -> bool {
        self.base_type() == Self::NONE.0
    }

    /// Low byte appended to DER signatures in unlocking scripts.
    pub fn byte(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Rejects base types other than ALL, NONE and SINGLE.
    pub fn validate(self) -> Result<(), KeyringError> {
        match self.base_type() {
            0x01..=0x03 => Ok(()),
            other => Err(KeyringError::InvalidInput(format!(
                "unsupported sighash base type {:#04x} in {:#010x}",
                other, self.0
            ))),
        }
    }

    /// Replay-protection transform: the fork value (upper 24 bits) is XORed
    /// with `0xdead` and forced into the `0xffxxxx` range, so the result never
    /// matches a type valid on the legacy chain.
    pub fn with_replay_protection(self) -> Self {
        let fork_value = self.0 >> 8;
        let new_fork_value = 0x00ff_0000 | (fork_value ^ REPLAY_PROTECTION_FORK_MASK);
        Self((new_fork_value << 8) | (self.0 & 0xff))
    }
}

impl BitOr for SighashType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SighashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Script verification flags that influence the sighash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigningFlags(u32);

impl SigningFlags {
    pub const NONE: Self = Self(0);
    pub const ENABLE_SIGHASH_FORKID: Self = Self(1 << 16);
    pub const ENABLE_REPLAY_PROTECTION: Self = Self(1 << 17);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for SigningFlags {
    fn default() -> Self {
        Self::ENABLE_SIGHASH_FORKID
    }
}

impl BitOr for SigningFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// 32-byte signing digest in reversed (display) byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SighashDigest([u8; 32]);

impl SighashDigest {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// ECDSA message: the digest read little-endian.
    fn to_message(self) -> Message {
        let mut bytes = self.0;
        bytes.reverse();
        Message::from_digest(bytes)
    }
}

/// ECDSA signature plus the sighash type it commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSignature {
    pub signature: ecdsa::Signature,
    pub sighash_type: SighashType,
}

impl TxSignature {
    pub fn r(&self) -> [u8; 32] {
        let compact = self.signature.serialize_compact();
        let mut r = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        r
    }

    pub fn s(&self) -> [u8; 32] {
        let compact = self.signature.serialize_compact();
        let mut s = [0u8; 32];
        s.copy_from_slice(&compact[32..]);
        s
    }

    pub fn to_der(&self) -> Vec<u8> {
        self.signature.serialize_der().to_vec()
    }

    /// DER signature followed by the sighash byte, as pushed in scriptSig.
    pub fn to_checksig_bytes(&self) -> Vec<u8> {
        let mut bytes = self.to_der();
        bytes.push(self.sighash_type.byte());
        bytes
    }

    /// Parse `DER || sighash byte`.
    pub fn from_checksig_bytes(bytes: &[u8]) -> Result<Self, KeyringError> {
        let (sighash_byte, der) = bytes
            .split_last()
            .ok_or_else(|| KeyringError::InvalidInput("empty signature".to_string()))?;
        let signature = ecdsa::Signature::from_der(der)
            .map_err(|e| KeyringError::InvalidInput(format!("invalid DER signature: {}", e)))?;
        Ok(Self {
            signature,
            sighash_type: SighashType::from_u32(u32::from(*sighash_byte)),
        })
    }
}

/// Per-transaction cache of the three shared hashes.
///
/// `hashPrevouts`, `hashSequence` and `hashOutputs` depend only on the
/// transaction, so they are computed at most once however many inputs are
/// signed.
pub struct SighashCache<'a> {
    tx: &'a Transaction,
    prevouts: OnceCell<[u8; 32]>,
    sequences: OnceCell<[u8; 32]>,
    outputs: OnceCell<[u8; 32]>,
}

impl<'a> SighashCache<'a> {
    pub fn new(tx: &'a Transaction) -> Self {
        Self {
            tx,
            prevouts: OnceCell::new(),
            sequences: OnceCell::new(),
            outputs: OnceCell::new(),
        }
    }

    pub fn transaction(&self) -> &'a Transaction {
        self.tx
    }

    fn hash_prevouts(&self) -> [u8; 32] {
        *self.prevouts.get_or_init(|| {
            let mut buf = Vec::with_capacity(self.tx.inputs.len() * 36);
            for input in &self.tx.inputs {
                buf.extend_from_slice(input.previous_output.txid.as_byte_array());
                buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        })
    }

    fn hash_sequence(&self) -> [u8; 32] {
        *self.sequences.get_or_init(|| {
            let mut buf = Vec::with_capacity(self.tx.inputs.len() * 4);
            for input in &self.tx.inputs {
                buf.extend_from_slice(&input.sequence.to_le_bytes());
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        })
    }

    fn hash_all_outputs(&self) -> [u8; 32] {
        *self.outputs.get_or_init(|| {
            let mut buf = Vec::new();
            for output in &self.tx.outputs {
                buf.extend_from_slice(&serialize(output));
            }
            sha256d::Hash::hash(&buf).to_byte_array()
        })
    }

    fn hash_single_output(&self, index: usize) -> [u8; 32] {
        sha256d::Hash::hash(&serialize(&self.tx.outputs[index])).to_byte_array()
    }

    /// Preimage bytes for `input_index` under `sighash_type` and `flags`.
    pub fn preimage(
        &self,
        input_index: usize,
        subscript: &Script,
        amount: Amount,
        sighash_type: SighashType,
        flags: SigningFlags,
    ) -> Result<Vec<u8>, KeyringError> {
        let input = self.tx.inputs.get(input_index).ok_or_else(|| {
            KeyringError::InvalidInput(format!(
                "input index {} out of range ({} inputs)",
                input_index,
                self.tx.inputs.len()
            ))
        })?;
        sighash_type.validate()?;

        let sighash_type = if flags.contains(SigningFlags::ENABLE_REPLAY_PROTECTION) {
            sighash_type.with_replay_protection()
        } else {
            sighash_type
        };

        let hash_prevouts = if sighash_type.has_anyone_can_pay() {
            ZERO_HASH
        } else {
            self.hash_prevouts()
        };

        let hash_sequence = if !sighash_type.has_anyone_can_pay()
            && !sighash_type.is_single()
            && !sighash_type.is_none()
        {
            self.hash_sequence()
        } else {
            ZERO_HASH
        };

        let hash_outputs = if !sighash_type.is_single() && !sighash_type.is_none() {
            self.hash_all_outputs()
        } else if sighash_type.is_single() && input_index < self.tx.outputs.len() {
            self.hash_single_output(input_index)
        } else {
            ZERO_HASH
        };

        let script = subscript.as_bytes();
        let mut buf = Vec::with_capacity(156 + 9 + script.len());
        buf.extend_from_slice(&self.tx.version.to_le_bytes());
        buf.extend_from_slice(&hash_prevouts);
        buf.extend_from_slice(&hash_sequence);
        buf.extend_from_slice(input.previous_output.txid.as_byte_array());
        buf.extend_from_slice(&input.previous_output.vout.to_le_bytes());
        buf.extend_from_slice(&serialize(&VarInt(script.len() as u64)));
        buf.extend_from_slice(script);
        buf.extend_from_slice(&amount.to_sat().to_le_bytes());
        buf.extend_from_slice(&input.sequence.to_le_bytes());
        buf.extend_from_slice(&hash_outputs);
        buf.extend_from_slice(&self.tx.lock_time.to_le_bytes());
        buf.extend_from_slice(&sighash_type.to_u32().to_le_bytes());
        Ok(buf)
    }

    /// Signing digest for `input_index`.
    pub fn digest(
        &self,
        input_index: usize,
        subscript: &Script,
        amount: Amount,
        sighash_type: SighashType,
        flags: SigningFlags,
    ) -> Result<SighashDigest, KeyringError> {
        let preimage = self.preimage(input_index, subscript, amount, sighash_type, flags)?;
        if preimage.as_slice() == SIGHASH_SINGLE_BUG {
            return Ok(SighashDigest(SIGHASH_SINGLE_BUG));
        }
        let mut digest = sha256d::Hash::hash(&preimage).to_byte_array();
        digest.reverse();
        Ok(SighashDigest(digest))
    }

    pub fn sign(
        &self,
        private_key: &SecretKey,
        sighash_type: SighashType,
        input_index: usize,
        subscript: &Script,
        amount: Amount,
        flags: SigningFlags,
    ) -> Result<TxSignature, KeyringError> {
        let digest = self.digest(input_index, subscript, amount, sighash_type, flags)?;
        let signature = SECP.sign_ecdsa(&digest.to_message(), private_key);
        Ok(TxSignature {
            signature,
            sighash_type,
        })
    }

    pub fn verify(
        &self,
        signature: &TxSignature,
        public_key: &PublicKey,
        input_index: usize,
        subscript: &Script,
        amount: Amount,
        flags: SigningFlags,
    ) -> Result<bool, KeyringError> {
        let digest = self.digest(input_index, subscript, amount, signature.sighash_type, flags)?;
        Ok(SECP
            .verify_ecdsa(&digest.to_message(), &signature.signature, public_key)
            .is_ok())
    }
}

/// Preimage bytes for one input.
pub fn sighash_preimage(
    tx: &Transaction,
    sighash_type: SighashType,
    input_index: usize,
    subscript: &Script,
    amount: Amount,
    flags: SigningFlags,
) -> Result<Vec<u8>, KeyringError> {
    SighashCache::new(tx).preimage(input_index, subscript, amount, sighash_type, flags)
}

/// Signing digest for one input.
pub fn sighash(
    tx: &Transaction,
    sighash_type: SighashType,
    input_index: usize,
    subscript: &Script,
    amount: Amount,
    flags: SigningFlags,
) -> Result<SighashDigest, KeyringError> {
    SighashCache::new(tx).digest(input_index, subscript, amount, sighash_type, flags)
}

pub fn sign(
    tx: &Transaction,
    private_key: &SecretKey,
    sighash_type: SighashType,
    input_index: usize,
    subscript: &Script,
    amount: Amount,
    flags: SigningFlags,
) -> Result<TxSignature, KeyringError> {
    SighashCache::new(tx).sign(private_key, sighash_type, input_index, subscript, amount, flags)
}

pub fn verify(
    tx: &Transaction,
    signature: &TxSignature,
    public_key: &PublicKey,
    input_index: usize,
    subscript: &Script,
    amount: Amount,
    flags: SigningFlags,
) -> Result<bool, KeyringError> {
    SighashCache::new(tx).verify(signature, public_key, input_index, subscript, amount, flags)
}
