//! Signature hash computation.
//!
//! Two digest algorithms are in play: the legacy scheme, which serializes a
//! modified copy of the whole transaction, and the BIP143 scheme used for
//! version-0 witness programs, which commits to the spent amount and hashes
//! a fixed-structure preimage. Both are pure functions of their inputs.

use crate::primitives::encode::Encodable;
use crate::primitives::hash::{sha256d, Hash256};
use crate::primitives::script::Script;
use crate::primitives::transaction::{Transaction, TxIn, TxOut};
use crate::{Result, SignerError};
use serde::{Deserialize, Serialize};

/// Signature hash type: which parts of the transaction a signature commits
/// to. The base flag (ALL, NONE, SINGLE) may be combined with the
/// ANYONECANPAY bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigHashType {
    /// Sign all inputs and all outputs.
    All = 0x01,
    /// Sign all inputs, no outputs.
    None = 0x02,
    /// Sign all inputs and only the output with the same index.
    Single = 0x03,
    /// Sign all outputs, only this input.
    AllPlusAnyoneCanPay = 0x81,
    /// Sign no outputs, only this input.
    NonePlusAnyoneCanPay = 0x82,
    /// Sign the matching output, only this input.
    SinglePlusAnyoneCanPay = 0x83,
}

impl Default for SigHashType {
    fn default() -> Self {
        SigHashType::All
    }
}

impl SigHashType {
    /// The byte appended to a DER signature and serialized into the digest.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the ANYONECANPAY bit is set.
    pub fn is_anyone_can_pay(self) -> bool {
        self.as_u8() & 0x80 != 0
    }

    /// The base flag with the ANYONECANPAY bit stripped.
    pub fn base(self) -> SigHashType {
        match self {
            SigHashType::All | SigHashType::AllPlusAnyoneCanPay => SigHashType::All,
            SigHashType::None | SigHashType::NonePlusAnyoneCanPay => SigHashType::None,
            SigHashType::Single | SigHashType::SinglePlusAnyoneCanPay => SigHashType::Single,
        }
    }

    /// Parse a sighash-type byte.
    pub fn from_u8(byte: u8) -> Option<SigHashType> {
        match byte {
            0x01 => Some(SigHashType::All),
            0x02 => Some(SigHashType::None),
            0x03 => Some(SigHashType::Single),
            0x81 => Some(SigHashType::AllPlusAnyoneCanPay),
            0x82 => Some(SigHashType::NonePlusAnyoneCanPay),
            0x83 => Some(SigHashType::SinglePlusAnyoneCanPay),
            _ => None,
        }
    }
}

/// Compute the legacy (pre-segwit) signature hash for one input.
///
/// Serializes a modified copy of the transaction: the signed input's script
/// is replaced by `script_code`, every other input's script is emptied, and
/// inputs/outputs are pruned or blanked according to `sighash_type`; the
/// 4-byte sighash type is appended before double hashing.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    sighash_type: SigHashType,
) -> Result<Hash256> {
    if input_index >= tx.input.len() {
        return Err(SignerError::InvalidInput(format!(
            "Input index {} out of range (tx has {} inputs)",
            input_index,
            tx.input.len()
        )));
    }

    let base = sighash_type.base();

    // The historical SIGHASH_SINGLE quirk (digest 0x01 when no matching
    // output exists) is rejected outright: nothing should sign that digest.
    if base == SigHashType::Single && input_index >= tx.output.len() {
        return Err(SignerError::InvalidInput(
            "SIGHASH_SINGLE requires an output at the input's index".to_string(),
        ));
    }

    let input: Vec<TxIn> = if sighash_type.is_anyone_can_pay() {
        let mut current = tx.input[input_index].clone();
        current.script_sig = script_code.clone();
        current.witness = Vec::new();
        vec![current]
    } else {
        tx.input
            .iter()
            .enumerate()
            .map(|(i, txin)| {
                let mut txin = txin.clone();
                txin.witness = Vec::new();
                txin.script_sig = if i == input_index {
                    script_code.clone()
                } else {
                    Script::new()
                };
                // NONE and SINGLE let other signers change other inputs'
                // sequence numbers.
                if i != input_index && base != SigHashType::All {
                    txin.sequence = 0;
                }
                txin
            })
            .collect()
    };

    let output: Vec<TxOut> = match base {
        SigHashType::All => tx.output.clone(),
        SigHashType::None => Vec::new(),
        SigHashType::Single => tx
            .output
            .iter()
            .take(input_index + 1)
            .enumerate()
            .map(|(i, txout)| {
                if i == input_index {
                    txout.clone()
                } else {
                    // Outputs before the matching one are blanked to the
                    // "null" output: value -1 and an empty script.
                    TxOut::new(u64::MAX, Script::new())
                }
            })
            .collect(),
        _ => unreachable!("base() strips the ANYONECANPAY bit"),
    };

    let modified = Transaction {
        version: tx.version,
        lock_time: tx.lock_time,
        input,
        output,
    };

    let mut preimage = modified.consensus_encode_legacy()?;
    preimage.extend_from_slice(&(sighash_type.as_u8() as u32).to_le_bytes());
    Ok(sha256d(&preimage))
}

/// Compute the BIP143 signature hash for a version-0 witness input.
///
/// `amount` is the value of the output being spent; it is committed to by
/// the digest and therefore mandatory.
pub fn segwit_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount: Option<u64>,
    sighash_type: SigHashType,
) -> Result<Hash256> {
    if input_index >= tx.input.len() {
        return Err(SignerError::InvalidInput(format!(
            "Input index {} out of range (tx has {} inputs)",
            input_index,
            tx.input.len()
        )));
    }
    let amount = amount.ok_or(SignerError::MissingAmount)?;

    let base = sighash_type.base();
    let anyone_can_pay = sighash_type.is_anyone_can_pay();
    let input = &tx.input[input_index];

    let hash_prevouts: Hash256 = if !anyone_can_pay {
        let mut prevouts = Vec::with_capacity(tx.input.len() * 36);
        for txin in &tx.input {
            txin.previous_output.consensus_encode(&mut prevouts)?;
        }
        sha256d(&prevouts)
    } else {
        [0u8; 32]
    };

    let hash_sequence: Hash256 = if !anyone_can_pay
        && base != SigHashType::Single
        && base != SigHashType::None
    {
        let mut sequences = Vec::with_capacity(tx.input.len() * 4);
        for txin in &tx.input {
            txin.sequence.consensus_encode(&mut sequences)?;
        }
        sha256d(&sequences)
    } else {
        [0u8; 32]
    };

    let hash_outputs: Hash256 = if base != SigHashType::Single && base != SigHashType::None {
        let mut outputs = Vec::new();
        for txout in &tx.output {
            txout.consensus_encode(&mut outputs)?;
        }
        sha256d(&outputs)
    } else if base == SigHashType::Single && input_index < tx.output.len() {
        let mut output = Vec::new();
        tx.output[input_index].consensus_encode(&mut output)?;
        sha256d(&output)
    } else {
        [0u8; 32]
    };

    let mut preimage = Vec::with_capacity(160 + script_code.len());
    tx.version.consensus_encode(&mut preimage)?;
    preimage.extend_from_slice(&hash_prevouts);
    preimage.extend_from_slice(&hash_sequence);
    input.previous_output.consensus_encode(&mut preimage)?;
    script_code.consensus_encode(&mut preimage)?;
    amount.consensus_encode(&mut preimage)?;
    input.sequence.consensus_encode(&mut preimage)?;
    preimage.extend_from_slice(&hash_outputs);
    tx.lock_time.consensus_encode(&mut preimage)?;
    preimage.extend_from_slice(&(sighash_type.as_u8() as u32).to_le_bytes());

    Ok(sha256d(&preimage))
}
