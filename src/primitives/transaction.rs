//! Bitcoin transaction data structures and wire encoding.
//!
//! A [`Transaction`] is immutable once constructed. All modifications go
//! through [`TransactionBuilder`], which owns copies of the inputs and
//! outputs and is consumed by [`TransactionBuilder::done`] into a fresh
//! value. Witness data is carried per input and the BIP144 marker/flag pair
//! is emitted only when at least one input has a non-empty witness stack, so
//! legacy-only transactions serialize byte-identically to their pre-segwit
//! form.

use super::encode::{read_varint, write_varint, Decodable, Encodable};
use super::hash::{sha256d, Hash256};
use super::script::Script;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Reference to an output of a previous transaction.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    /// Transaction id in wire byte order.
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        OutPoint { txid, vout }
    }
}

impl Encodable for OutPoint {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.txid.consensus_encode(writer)?;
        written += self.vout.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for OutPoint {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(OutPoint {
            txid: <[u8; 32]>::consensus_decode(reader)?,
            vout: u32::consensus_decode(reader)?,
        })
    }
}

/// A transaction input.
///
/// The witness stack is not part of the input's own wire encoding; the
/// transaction serializes all witness stacks after the outputs (BIP144).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxIn {
    pub previous_output: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
    pub witness: Vec<Vec<u8>>,
}

impl TxIn {
    /// An input spending the given outpoint with an empty unlocking script
    /// and the default (final) sequence number.
    pub fn new(previous_output: OutPoint) -> Self {
        TxIn {
            previous_output,
            script_sig: Script::new(),
            sequence: 0xffffffff,
            witness: Vec::new(),
        }
    }
}

impl Encodable for TxIn {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.previous_output.consensus_encode(writer)?;
        written += self.script_sig.consensus_encode(writer)?;
        written += self.sequence.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for TxIn {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(TxIn {
            previous_output: OutPoint::consensus_decode(reader)?,
            script_sig: Script::consensus_decode(reader)?,
            sequence: u32::consensus_decode(reader)?,
            witness: Vec::new(),
        })
    }
}

/// A transaction output: an amount in satoshis plus its locking script.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Script,
}

impl TxOut {
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        TxOut { value, script_pubkey }
    }
}

impl Encodable for TxOut {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.value.consensus_encode(writer)?;
        written += self.script_pubkey.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for TxOut {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(TxOut {
            value: u64::consensus_decode(reader)?,
            script_pubkey: Script::consensus_decode(reader)?,
        })
    }
}

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

/// An immutable Bitcoin transaction.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: i32,
    pub lock_time: u32,
    pub input: Vec<TxIn>,
    pub output: Vec<TxOut>,
}

impl Transaction {
    /// Whether any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.input.iter().any(|input| !input.witness.is_empty())
    }

    /// The transaction id: double-SHA256 of the legacy serialization, in
    /// wire byte order. Witness data never affects the txid.
    pub fn txid(&self) -> Hash256 {
        // Legacy encoding is infallible for in-memory data.
        sha256d(&self.consensus_encode_legacy().expect("encoding to Vec cannot fail"))
    }

    /// The witness transaction id: double-SHA256 of the full serialization.
    /// Equal to [`Transaction::txid`] for transactions without witness data.
    pub fn wtxid(&self) -> Hash256 {
        sha256d(&self.consensus_encode_to_vec().expect("encoding to Vec cannot fail"))
    }

    /// Serialize without the marker, flag, and witness stacks, regardless of
    /// whether witness data is present. This is the form hashed for the txid
    /// and for the legacy signature hash.
    pub fn consensus_encode_legacy(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.version.consensus_encode(&mut buf)?;
        encode_inputs(&self.input, &mut buf)?;
        encode_outputs(&self.output, &mut buf)?;
        self.lock_time.consensus_encode(&mut buf)?;
        Ok(buf)
    }

    /// Turn this transaction into a builder holding owned copies of its
    /// parts.
    pub fn into_builder(self) -> TransactionBuilder {
        TransactionBuilder {
            version: self.version,
            lock_time: self.lock_time,
            inputs: self.input,
            outputs: self.output,
        }
    }
}

fn encode_inputs<W: Write>(inputs: &[TxIn], writer: &mut W) -> Result<usize> {
    let mut written = write_varint(writer, inputs.len() as u64)?;
    for input in inputs {
        written += input.consensus_encode(writer)?;
    }
    Ok(written)
}

fn encode_outputs<W: Write>(outputs: &[TxOut], writer: &mut W) -> Result<usize> {
    let mut written = write_varint(writer, outputs.len() as u64)?;
    for output in outputs {
        written += output.consensus_encode(writer)?;
    }
    Ok(written)
}

impl Encodable for Transaction {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = self.version.consensus_encode(writer)?;

        if self.has_witness() {
            written += writer.write(&[SEGWIT_MARKER, SEGWIT_FLAG])?;
            written += encode_inputs(&self.input, writer)?;
            written += encode_outputs(&self.output, writer)?;
            for input in &self.input {
                written += input.witness.consensus_encode(writer)?;
            }
        } else {
            written += encode_inputs(&self.input, writer)?;
            written += encode_outputs(&self.output, writer)?;
        }

        written += self.lock_time.consensus_encode(writer)?;
        Ok(written)
    }
}

impl Decodable for Transaction {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let version = i32::consensus_decode(reader)?;

        // A legacy transaction's input count can never be zero, so a zero
        // byte here is the segwit marker.
        let mut first = [0u8; 1];
        reader.read_exact(&mut first)?;

        let (input_count, segwit) = if first[0] == SEGWIT_MARKER {
            let mut flag = [0u8; 1];
            reader.read_exact(&mut flag)?;
            if flag[0] != SEGWIT_FLAG {
                return Err(crate::SignerError::InvalidInput(format!(
                    "Unknown segwit flag 0x{:02x}",
                    flag[0]
                )));
            }
            (read_varint(reader)?, true)
        } else {
            (read_varint_with_prefix(first[0], reader)?, false)
        };

        let mut input = Vec::with_capacity(input_count.min(1024) as usize);
        for _ in 0..input_count {
            input.push(TxIn::consensus_decode(reader)?);
        }

        let output_count = read_varint(reader)?;
        let mut output = Vec::with_capacity(output_count.min(1024) as usize);
        for _ in 0..output_count {
            output.push(TxOut::consensus_decode(reader)?);
        }

        if segwit {
            for item in input.iter_mut() {
                item.witness = Vec::<Vec<u8>>::consensus_decode(reader)?;
            }
        }

        let lock_time = u32::consensus_decode(reader)?;

        Ok(Transaction {
            version,
            lock_time,
            input,
            output,
        })
    }
}

// Finish reading a varint whose first byte was already consumed.
fn read_varint_with_prefix<R: Read>(prefix: u8, reader: &mut R) -> Result<u64> {
    match prefix {
        0xfd => {
            let mut buf = [0u8; 2];
            reader.read_exact(&mut buf)?;
            Ok(u16::from_le_bytes(buf) as u64)
        }
        0xfe => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            Ok(u32::from_le_bytes(buf) as u64)
        }
        0xff => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf)?;
            Ok(u64::from_le_bytes(buf))
        }
        n => Ok(n as u64),
    }
}

/// Mutable builder producing immutable [`Transaction`] values.
///
/// Holds owned copies of inputs and outputs; [`TransactionBuilder::done`]
/// performs a single consuming transformation, so "the transaction being
/// signed" can never alias "the transaction already produced".
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    version: i32,
    lock_time: u32,
    inputs: Vec<TxIn>,
    outputs: Vec<TxOut>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        TransactionBuilder {
            version: 2,
            lock_time: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn lock_time(mut self, lock_time: u32) -> Self {
        self.lock_time = lock_time;
        self
    }

    pub fn add_input(mut self, input: TxIn) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output(mut self, output: TxOut) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Replace the unlocking script of input `index`.
    pub fn set_input_script(&mut self, index: usize, script_sig: Script) -> Result<()> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            crate::SignerError::InvalidInput(format!("Input index {} out of range", index))
        })?;
        input.script_sig = script_sig;
        Ok(())
    }

    /// Replace the witness stack of input `index`.
    pub fn set_input_witness(&mut self, index: usize, witness: Vec<Vec<u8>>) -> Result<()> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            crate::SignerError::InvalidInput(format!("Input index {} out of range", index))
        })?;
        input.witness = witness;
        Ok(())
    }

    /// Replace the sequence number of input `index`.
    pub fn set_input_sequence(&mut self, index: usize, sequence: u32) -> Result<()> {
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            crate::SignerError::InvalidInput(format!("Input index {} out of range", index))
        })?;
        input.sequence = sequence;
        Ok(())
    }

    /// Consume the builder into an immutable transaction.
    pub fn done(self) -> Transaction {
        Transaction {
            version: self.version,
            lock_time: self.lock_time,
            input: self.inputs,
            output: self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The unsigned transaction from the BIP143 native-P2WPKH example.
    const BIP143_UNSIGNED_TX: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";

    fn bip143_unsigned_tx() -> Transaction {
        let mut txid0 = [0u8; 32];
        txid0.copy_from_slice(
            &hex::decode("fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f")
                .unwrap(),
        );
        let mut txid1 = [0u8; 32];
        txid1.copy_from_slice(
            &hex::decode("ef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a")
                .unwrap(),
        );

        let mut input0 = TxIn::new(OutPoint::new(txid0, 0));
        input0.sequence = 0xffffffee;
        let input1 = TxIn::new(OutPoint::new(txid1, 1));

        TransactionBuilder::new()
            .version(1)
            .lock_time(17)
            .add_input(input0)
            .add_input(input1)
            .add_output(TxOut::new(
                112_340_000,
                Script::from_hex("76a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac").unwrap(),
            ))
            .add_output(TxOut::new(
                223_450_000,
                Script::from_hex("76a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac").unwrap(),
            ))
            .done()
    }

    #[test]
    fn test_encode_matches_reference_bytes() {
        let tx = bip143_unsigned_tx();
        assert_eq!(
            hex::encode(tx.consensus_encode_to_vec().unwrap()),
            BIP143_UNSIGNED_TX
        );
    }

    #[test]
    fn test_decode_matches_builder() {
        let bytes = hex::decode(BIP143_UNSIGNED_TX).unwrap();
        let decoded = Transaction::consensus_decode_from_slice(&bytes).unwrap();
        assert_eq!(decoded, bip143_unsigned_tx());
    }

    #[test]
    fn test_witness_roundtrip() {
        let mut tx = bip143_unsigned_tx();
        tx.input[1].witness = vec![vec![0xaa; 71], vec![0x02; 33]];
        assert!(tx.has_witness());

        let bytes = tx.consensus_encode_to_vec().unwrap();
        // marker + flag directly after the version
        assert_eq!(&bytes[4..6], &[0x00, 0x01]);

        let decoded = Transaction::consensus_decode_from_slice(&bytes).unwrap();
        assert_eq!(decoded, tx);

        // txid ignores the witness, wtxid commits to it
        assert_eq!(tx.txid(), bip143_unsigned_tx().txid());
        assert_ne!(tx.wtxid(), tx.txid());
    }

    #[test]
    fn test_legacy_encoding_has_no_marker() {
        let tx = bip143_unsigned_tx();
        assert!(!tx.has_witness());
        assert_eq!(
            tx.consensus_encode_to_vec().unwrap(),
            tx.consensus_encode_legacy().unwrap()
        );
    }

    #[test]
    fn test_builder_produces_fresh_value() {
        let tx = bip143_unsigned_tx();
        let mut builder = tx.clone().into_builder();
        builder
            .set_input_script(0, Script::from_bytes(vec![0x51]))
            .unwrap();
        let rebuilt = builder.done();

        assert_eq!(rebuilt.input[0].script_sig.as_bytes(), &[0x51]);
        assert!(tx.input[0].script_sig.is_empty());
        assert!(builder_err_out_of_range(&tx));
    }

    fn builder_err_out_of_range(tx: &Transaction) -> bool {
        let mut builder = tx.clone().into_builder();
        builder.set_input_script(99, Script::new()).is_err()
    }
}
