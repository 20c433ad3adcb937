//! Bitcoin script parsing, classification, and construction.

use super::encode::{read_varint, write_varint, Decodable, Encodable};
use super::hash::{Hash160, Hash256};
use super::opcodes::{self, *};
use crate::{Result, SignerError};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Maximum script size accepted anywhere (consensus limit).
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum size of a single pushed element (consensus limit). A P2SH redeem
/// script is pushed as one element, so it is bounded by this too.
pub const MAX_PUSH_SIZE: usize = 520;

/// A single parsed script instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Push data onto the stack.
    PushBytes(Vec<u8>),
    /// Execute an opcode.
    Op(u8),
}

/// The spending template a locking script matches.
///
/// Classification is derived, never stored: it is recomputed from the script
/// bytes wherever it is needed, and every consumer matches exhaustively so a
/// new template cannot be silently mishandled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptType {
    /// `<pubkey> OP_CHECKSIG`
    PubKey,
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    PubKeyHash,
    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    ScriptHash,
    /// Version-0 witness program with a 20-byte payload.
    WitnessPubKeyHash,
    /// Version-0 witness program with a 32-byte payload.
    WitnessScriptHash,
    /// `OP_m <pubkeys...> OP_n OP_CHECKMULTISIG`
    Multisig { required: u8, total: u8 },
    /// Anything not matching a recognized template.
    NonStandard,
}

/// An immutable sequence of opcodes and data pushes.
///
/// A `Script` has no embedded semantics; see [`Script::classify`] for the
/// derived template classification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Script(pub Vec<u8>);

impl Script {
    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }

    /// Parse a script from a hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Script(hex::decode(s)?))
    }

    /// The raw script bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex encoding of the raw script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append an opcode.
    pub fn push_opcode(&mut self, opcode: u8) {
        self.0.push(opcode);
    }

    /// Append a data push with the smallest pushdata encoding for its length.
    /// An empty element is pushed as `OP_0`.
    pub fn push_data(&mut self, data: &[u8]) {
        match data.len() {
            0 => self.0.push(OP_0),
            n if n <= MAX_DIRECT_PUSH as usize => self.0.push(n as u8),
            n if n <= 0xff => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(n as u8);
            }
            n if n <= 0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(n as u16).to_le_bytes());
            }
            n => {
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&(n as u32).to_le_bytes());
            }
        }
        self.0.extend_from_slice(data);
    }

    /// Parse the script into instructions. Fails on a truncated push.
    pub fn instructions(&self) -> Result<Vec<Instruction>> {
        let mut instructions = Vec::new();
        let mut i = 0;

        while i < self.0.len() {
            let opcode = self.0[i];
            i += 1;

            let push_len = match opcode {
                0x01..=MAX_DIRECT_PUSH => Some(opcode as usize),
                OP_PUSHDATA1 => {
                    if i >= self.0.len() {
                        return Err(SignerError::InvalidInput("Script truncated".to_string()));
                    }
                    let len = self.0[i] as usize;
                    i += 1;
                    Some(len)
                }
                OP_PUSHDATA2 => {
                    if i + 1 >= self.0.len() {
                        return Err(SignerError::InvalidInput("Script truncated".to_string()));
                    }
                    let len = u16::from_le_bytes([self.0[i], self.0[i + 1]]) as usize;
                    i += 2;
                    Some(len)
                }
                OP_PUSHDATA4 => {
                    if i + 3 >= self.0.len() {
                        return Err(SignerError::InvalidInput("Script truncated".to_string()));
                    }
                    let len = u32::from_le_bytes([
                        self.0[i],
                        self.0[i + 1],
                        self.0[i + 2],
                        self.0[i + 3],
                    ]) as usize;
                    i += 4;
                    Some(len)
                }
                _ => None,
            };

            match push_len {
                Some(len) => {
                    if i + len > self.0.len() {
                        return Err(SignerError::InvalidInput("Script truncated".to_string()));
                    }
                    instructions.push(Instruction::PushBytes(self.0[i..i + len].to_vec()));
                    i += len;
                }
                None => instructions.push(Instruction::Op(opcode)),
            }
        }

        Ok(instructions)
    }

    /// Check for the P2PKH pattern.
    pub fn is_p2pkh(&self) -> bool {
        self.0.len() == 25
            && self.0[0] == OP_DUP
            && self.0[1] == OP_HASH160
            && self.0[2] == 0x14
            && self.0[23] == OP_EQUALVERIFY
            && self.0[24] == OP_CHECKSIG
    }

    /// Check for the P2SH pattern.
    pub fn is_p2sh(&self) -> bool {
        self.0.len() == 23 && self.0[0] == OP_HASH160 && self.0[1] == 0x14 && self.0[22] == OP_EQUAL
    }

    /// Check for the version-0, 20-byte witness program pattern (P2WPKH).
    pub fn is_p2wpkh(&self) -> bool {
        self.0.len() == 22 && self.0[0] == OP_0 && self.0[1] == 0x14
    }

    /// Check for the version-0, 32-byte witness program pattern (P2WSH).
    pub fn is_p2wsh(&self) -> bool {
        self.0.len() == 34 && self.0[0] == OP_0 && self.0[1] == 0x20
    }

    /// Check for the P2PK pattern: a 33- or 65-byte key push plus OP_CHECKSIG.
    pub fn is_p2pk(&self) -> bool {
        (self.0.len() == 35 && self.0[0] == 33 && self.0[34] == OP_CHECKSIG)
            || (self.0.len() == 67 && self.0[0] == 65 && self.0[66] == OP_CHECKSIG)
    }

    /// Check for an OP_RETURN data output.
    pub fn is_op_return(&self) -> bool {
        !self.0.is_empty() && self.0[0] == OP_RETURN
    }

    /// Classify this locking script into its spending template.
    ///
    /// Total and pure: any script that matches no recognized template yields
    /// [`ScriptType::NonStandard`]. Templates are checked most specific
    /// first, so e.g. a witness program is never misread as bare data pushes.
    pub fn classify(&self) -> ScriptType {
        if self.is_p2wpkh() {
            ScriptType::WitnessPubKeyHash
        } else if self.is_p2wsh() {
            ScriptType::WitnessScriptHash
        } else if self.is_p2sh() {
            ScriptType::ScriptHash
        } else if self.is_p2pkh() {
            ScriptType::PubKeyHash
        } else if self.is_p2pk() {
            ScriptType::PubKey
        } else if let Some((required, keys)) = self.extract_multisig_unchecked() {
            ScriptType::Multisig {
                required,
                total: keys.len() as u8,
            }
        } else {
            ScriptType::NonStandard
        }
    }

    /// Extract the hash160 payload from a P2PKH, P2SH, or P2WPKH script.
    pub fn extract_hash160(&self) -> Option<Hash160> {
        let payload = if self.is_p2pkh() {
            &self.0[3..23]
        } else if self.is_p2sh() {
            &self.0[2..22]
        } else if self.is_p2wpkh() {
            &self.0[2..22]
        } else {
            return None;
        };
        let mut hash = [0u8; 20];
        hash.copy_from_slice(payload);
        Some(hash)
    }

    /// Extract the 32-byte witness-script commitment from a P2WSH script.
    pub fn extract_hash256(&self) -> Option<Hash256> {
        if self.is_p2wsh() {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&self.0[2..34]);
            Some(hash)
        } else {
            None
        }
    }

    /// Extract the serialized public key from a P2PK script.
    pub fn extract_pubkey(&self) -> Option<&[u8]> {
        if self.is_p2pk() {
            Some(&self.0[1..1 + self.0[0] as usize])
        } else {
            None
        }
    }

    /// Extract `(required, pubkeys)` from a bare multisig script.
    pub fn extract_multisig(&self) -> Option<(u8, Vec<Vec<u8>>)> {
        self.extract_multisig_unchecked()
    }

    // Pattern match on instruction shape only; the pushes are not checked to
    // be valid curve points, that surfaces at signing time.
    fn extract_multisig_unchecked(&self) -> Option<(u8, Vec<Vec<u8>>)> {
        let instructions = self.instructions().ok()?;
        if instructions.len() < 4 {
            return None;
        }

        let required = match instructions[0] {
            Instruction::Op(op) => opcodes::small_int_value(op)?,
            _ => return None,
        };
        let total = match instructions[instructions.len() - 2] {
            Instruction::Op(op) => opcodes::small_int_value(op)?,
            _ => return None,
        };
        match instructions[instructions.len() - 1] {
            Instruction::Op(OP_CHECKMULTISIG) => {}
            _ => return None,
        }

        let key_pushes = &instructions[1..instructions.len() - 2];
        if required < 1
            || total < required
            || total > 16
            || key_pushes.len() != total as usize
        {
            return None;
        }

        let mut keys = Vec::with_capacity(key_pushes.len());
        for push in key_pushes {
            match push {
                Instruction::PushBytes(data) if data.len() == 33 || data.len() == 65 => {
                    keys.push(data.clone())
                }
                _ => return None,
            }
        }

        Some((required, keys))
    }

    /// Enforce consensus resource limits: total size and per-push size.
    pub fn validate(&self) -> Result<()> {
        if self.0.len() > MAX_SCRIPT_SIZE {
            return Err(SignerError::InvalidInput("Script too large".to_string()));
        }

        for instruction in self.instructions()? {
            if let Instruction::PushBytes(data) = instruction {
                if data.len() > MAX_PUSH_SIZE {
                    return Err(SignerError::InvalidInput("Push data too large".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Create a P2PKH locking script for the given hash160.
    pub fn new_p2pkh(hash160: &Hash160) -> Self {
        let mut script = Script(Vec::with_capacity(25));
        script.push_opcode(OP_DUP);
        script.push_opcode(OP_HASH160);
        script.push_data(hash160);
        script.push_opcode(OP_EQUALVERIFY);
        script.push_opcode(OP_CHECKSIG);
        script
    }

    /// Create a P2SH locking script for the given script hash.
    pub fn new_p2sh(hash160: &Hash160) -> Self {
        let mut script = Script(Vec::with_capacity(23));
        script.push_opcode(OP_HASH160);
        script.push_data(hash160);
        script.push_opcode(OP_EQUAL);
        script
    }

    /// Create a P2WPKH locking script for the given pubkey hash.
    pub fn new_p2wpkh(hash160: &Hash160) -> Self {
        let mut script = Script(Vec::with_capacity(22));
        script.push_opcode(OP_0);
        script.push_data(hash160);
        script
    }

    /// Create a P2WSH locking script for the given witness-script hash.
    pub fn new_p2wsh(hash256: &Hash256) -> Self {
        let mut script = Script(Vec::with_capacity(34));
        script.push_opcode(OP_0);
        script.push_data(hash256);
        script
    }

    /// Create a P2PK locking script for the given serialized public key.
    pub fn new_p2pk(pubkey: &[u8]) -> Self {
        let mut script = Script(Vec::with_capacity(pubkey.len() + 2));
        script.push_data(pubkey);
        script.push_opcode(OP_CHECKSIG);
        script
    }

    /// Create a bare `required`-of-`pubkeys.len()` multisig locking script.
    pub fn new_multisig(required: u8, pubkeys: &[Vec<u8>]) -> Result<Self> {
        let total = pubkeys.len();
        if required < 1 || total < required as usize || total > 16 {
            return Err(SignerError::InvalidInput(format!(
                "Invalid multisig template: {} of {}",
                required, total
            )));
        }
        for key in pubkeys {
            if key.len() != 33 && key.len() != 65 {
                return Err(SignerError::InvalidInput(
                    "Multisig public keys must be 33 or 65 bytes".to_string(),
                ));
            }
        }

        let mut script = Script::new();
        script.push_opcode(opcodes::small_int_opcode(required).unwrap_or(OP_0));
        for key in pubkeys {
            script.push_data(key);
        }
        script.push_opcode(opcodes::small_int_opcode(total as u8).unwrap_or(OP_0));
        script.push_opcode(OP_CHECKMULTISIG);
        Ok(script)
    }
}

impl Encodable for Script {
    fn consensus_encode<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = write_varint(writer, self.0.len() as u64)?;
        written += writer.write(&self.0)?;
        Ok(written)
    }
}

impl Decodable for Script {
    fn consensus_decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_varint(reader)?;
        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf)?;
        Ok(Script(buf))
    }
}
