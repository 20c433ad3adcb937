//! Transaction signing: per-input signature collection and scriptSig/witness
//! assembly, with support for P2SH and segwit redemption layers.
//!
//! The entry point is [`Signer`], which owns the draft transaction and one
//! lazily-created [`InputSigner`] per input. Each [`InputSigner`] resolves
//! the spent output's script chain (locking script, optional redeem script,
//! optional witness script), accumulates signatures keyed by public key, and
//! serializes the final unlocking data. [`Signer::get`] applies every
//! input's serialized signatures to a fresh immutable [`Transaction`].

use crate::primitives::hash::{hash160, sha256, Hash256};
use crate::primitives::script::{Script, ScriptType, MAX_PUSH_SIZE};
use crate::primitives::transaction::{Transaction, TxOut};
use crate::sighash::{legacy_signature_hash, segwit_signature_hash, SigHashType};
use crate::{Result, SignerError};
use log::debug;
use secp256k1::ecdsa::Signature;
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::collections::HashMap;

/// Caller-supplied redemption hints for one input: the redeem script for a
/// P2SH layer, the witness script for a P2WSH layer, and optionally the
/// spent amount when it differs from (or should override) the spent output's
/// own value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignData {
    redeem_script: Option<Script>,
    witness_script: Option<Script>,
    amount: Option<u64>,
}

impl SignData {
    pub fn new() -> Self {
        SignData::default()
    }

    /// Attach the redeem script committed to by a P2SH locking script.
    pub fn p2sh(mut self, redeem_script: Script) -> Self {
        self.redeem_script = Some(redeem_script);
        self
    }

    /// Attach the witness script committed to by a P2WSH program.
    pub fn p2wsh(mut self, witness_script: Script) -> Self {
        self.witness_script = Some(witness_script);
        self
    }

    /// Set the explicit spent amount used for the witness signature hash.
    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn redeem_script(&self) -> Option<&Script> {
        self.redeem_script.as_ref()
    }

    pub fn witness_script(&self) -> Option<&Script> {
        self.witness_script.as_ref()
    }

    pub fn spent_amount(&self) -> Option<u64> {
        self.amount
    }
}

/// Signing progress of one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignState {
    /// The locking script (or its inner script) matches no known template.
    Unclassified,
    /// The script chain resolved; no signatures collected yet.
    Classified,
    /// At least one signature collected, fewer than the template requires.
    PartiallySigned,
    /// All required signatures collected.
    FullySigned,
}

/// A recorded signature: the DER signature, the sighash type it was made
/// with, and the serialized public-key form that matched the template.
#[derive(Debug, Clone)]
struct InputSignature {
    signature: Signature,
    sighash_type: SigHashType,
    pubkey_bytes: Vec<u8>,
}

impl InputSignature {
    /// DER encoding with the 1-byte sighash type appended: the element
    /// pushed into scriptSigs and witness stacks.
    fn to_element(&self) -> Vec<u8> {
        let mut element = self.signature.serialize_der().to_vec();
        element.push(self.sighash_type.as_u8());
        element
    }
}

/// The resolved script chain of a spent output: which layers wrap the
/// template being satisfied and which script feeds the signature hash.
#[derive(Debug, Clone)]
struct ScriptChain {
    /// Template of the locking script itself.
    outer: ScriptType,
    /// Redeem script, when the locking script is P2SH.
    redeem_script: Option<Script>,
    /// Witness script, when a layer is P2WSH.
    witness_script: Option<Script>,
    /// The template actually being satisfied after unwrapping.
    signed_template: ScriptType,
    /// The script serialized into the signature hash.
    script_code: Script,
    /// Whether the BIP143 algorithm applies and elements go to the witness.
    segwit: bool,
}

fn resolve_chain(txout: &TxOut, sign_data: &SignData) -> Result<Option<ScriptChain>> {
    let outer = txout.script_pubkey.classify();

    let mut layer_script = txout.script_pubkey.clone();
    let mut layer_type = outer;
    let mut redeem_script = None;

    if layer_type == ScriptType::ScriptHash {
        let redeem = sign_data.redeem_script().ok_or_else(|| {
            SignerError::UnsignableScript("P2SH output requires a redeem script".to_string())
        })?;
        redeem.validate()?;
        if redeem.len() > MAX_PUSH_SIZE {
            return Err(SignerError::InvalidInput(
                "Redeem script exceeds the 520-byte push limit".to_string(),
            ));
        }
        let commitment = layer_script.extract_hash160().expect("P2SH script has a hash");
        if hash160(redeem.as_bytes()) != commitment {
            return Err(SignerError::ScriptMismatch(
                "Redeem script does not hash to the P2SH commitment".to_string(),
            ));
        }
        layer_type = redeem.classify();
        if layer_type == ScriptType::ScriptHash {
            return Err(SignerError::UnsignableScript(
                "Redeem script must not be P2SH itself".to_string(),
            ));
        }
        layer_script = redeem.clone();
        redeem_script = Some(redeem.clone());
    }

    let chain = match layer_type {
        ScriptType::WitnessPubKeyHash => {
            // BIP143: the script code of a P2WPKH input is the P2PKH script
            // of the same key hash.
            let hash = layer_script.extract_hash160().expect("P2WPKH script has a hash");
            ScriptChain {
                outer,
                redeem_script,
                witness_script: None,
                signed_template: ScriptType::WitnessPubKeyHash,
                script_code: Script::new_p2pkh(&hash),
                segwit: true,
            }
        }
        ScriptType::WitnessScriptHash => {
            let witness = sign_data.witness_script().ok_or_else(|| {
                SignerError::UnsignableScript(
                    "P2WSH output requires a witness script".to_string(),
                )
            })?;
            witness.validate()?;
            let commitment = layer_script.extract_hash256().expect("P2WSH script has a hash");
            if sha256(witness.as_bytes()) != commitment {
                return Err(SignerError::ScriptMismatch(
                    "Witness script does not hash to the P2WSH commitment".to_string(),
                ));
            }
            let inner = witness.classify();
            match inner {
                ScriptType::ScriptHash
                | ScriptType::WitnessScriptHash
                | ScriptType::WitnessPubKeyHash => {
                    return Err(SignerError::UnsignableScript(
                        "Witness script must not be a script-hash or witness template"
                            .to_string(),
                    ))
                }
                ScriptType::NonStandard => return Ok(None),
                _ => {}
            }
            ScriptChain {
                outer,
                redeem_script,
                witness_script: Some(witness.clone()),
                signed_template: inner,
                script_code: witness.clone(),
                segwit: true,
            }
        }
        ScriptType::NonStandard => return Ok(None),
        template => ScriptChain {
            outer,
            redeem_script,
            witness_script: None,
            signed_template: template,
            script_code: layer_script,
            segwit: false,
        },
    };

    Ok(Some(chain))
}

/// Per-input signing state machine.
///
/// Holds the spent output, the caller's [`SignData`], the resolved script
/// chain, and the signatures collected so far. Not safe for concurrent
/// mutation; distinct inputs' signers share no mutable state and may be
/// driven from different threads.
pub struct InputSigner {
    secp: Secp256k1<All>,
    tx: Transaction,
    input_index: usize,
    txout: TxOut,
    sign_data: SignData,
    chain: Option<ScriptChain>,
    signatures: HashMap<PublicKey, InputSignature>,
}

impl InputSigner {
    /// Resolve the script chain for `input_index` of `tx` spending `txout`.
    ///
    /// Fails with [`SignerError::ScriptMismatch`] if a supplied redeem or
    /// witness script does not hash to the locking script's commitment, and
    /// with [`SignerError::UnsignableScript`] if a required script is
    /// missing or a layer is structurally unusable. An unrecognized template
    /// is not an error here; the signer stays [`SignState::Unclassified`]
    /// and signing fails later.
    pub fn new(
        tx: Transaction,
        input_index: usize,
        txout: TxOut,
        sign_data: SignData,
    ) -> Result<InputSigner> {
        if input_index >= tx.input.len() {
            return Err(SignerError::InvalidInput(format!(
                "Input index {} out of range (tx has {} inputs)",
                input_index,
                tx.input.len()
            )));
        }

        let chain = resolve_chain(&txout, &sign_data)?;

        Ok(InputSigner {
            secp: Secp256k1::new(),
            tx,
            input_index,
            txout,
            sign_data,
            chain,
            signatures: HashMap::new(),
        })
    }

    /// Current signing state.
    pub fn state(&self) -> SignState {
        if self.chain.is_none() {
            return SignState::Unclassified;
        }
        if self.signatures.is_empty() {
            SignState::Classified
        } else if self.signatures.len() < self.required_signatures() {
            SignState::PartiallySigned
        } else {
            SignState::FullySigned
        }
    }

    /// The template being satisfied after unwrapping redemption layers, if
    /// the chain resolved.
    pub fn script_type(&self) -> Option<ScriptType> {
        self.chain.as_ref().map(|chain| chain.signed_template)
    }

    /// The locking script's own template, if the chain resolved.
    pub fn output_script_type(&self) -> Option<ScriptType> {
        self.chain.as_ref().map(|chain| chain.outer)
    }

    /// Number of signatures the template requires.
    pub fn required_signatures(&self) -> usize {
        match self.chain.as_ref().map(|chain| chain.signed_template) {
            Some(ScriptType::Multisig { required, .. }) => required as usize,
            Some(_) => 1,
            None => 0,
        }
    }

    /// Number of distinct signatures collected so far.
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    /// The signature-hash digest this input signs for the given type.
    pub fn signature_hash(&self, sighash_type: SigHashType) -> Result<Hash256> {
        let chain = self.chain.as_ref().ok_or_else(|| {
            SignerError::UnsignableScript("Script template not recognized".to_string())
        })?;

        if chain.segwit {
            let amount = self.sign_data.spent_amount().unwrap_or(self.txout.value);
            segwit_signature_hash(
                &self.tx,
                self.input_index,
                &chain.script_code,
                Some(amount),
                sighash_type,
            )
        } else {
            legacy_signature_hash(&self.tx, self.input_index, &chain.script_code, sighash_type)
        }
    }

    /// Sign this input with `private_key` and record the signature.
    ///
    /// The key must belong to the resolved template; the produced signature
    /// is verified against the digest before it is recorded.
    pub fn sign(&mut self, private_key: &SecretKey, sighash_type: SigHashType) -> Result<()> {
        let public_key = PublicKey::from_secret_key(&self.secp, private_key);
        let digest = self.signature_hash(sighash_type)?;

        let message = Message::from_digest_slice(&digest)?;
        let signature = self.secp.sign_ecdsa(&message, private_key);

        self.record(public_key, signature, sighash_type, &message)
    }

    /// Record an externally produced signature, e.g. from another party in
    /// a multisig session. Verified against the digest before acceptance.
    pub fn add_signature(
        &mut self,
        public_key: PublicKey,
        signature: Signature,
        sighash_type: SigHashType,
    ) -> Result<()> {
        let digest = self.signature_hash(sighash_type)?;
        let message = Message::from_digest_slice(&digest)?;
        self.record(public_key, signature, sighash_type, &message)
    }

    fn record(
        &mut self,
        public_key: PublicKey,
        signature: Signature,
        sighash_type: SigHashType,
        message: &Message,
    ) -> Result<()> {
        let chain = self.chain.as_ref().ok_or_else(|| {
            SignerError::UnsignableScript("Script template not recognized".to_string())
        })?;

        let pubkey_bytes = template_key_bytes(chain, &public_key).ok_or_else(|| {
            SignerError::UnsignableScript(format!(
                "Key {} does not belong to the script template",
                hex::encode(public_key.serialize())
            ))
        })?;

        if self.signatures.contains_key(&public_key) {
            return Err(SignerError::DuplicateSignature(hex::encode(
                public_key.serialize(),
            )));
        }

        if self.secp.verify_ecdsa(message, &signature, &public_key).is_err() {
            return Err(SignerError::InvalidInput(
                "Signature does not verify against the signature hash".to_string(),
            ));
        }

        debug!(
            "input {}: recorded signature {}/{} for key {}",
            self.input_index,
            self.signatures.len() + 1,
            self.required_signatures(),
            hex::encode(&pubkey_bytes)
        );

        self.signatures.insert(
            public_key,
            InputSignature {
                signature,
                sighash_type,
                pubkey_bytes,
            },
        );
        Ok(())
    }

    /// Assemble the final scriptSig and witness stack for this input.
    ///
    /// Multisig signatures are emitted in locking-script public-key order
    /// regardless of signing order. An in-progress multisig session emits
    /// exactly `required` signature slots: collected signatures plus
    /// zero-length placeholders filling the earliest unmatched key
    /// positions. The CHECKMULTISIG dummy element always leads, and the
    /// redeem/witness script trails its respective sequence.
    pub fn serialize_signatures(&self) -> Result<(Script, Vec<Vec<u8>>)> {
        if self.state() < SignState::PartiallySigned {
            return Err(SignerError::UnsignableScript(
                "No signatures collected for this input".to_string(),
            ));
        }
        let chain = self.chain.as_ref().expect("state is PartiallySigned or later");

        let elements: Vec<Vec<u8>> = match chain.signed_template {
            ScriptType::PubKey => {
                let recorded = self.signatures.values().next().expect("one signature");
                vec![recorded.to_element()]
            }
            ScriptType::PubKeyHash | ScriptType::WitnessPubKeyHash => {
                let recorded = self.signatures.values().next().expect("one signature");
                vec![recorded.to_element(), recorded.pubkey_bytes.clone()]
            }
            ScriptType::Multisig { required, .. } => {
                let (_, keys) = chain
                    .script_code
                    .extract_multisig()
                    .expect("chain resolved to multisig");
                let collected: HashMap<&[u8], Vec<u8>> = self
                    .signatures
                    .values()
                    .map(|recorded| (recorded.pubkey_bytes.as_slice(), recorded.to_element()))
                    .collect();

                let required = required as usize;
                let matched = keys
                    .iter()
                    .filter(|key| collected.contains_key(key.as_slice()))
                    .count();
                let mut placeholders_left = required.saturating_sub(matched);

                // Leading dummy consumed by CHECKMULTISIG's off-by-one.
                let mut elements = vec![Vec::new()];
                let mut emitted = 0;
                for key in &keys {
                    if emitted == required {
                        break;
                    }
                    if let Some(element) = collected.get(key.as_slice()) {
                        elements.push(element.clone());
                        emitted += 1;
                    } else if placeholders_left > 0 {
                        elements.push(Vec::new());
                        placeholders_left -= 1;
                        emitted += 1;
                    }
                }
                elements
            }
            ScriptType::ScriptHash
            | ScriptType::WitnessScriptHash
            | ScriptType::NonStandard => {
                return Err(SignerError::UnsignableScript(
                    "Script template cannot be satisfied directly".to_string(),
                ))
            }
        };

        if chain.segwit {
            let mut witness = elements;
            if let Some(witness_script) = &chain.witness_script {
                witness.push(witness_script.as_bytes().to_vec());
            }
            let mut script_sig = Script::new();
            if let Some(redeem_script) = &chain.redeem_script {
                script_sig.push_data(redeem_script.as_bytes());
            }
            Ok((script_sig, witness))
        } else {
            let mut script_sig = Script::new();
            for element in &elements {
                script_sig.push_data(element);
            }
            if let Some(redeem_script) = &chain.redeem_script {
                script_sig.push_data(redeem_script.as_bytes());
            }
            Ok((script_sig, Vec::new()))
        }
    }

    fn matches_context(&self, txout: &TxOut, sign_data: &SignData) -> bool {
        self.txout == *txout && self.sign_data == *sign_data
    }
}

/// The serialized public-key form matching the template, if the key belongs
/// to it at all. P2PKH accepts both compressed and uncompressed forms;
/// witness templates accept only the compressed form.
fn template_key_bytes(chain: &ScriptChain, public_key: &PublicKey) -> Option<Vec<u8>> {
    let compressed = public_key.serialize().to_vec();
    let uncompressed = public_key.serialize_uncompressed().to_vec();

    match chain.signed_template {
        ScriptType::PubKey => {
            let template_key = chain.script_code.extract_pubkey()?;
            if template_key == compressed.as_slice() || template_key == uncompressed.as_slice() {
                Some(template_key.to_vec())
            } else {
                None
            }
        }
        ScriptType::PubKeyHash => {
            let hash = chain.script_code.extract_hash160()?;
            if hash160(&compressed) == hash {
                Some(compressed)
            } else if hash160(&uncompressed) == hash {
                Some(uncompressed)
            } else {
                None
            }
        }
        ScriptType::WitnessPubKeyHash => {
            // script_code is the derived P2PKH script of the program hash.
            let hash = chain.script_code.extract_hash160()?;
            if hash160(&compressed) == hash {
                Some(compressed)
            } else {
                None
            }
        }
        ScriptType::Multisig { .. } => {
            let (_, keys) = chain.script_code.extract_multisig()?;
            keys.into_iter()
                .find(|key| key == &compressed || key == &uncompressed)
        }
        _ => None,
    }
}

/// Orchestrates signing of a whole transaction.
///
/// Owns the draft transaction and a fixed-size table of per-input signers,
/// created lazily on first use. [`Signer::get`] rebuilds an immutable
/// transaction with every input's serialized signatures applied.
pub struct Signer {
    tx: Transaction,
    signers: Vec<Option<InputSigner>>,
}

impl Signer {
    pub fn new(tx: Transaction) -> Self {
        let input_count = tx.input.len();
        Signer {
            tx,
            signers: (0..input_count).map(|_| None).collect(),
        }
    }

    /// The base transaction being signed.
    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    /// Sign input `input_index`, which spends `txout`, with `private_key`.
    ///
    /// `redeem_script` and `witness_script` supply the redemption layers for
    /// P2SH and P2WSH outputs respectively.
    pub fn sign(
        &mut self,
        input_index: usize,
        private_key: &SecretKey,
        txout: TxOut,
        redeem_script: Option<Script>,
        witness_script: Option<Script>,
        sighash_type: SigHashType,
    ) -> Result<()> {
        let mut sign_data = SignData::new();
        if let Some(redeem_script) = redeem_script {
            sign_data = sign_data.p2sh(redeem_script);
        }
        if let Some(witness_script) = witness_script {
            sign_data = sign_data.p2wsh(witness_script);
        }

        self.signer(input_index, txout, sign_data)?
            .sign(private_key, sighash_type)
    }

    /// Get or lazily create the [`InputSigner`] for `input_index`.
    ///
    /// The first call fixes the input's spend context; a later call with a
    /// different `txout` or `sign_data` fails with
    /// [`SignerError::InputContextConflict`].
    pub fn signer(
        &mut self,
        input_index: usize,
        txout: TxOut,
        sign_data: SignData,
    ) -> Result<&mut InputSigner> {
        if input_index >= self.signers.len() {
            return Err(SignerError::InvalidInput(format!(
                "Input index {} out of range (tx has {} inputs)",
                input_index,
                self.signers.len()
            )));
        }

        match &self.signers[input_index] {
            Some(existing) => {
                if !existing.matches_context(&txout, &sign_data) {
                    return Err(SignerError::InputContextConflict(input_index));
                }
            }
            None => {
                let input_signer =
                    InputSigner::new(self.tx.clone(), input_index, txout, sign_data)?;
                self.signers[input_index] = Some(input_signer);
            }
        }

        Ok(self.signers[input_index]
            .as_mut()
            .expect("slot populated above"))
    }

    /// Build the final immutable transaction with all collected signatures
    /// applied.
    ///
    /// Inputs that were never touched, or that have no signatures yet, get
    /// an empty scriptSig and no witness. Idempotent: repeated calls without
    /// intervening `sign` calls return byte-identical transactions. Never
    /// fails on its own account; every signing failure has already surfaced
    /// at `sign`/`signer` time.
    pub fn get(&self) -> Result<Transaction> {
        let mut builder = self.tx.clone().into_builder();

        for (input_index, slot) in self.signers.iter().enumerate() {
            let (script_sig, witness) = match slot {
                Some(input_signer) if input_signer.state() >= SignState::PartiallySigned => {
                    input_signer.serialize_signatures()?
                }
                _ => (Script::new(), Vec::new()),
            };
            builder.set_input_script(input_index, script_sig)?;
            builder.set_input_witness(input_index, witness)?;
        }

        Ok(builder.done())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::transaction::{OutPoint, TransactionBuilder, TxIn};

    fn secp() -> Secp256k1<All> {
        Secp256k1::new()
    }

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn pubkey(private_key: &SecretKey) -> PublicKey {
        PublicKey::from_secret_key(&secp(), private_key)
    }

    fn one_input_tx() -> Transaction {
        TransactionBuilder::new()
            .version(2)
            .add_input(TxIn::new(OutPoint::new([0x11; 32], 0)))
            .add_output(TxOut::new(49_000, Script::new_p2pkh(&[0x42; 20])))
            .done()
    }

    #[test]
    fn test_sign_data_builders() {
        let redeem = Script::new_p2pkh(&[0x01; 20]);
        let data = SignData::new().p2sh(redeem.clone()).amount(1234);
        assert_eq!(data.redeem_script(), Some(&redeem));
        assert_eq!(data.witness_script(), None);
        assert_eq!(data.spent_amount(), Some(1234));
    }

    #[test]
    fn test_nonstandard_output_is_unclassified() {
        let txout = TxOut::new(1000, Script::from_bytes(vec![0x6a, 0x01, 0xff]));
        let signer = InputSigner::new(one_input_tx(), 0, txout, SignData::new()).unwrap();
        assert_eq!(signer.state(), SignState::Unclassified);
        assert!(matches!(
            signer.serialize_signatures(),
            Err(SignerError::UnsignableScript(_))
        ));
    }

    #[test]
    fn test_p2sh_without_redeem_script_fails() {
        let txout = TxOut::new(1000, Script::new_p2sh(&[0x33; 20]));
        let result = InputSigner::new(one_input_tx(), 0, txout, SignData::new());
        assert!(matches!(result, Err(SignerError::UnsignableScript(_))));
    }

    #[test]
    fn test_p2sh_redeem_mismatch_is_fatal() {
        let redeem = Script::new_p2pkh(&hash160(&pubkey(&key(1)).serialize()));
        let txout = TxOut::new(1000, Script::new_p2sh(&[0x33; 20]));
        let result =
            InputSigner::new(one_input_tx(), 0, txout, SignData::new().p2sh(redeem));
        assert!(matches!(result, Err(SignerError::ScriptMismatch(_))));
    }

    #[test]
    fn test_wrong_key_is_unsignable() {
        let lock = Script::new_p2pkh(&hash160(&pubkey(&key(1)).serialize()));
        let txout = TxOut::new(1000, lock);
        let mut signer = InputSigner::new(one_input_tx(), 0, txout, SignData::new()).unwrap();
        let result = signer.sign(&key(2), SigHashType::All);
        assert!(matches!(result, Err(SignerError::UnsignableScript(_))));
        assert_eq!(signer.state(), SignState::Classified);
    }

    #[test]
    fn test_duplicate_signature_is_rejected() {
        let keys: Vec<Vec<u8>> = (1u8..=3)
            .map(|i| pubkey(&key(i)).serialize().to_vec())
            .collect();
        let multisig = Script::new_multisig(2, &keys).unwrap();
        let txout = TxOut::new(1000, multisig);
        let mut signer = InputSigner::new(one_input_tx(), 0, txout, SignData::new()).unwrap();

        signer.sign(&key(1), SigHashType::All).unwrap();
        let result = signer.sign(&key(1), SigHashType::All);
        assert!(matches!(result, Err(SignerError::DuplicateSignature(_))));
        assert_eq!(signer.signature_count(), 1);
    }

    #[test]
    fn test_add_external_signature() {
        let private_key = key(7);
        let lock = Script::new_p2pkh(&hash160(&pubkey(&private_key).serialize()));
        let txout = TxOut::new(1000, lock);
        let mut signer =
            InputSigner::new(one_input_tx(), 0, txout, SignData::new()).unwrap();

        // A signature produced elsewhere over the same digest.
        let digest = signer.signature_hash(SigHashType::All).unwrap();
        let message = Message::from_digest_slice(&digest).unwrap();
        let signature = secp().sign_ecdsa(&message, &private_key);

        signer
            .add_signature(pubkey(&private_key), signature, SigHashType::All)
            .unwrap();
        assert_eq!(signer.state(), SignState::FullySigned);
    }

    #[test]
    fn test_add_signature_rejects_wrong_digest() {
        let private_key = key(7);
        let lock = Script::new_p2pkh(&hash160(&pubkey(&private_key).serialize()));
        let txout = TxOut::new(1000, lock);
        let mut signer =
            InputSigner::new(one_input_tx(), 0, txout, SignData::new()).unwrap();

        // Signed the wrong message: must not be recorded.
        let message = Message::from_digest_slice(&[0x99; 32]).unwrap();
        let signature = secp().sign_ecdsa(&message, &private_key);

        let result = signer.add_signature(pubkey(&private_key), signature, SigHashType::All);
        assert!(matches!(result, Err(SignerError::InvalidInput(_))));
        assert_eq!(signer.state(), SignState::Classified);
    }

    #[test]
    fn test_signer_context_conflict() {
        let private_key = key(1);
        let lock = Script::new_p2pkh(&hash160(&pubkey(&private_key).serialize()));
        let mut signer = Signer::new(one_input_tx());

        signer
            .sign(
                0,
                &private_key,
                TxOut::new(1000, lock.clone()),
                None,
                None,
                SigHashType::All,
            )
            .unwrap();

        let result = signer.signer(0, TxOut::new(2000, lock), SignData::new());
        assert!(matches!(result, Err(SignerError::InputContextConflict(0))));
    }

    #[test]
    fn test_signer_index_out_of_range() {
        let mut signer = Signer::new(one_input_tx());
        let result = signer.signer(5, TxOut::new(1, Script::new()), SignData::new());
        assert!(matches!(result, Err(SignerError::InvalidInput(_))));
    }
}
