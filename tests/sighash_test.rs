//! Signature-hash selection against the BIP143 reference examples.

use secp256k1::{PublicKey, Secp256k1, SecretKey};
use txsign::primitives::encode::Decodable;
use txsign::primitives::hash::hash160;
use txsign::primitives::script::Script;
use txsign::primitives::transaction::{Transaction, TxOut};
use txsign::{SigHashType, SignData, SignState, Signer};

fn tx_from_hex(s: &str) -> Transaction {
    Transaction::consensus_decode_from_slice(&hex::decode(s).unwrap()).unwrap()
}

#[test]
fn test_bip143_native_p2wpkh_digest_through_input_signer() {
    // The unsigned transaction of the BIP143 native-P2WPKH example; input 1
    // spends a 6 BTC P2WPKH output.
    let tx = tx_from_hex(
        "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000",
    );
    let private_key = SecretKey::from_slice(
        &hex::decode("619c335025c7f4012e556c2a58b2506e30b8511b53ade95ea316fd8c3286feb9")
            .unwrap(),
    )
    .unwrap();
    let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &private_key);
    assert_eq!(
        hex::encode(public_key.serialize()),
        "025476c2e83188368da1ff3e292e7acafcdb3566bb0ad253f62fc70f07aeee6357"
    );

    let spent = TxOut::new(
        600_000_000,
        Script::new_p2wpkh(&hash160(&public_key.serialize())),
    );

    let mut signer = Signer::new(tx);
    {
        let input_signer = signer.signer(1, spent.clone(), SignData::new()).unwrap();
        assert_eq!(
            hex::encode(input_signer.signature_hash(SigHashType::All).unwrap()),
            "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
        );
        input_signer.sign(&private_key, SigHashType::All).unwrap();
        assert_eq!(input_signer.state(), SignState::FullySigned);
    }

    let signed = signer.get().unwrap();
    assert!(signed.input[0].witness.is_empty());
    assert_eq!(signed.input[1].witness.len(), 2);
    assert_eq!(
        signed.input[1].witness[1],
        public_key.serialize().to_vec()
    );
}

#[test]
fn test_bip143_p2sh_p2wpkh_digest() {
    // The BIP143 P2SH-P2WPKH example: a 10 BTC output whose redeem script
    // is the P2WPKH program of the signing key.
    let tx = tx_from_hex(
        "0100000001db6b1b20aa0fd7b23880be2ecbd4a98130974cf4748fb66092ac4d3ceb1a54770100000000feffffff02b8b4eb0b000000001976a914a457b684d7f0d539a46a45bbc043f35b59d0d96388ac0008af2f000000001976a914fd270b1ee6abcaea97fea7ad0402e8bd8ad6d77c88ac92040000",
    );
    let private_key = SecretKey::from_slice(
        &hex::decode("eb696a065ef48a2192da5b28b694f87544b30fae8327c4510137a922f32c6dcf")
            .unwrap(),
    )
    .unwrap();
    let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &private_key);
    assert_eq!(
        hex::encode(public_key.serialize()),
        "03ad1d8e89212f0b92c74d23bb710c00662ad1470198ac48c43f7d6f93a2a26873"
    );

    let witness_program = Script::new_p2wpkh(&hash160(&public_key.serialize()));
    assert_eq!(
        witness_program.to_hex(),
        "001479091972186c449eb1ded22b78e40d009bdf0089"
    );
    let spent = TxOut::new(
        1_000_000_000,
        Script::new_p2sh(&hash160(witness_program.as_bytes())),
    );

    let mut signer = Signer::new(tx);
    signer
        .sign(
            0,
            &private_key,
            spent,
            Some(witness_program.clone()),
            None,
            SigHashType::All,
        )
        .unwrap();

    let signed = signer.get().unwrap();
    // The digest the signature was made over is the reference value.
    let sign_data = SignData::new().p2sh(witness_program.clone());
    let spent_again = TxOut::new(
        1_000_000_000,
        Script::new_p2sh(&hash160(witness_program.as_bytes())),
    );
    let input_signer = signer.signer(0, spent_again, sign_data).unwrap();
    assert_eq!(
        hex::encode(input_signer.signature_hash(SigHashType::All).unwrap()),
        "64f3b0f4dd2bb3aa1ce8566d220cc74dda9df97d8490cc81d89d735c92e59fb6"
    );

    // scriptSig carries only the witness program push; the signature and
    // key ride in the witness.
    assert_eq!(
        signed.input[0].script_sig.as_bytes()[0] as usize,
        witness_program.len()
    );
    assert_eq!(signed.input[0].witness.len(), 2);
}
