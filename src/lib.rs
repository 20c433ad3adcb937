//! # txsign
//!
//! A pure Rust library for constructing, signing, and validating
//! Bitcoin-style transactions.
//!
//! The core of the library is input signing: given a transaction, the
//! output each input spends, and optional redemption data, it classifies
//! the spending script, computes the correct signature-hash digest (legacy
//! or BIP143), collects one or more signatures per input, and assembles a
//! consensus-valid scriptSig and/or witness stack.
//!
//! ## Features
//!
//! - **Script classification**: P2PK, P2PKH, P2SH, P2WPKH, P2WSH, and bare
//!   multisig templates, including P2SH-wrapped segwit
//! - **Both sighash algorithms**: legacy serialization and the BIP143
//!   segwit preimage, with all ALL/NONE/SINGLE/ANYONECANPAY combinations
//! - **Incremental multisig**: independent signers can contribute
//!   signatures in any order; serialization always follows the
//!   locking-script key order
//! - **Immutable transactions**: every modification goes through a builder
//!   that produces a fresh value
//!
//! ## Quick Start
//!
//! ```no_run
//! use txsign::primitives::script::Script;
//! use txsign::primitives::transaction::{OutPoint, TransactionBuilder, TxIn, TxOut};
//! use txsign::{SigHashType, Signer};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let private_key = secp256k1::SecretKey::from_slice(&[0x57; 32])?;
//!
//!     // The draft transaction: one input, one output.
//!     let tx = TransactionBuilder::new()
//!         .add_input(TxIn::new(OutPoint::new([0x11; 32], 0)))
//!         .add_output(TxOut::new(49_000, Script::new_p2pkh(&[0x42; 20])))
//!         .done();
//!
//!     // The output being spent, supplied by the caller as spend context.
//!     let spent = TxOut::new(50_000, Script::new_p2pkh(&[0x99; 20]));
//!
//!     let mut signer = Signer::new(tx);
//!     signer.sign(0, &private_key, spent, None, None, SigHashType::All)?;
//!     let signed = signer.get()?;
//!     println!("txid: {}", hex::encode(signed.txid()));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture Overview
//!
//! - [`primitives`]: transactions, scripts, hashing, and wire encoding
//! - [`sighash`]: signature-hash types and digest computation
//! - [`transaction_signer`]: per-input signature collection and the
//!   [`Signer`] orchestrator
//!
//! ## Error Handling
//!
//! All public APIs return [`Result<T, SignerError>`](error::SignerError).
//! Errors are surfaced to the immediate caller and never recovered
//! internally; in particular a redeem or witness script that does not hash
//! to its commitment is always fatal for that input.
//!
//! ## Thread Safety
//!
//! A [`Signer`] and its per-input [`InputSigner`]s are single-threaded
//! values. Signers for *different* inputs share no mutable state and may be
//! driven from different threads; concurrent calls into the *same*
//! `InputSigner` must be serialized by the caller.

pub mod error;
pub mod primitives;
pub mod sighash;
pub mod transaction_signer;
pub mod types;

pub use error::{Result, SignerError};
pub use sighash::SigHashType;
pub use transaction_signer::{InputSigner, SignData, SignState, Signer};
pub use types::{Config, LogLevel};

/// Initializes the library's logging. Call once per process.
///
/// Subsequent calls have no effect after the first successful
/// initialization.
pub fn init(config: &Config) {
    let result = match config.log_level {
        Some(level) => env_logger::Builder::new().filter_level(level.into()).try_init(),
        None => env_logger::try_init(),
    };
    // It's ok if this fails, it just means logging was already initialized.
    if result.is_ok() {
        log::info!("txsign initialized");
    }
}
