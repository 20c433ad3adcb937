use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    /// A redeem or witness script does not hash to the commitment embedded in
    /// the locking script. Always fatal: the caller supplied the wrong script
    /// or the data was tampered with.
    #[error("Script mismatch: {0}")]
    ScriptMismatch(String),

    /// The script template is unrecognized, the key is not part of the
    /// template, or signing was attempted before classification.
    #[error("Unsignable script: {0}")]
    UnsignableScript(String),

    /// The same key already signed this input.
    #[error("Duplicate signature for public key {0}")]
    DuplicateSignature(String),

    /// A witness signature hash was requested without the spent amount.
    #[error("Missing spent amount for witness signature hash")]
    MissingAmount,

    /// Redemption data was re-declared for an already-initialized input.
    #[error("Input context conflict: input {0} already has different spend data")]
    InputContextConflict(usize),

    /// Malformed caller input (out-of-range index, truncated script, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Secp256k1 error: {0}")]
    Secp(#[from] secp256k1::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, SignerError>;
