//! Hashing primitives used by scripts and signature hashes.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// A 20-byte RIPEMD160(SHA256(..)) digest.
pub type Hash160 = [u8; 20];

/// A 32-byte SHA256 digest.
pub type Hash256 = [u8; 32];

/// Single SHA-256.
pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Double SHA-256: SHA256(SHA256(data)).
pub fn sha256d(data: &[u8]) -> Hash256 {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD160(SHA256(data)), the hash committed to by P2PKH and P2SH outputs.
pub fn hash160(data: &[u8]) -> Hash160 {
    let sha256_hash = Sha256::digest(data);
    let mut ripemd160 = Ripemd160::new();
    ripemd160.update(sha256_hash);
    ripemd160.finalize().into()
}
