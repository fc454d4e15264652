//! Cryptographic primitives for the Coopnet federation substrate
//!
//! P-256 signing keypairs, content digests, multibase public-key encoding,
//! and the AES-256-GCM envelope used for secret material at rest.

pub mod digest;
pub mod error;
pub mod keys;
pub mod multikey;
pub mod seal;

pub use error::CryptoError;
pub use keys::{PublicKey, SigningKeyPair, SIGNATURE_ALGORITHM};
pub use multikey::{decode_public_key, encode_public_key};

use error::Result;

/// Generate a new P-256 signing keypair
pub fn generate_keypair() -> SigningKeyPair {
    SigningKeyPair::generate()
}

/// Verify a raw signature against a message using a public key
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<bool> {
    public_key.verify(message, signature)
}
