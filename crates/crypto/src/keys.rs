//! Signing key types for the Coopnet federation substrate
//!
//! Each instance identifier holds one P-256 keypair, used both to mint
//! registry identifiers and to sign outbound federation requests.

use std::fmt;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;

use crate::error::{CryptoError, Result};

/// Signature algorithm label carried in signed-request metadata
pub const SIGNATURE_ALGORITHM: &str = "ecdsa-p256-sha256";

/// A P-256 signing keypair
pub struct SigningKeyPair {
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::random(&mut OsRng),
        }
    }

    /// Reconstruct a keypair from a 32-byte scalar
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid P-256 secret key: {}", e)))?;
        Ok(Self { secret })
    }

    /// Export the secret scalar as bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.secret.to_bytes().to_vec()
    }

    /// The public half of this keypair
    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: VerifyingKey::from(&self.secret),
        }
    }

    /// Sign a message, returning the raw 64-byte signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: EcdsaSignature = self.secret.sign(message);
        signature.to_bytes().to_vec()
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKeyPair(REDACTED)")
    }
}

/// A P-256 public key
#[derive(Clone)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// Reconstruct a public key from SEC1 bytes (compressed or uncompressed)
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let key = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid P-256 public key: {}", e)))?;
        Ok(Self { key })
    }

    /// Export as a compressed SEC1 point (parity byte + x coordinate)
    pub fn to_compressed_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Verify a raw 64-byte signature against a message
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        let signature = EcdsaSignature::from_slice(signature)
            .map_err(|e| CryptoError::InvalidSignature(format!("Malformed signature: {}", e)))?;
        Ok(self.key.verify(message, &signature).is_ok())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PublicKey({})",
            hex::encode(self.key.to_encoded_point(true).as_bytes())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_roundtrip() {
        let keypair = SigningKeyPair::generate();
        let restored = SigningKeyPair::from_bytes(&keypair.to_bytes()).unwrap();
        assert_eq!(
            keypair.public_key().to_compressed_bytes(),
            restored.public_key().to_compressed_bytes()
        );
    }

    #[test]
    fn test_sign_verify() {
        let keypair = SigningKeyPair::generate();
        let message = b"membership request for did:plc:abc";

        let signature = keypair.sign(message);
        let public_key = keypair.public_key();

        assert!(public_key.verify(message, &signature).unwrap());
        assert!(!public_key.verify(b"tampered message", &signature).unwrap());
    }

    #[test]
    fn test_compressed_point_is_33_bytes() {
        let keypair = SigningKeyPair::generate();
        let compressed = keypair.public_key().to_compressed_bytes();
        assert_eq!(compressed.len(), 33);
        assert!(compressed[0] == 0x02 || compressed[0] == 0x03);
    }
}
