//! Authenticated encryption for secret material at rest
//!
//! Every encrypted column in the platform uses the same envelope:
//! `base64(iv[12] || auth_tag[16] || ciphertext)` under AES-256-GCM with a
//! 32-byte instance key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::error::{CryptoError, Result};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Length of the symmetric instance key in bytes
pub const INSTANCE_KEY_LEN: usize = 32;

/// Seal secret bytes under the instance key
pub fn seal(instance_key: &[u8], plaintext: &[u8]) -> Result<String> {
    if instance_key.len() != INSTANCE_KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "Instance key must be {} bytes, got {}",
            INSTANCE_KEY_LEN,
            instance_key.len()
        )));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(instance_key));

    let mut iv = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    // aes-gcm appends the tag to the ciphertext; the envelope stores it
    // between the iv and the ciphertext instead
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(format!("AES-GCM encryption failed: {}", e)))?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    let mut envelope = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(tag);
    envelope.extend_from_slice(ciphertext);

    Ok(base64::encode(envelope))
}

/// Open a sealed envelope back into secret bytes
pub fn open(instance_key: &[u8], envelope: &str) -> Result<Vec<u8>> {
    if instance_key.len() != INSTANCE_KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "Instance key must be {} bytes, got {}",
            INSTANCE_KEY_LEN,
            instance_key.len()
        )));
    }

    let bytes = base64::decode(envelope)
        .map_err(|e| CryptoError::InvalidEncoding(format!("Invalid envelope base64: {}", e)))?;

    if bytes.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::DecryptionFailed(
            "Envelope too short for iv and auth tag".into(),
        ));
    }

    let (iv, rest) = bytes.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(instance_key));
    cipher
        .decrypt(Nonce::from_slice(iv), sealed.as_ref())
        .map_err(|_| CryptoError::DecryptionFailed("AES-GCM authentication failed".into()))
}
