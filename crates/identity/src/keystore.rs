//! Encrypted signing-key storage
//!
//! Private key material is stored sealed under the instance key and
//! decrypted only transiently when a signing key is requested.

use std::sync::Arc;

use coopnet_common::{Error, Result};
use coopnet_crypto::{seal, SigningKeyPair};
use coopnet_storage::Storage;
use tracing::info;

/// Stores each identifier's signing keypair, encrypted at rest
pub struct Keystore {
    storage: Arc<dyn Storage>,
    instance_key: Vec<u8>,
}

impl Keystore {
    /// Create a keystore over the given storage with a 32-byte instance key
    pub fn new(storage: Arc<dyn Storage>, instance_key: Vec<u8>) -> Result<Self> {
        if instance_key.len() != seal::INSTANCE_KEY_LEN {
            return Err(Error::validation(format!(
                "Instance key must be {} bytes",
                seal::INSTANCE_KEY_LEN
            )));
        }
        Ok(Self {
            storage,
            instance_key,
        })
    }

    /// Generate and store a new signing keypair for an identifier
    pub async fn create_keypair(&self, did: &str) -> Result<SigningKeyPair> {
        let keypair = SigningKeyPair::generate();
        self.import_keypair(did, &keypair).await?;
        Ok(keypair)
    }

    /// Seal and store an existing keypair for an identifier
    pub async fn import_keypair(&self, did: &str, keypair: &SigningKeyPair) -> Result<()> {
        let envelope = seal::seal(&self.instance_key, &keypair.to_bytes())?;
        self.storage
            .put_bytes(&key_for(did), envelope.as_bytes())
            .await?;
        info!(did = %did, "Stored sealed signing key");
        Ok(())
    }

    /// Decrypt and return the signing keypair for an identifier
    pub async fn signing_key(&self, did: &str) -> Result<SigningKeyPair> {
        let envelope = self
            .storage
            .get_bytes(&key_for(did))
            .await?
            .ok_or_else(|| Error::not_found(format!("No signing key for {}", did)))?;

        let envelope = String::from_utf8(envelope)
            .map_err(|_| Error::internal("Sealed key envelope is not valid UTF-8"))?;
        let secret = seal::open(&self.instance_key, &envelope)?;

        Ok(SigningKeyPair::from_bytes(&secret)?)
    }

    /// Check whether an identifier has a stored signing key
    pub async fn has_key(&self, did: &str) -> Result<bool> {
        self.storage.exists(&key_for(did)).await
    }
}

fn key_for(did: &str) -> String {
    format!("keys/{}", did)
}
