//! Locally-hosted identifier registry
//!
//! Emulates a public append-only identifier ledger for deployments that
//! mint their own identifiers. Identifiers are derived from the hash of a
//! canonicalized genesis operation, which makes creation deterministic and
//! idempotent. Updates rewrite the derived document in place: this is a
//! single-authority emulation, not a replica of the external ledger.

use std::sync::Arc;

use async_trait::async_trait;
use coopnet_common::{did, Error, Result};
use coopnet_storage::{Storage, StorageExt};
use multibase::Base;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::resolver::DidResolver;
use crate::{
    DidDocument, Service, VerificationMethod, FEDERATION_KEY_FRAGMENT, FEDERATION_SERVICE_ID,
    FEDERATION_SERVICE_TYPE,
};

/// Method name for registry-based identifiers
pub const REGISTRY_METHOD: &str = "plc";

/// Length of the identifier suffix in base32 characters
const SUFFIX_LEN: usize = 24;

/// Parameters for minting or amending a registry identifier
#[derive(Debug, Clone)]
pub struct RegistryParams {
    /// Subject handle, e.g. `alice.coop.example`
    pub handle: String,
    /// Multibase-encoded signing key
    pub signing_key: String,
    /// Federation service endpoint URL
    pub service_endpoint: String,
    /// Rotation keys authorized to amend the identifier
    pub rotation_keys: Vec<String>,
}

/// Registry-backed identifier resolver
pub struct RegistryDidResolver {
    storage: Arc<dyn Storage>,
}

impl RegistryDidResolver {
    /// Create a registry over the given storage
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Mint a registry identifier from genesis parameters
    ///
    /// Identical parameters always yield the identical identifier; a
    /// resubmission returns the existing identifier without writing a
    /// duplicate record.
    pub async fn create(&self, params: &RegistryParams) -> Result<String> {
        let genesis = genesis_operation(params);
        let bytes = crate::canonical::to_canonical_bytes(&genesis)?;

        let digest = Sha256::digest(&bytes);
        let suffix: String = Base::Base32Lower
            .encode(digest)
            .chars()
            .take(SUFFIX_LEN)
            .collect();
        let new_did = format!("did:{}:{}", REGISTRY_METHOD, suffix);

        if self.storage.exists(&document_key(&suffix)).await? {
            debug!(did = %new_did, "Genesis resubmitted, returning existing identifier");
            return Ok(new_did);
        }

        let document = derive_document(&new_did, params);

        self.storage.put(&genesis_key(&suffix), &genesis).await?;
        self.storage.put(&document_key(&suffix), &document).await?;

        info!(did = %new_did, handle = %params.handle, "Minted registry identifier");
        Ok(new_did)
    }

    /// Amend a registry identifier, rewriting its derived document
    ///
    /// Merges a new alias when the handle changed, a new verification
    /// method when the signing key changed, and a new service endpoint
    /// when the endpoint changed.
    pub async fn update(&self, target: &str, params: &RegistryParams) -> Result<()> {
        let suffix = self.registry_suffix(target)?;
        let mut document: DidDocument = self
            .storage
            .get(&document_key(&suffix))
            .await?
            .ok_or_else(|| Error::not_found(format!("Unknown identifier: {}", target)))?;

        document.also_known_as = vec![format!("coop://{}", params.handle)];
        document.verification_method = vec![federation_key(target, &params.signing_key)];
        document.service = vec![federation_service(&params.service_endpoint)];

        self.storage.put(&document_key(&suffix), &document).await?;
        info!(did = %target, "Rewrote registry identifier document");
        Ok(())
    }

    fn registry_suffix<'a>(&self, target: &'a str) -> Result<&'a str> {
        if did::method(target)? != REGISTRY_METHOD {
            return Err(Error::validation(format!(
                "Not a registry identifier: {}",
                target
            )));
        }
        did::method_specific_id(target)
    }
}

#[async_trait]
impl DidResolver for RegistryDidResolver {
    async fn resolve(&self, target: &str) -> Result<DidDocument> {
        let suffix = self.registry_suffix(target)?;
        self.storage
            .get(&document_key(suffix))
            .await?
            .ok_or_else(|| Error::resolution(format!("Identifier not found: {}", target)))
    }

    fn supports_method(&self, method: &str) -> bool {
        method == REGISTRY_METHOD
    }
}

fn genesis_key(suffix: &str) -> String {
    format!("registry/{}/genesis", suffix)
}

fn document_key(suffix: &str) -> String {
    format!("registry/{}/document", suffix)
}

/// Build the genesis operation for a set of parameters
fn genesis_operation(params: &RegistryParams) -> serde_json::Value {
    json!({
        "type": "registry_genesis",
        "rotationKeys": params.rotation_keys,
        "verificationMethods": { FEDERATION_KEY_FRAGMENT: params.signing_key },
        "alsoKnownAs": [format!("coop://{}", params.handle)],
        "services": {
            "coop_fed": {
                "type": FEDERATION_SERVICE_TYPE,
                "endpoint": params.service_endpoint,
            }
        },
        "prev": null,
    })
}

fn federation_key(target: &str, signing_key: &str) -> VerificationMethod {
    VerificationMethod {
        id: format!("{}#{}", target, FEDERATION_KEY_FRAGMENT),
        type_: "Multikey".to_string(),
        controller: target.to_string(),
        public_key_multibase: signing_key.to_string(),
    }
}

fn federation_service(endpoint: &str) -> Service {
    Service {
        id: FEDERATION_SERVICE_ID.to_string(),
        type_: FEDERATION_SERVICE_TYPE.to_string(),
        service_endpoint: endpoint.to_string(),
    }
}

fn derive_document(target: &str, params: &RegistryParams) -> DidDocument {
    DidDocument {
        id: target.to_string(),
        also_known_as: vec![format!("coop://{}", params.handle)],
        verification_method: vec![federation_key(target, &params.signing_key)],
        service: vec![federation_service(&params.service_endpoint)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coopnet_storage::MemoryStorage;

    fn test_params() -> RegistryParams {
        RegistryParams {
            handle: "alice.coop.example".to_string(),
            signing_key: coopnet_crypto::encode_public_key(
                &coopnet_crypto::SigningKeyPair::from_bytes(&[7u8; 32])
                    .unwrap()
                    .public_key(),
            ),
            service_endpoint: "https://pds.example".to_string(),
            rotation_keys: vec![],
        }
    }

    fn registry() -> RegistryDidResolver {
        RegistryDidResolver::new(Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_creation_is_deterministic_and_idempotent() {
        let registry = registry();
        let params = test_params();

        let first = registry.create(&params).await.unwrap();
        let second = registry.create(&params).await.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("did:plc:"));
        assert_eq!(
            coopnet_common::did::method_specific_id(&first).unwrap().len(),
            SUFFIX_LEN
        );

        // The resubmission did not duplicate the stored records
        let keys = registry.storage.list_keys("registry/").await.unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[tokio::test]
    async fn test_different_params_yield_different_identifiers() {
        let registry = registry();
        let a = registry.create(&test_params()).await.unwrap();

        let mut other = test_params();
        other.handle = "bob.coop.example".to_string();
        let b = registry.create(&other).await.unwrap();

        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_resolve_returns_derived_document() {
        let registry = registry();
        let params = test_params();
        let target = registry.create(&params).await.unwrap();

        let doc = registry.resolve(&target).await.unwrap();
        assert_eq!(doc.id, target);
        assert_eq!(doc.also_known_as, vec!["coop://alice.coop.example"]);
        assert_eq!(doc.federation_endpoint(), Some("https://pds.example"));
        assert!(doc.get_verification_method("#coopFed").is_some());
    }

    #[tokio::test]
    async fn test_update_rewrites_document() {
        let registry = registry();
        let mut params = test_params();
        let target = registry.create(&params).await.unwrap();

        params.handle = "alice.other.example".to_string();
        params.service_endpoint = "https://pds2.example".to_string();
        registry.update(&target, &params).await.unwrap();

        let doc = registry.resolve(&target).await.unwrap();
        assert_eq!(doc.also_known_as, vec!["coop://alice.other.example"]);
        assert_eq!(doc.federation_endpoint(), Some("https://pds2.example"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_identifier_fails() {
        let registry = registry();
        assert!(registry
            .resolve("did:plc:aaaaaaaaaaaaaaaaaaaaaaaa")
            .await
            .is_err());
        assert!(registry.resolve("did:web:coop.example").await.is_err());
    }
}
