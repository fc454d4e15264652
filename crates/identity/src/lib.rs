//! Decentralized identifier resolution for the Coopnet federation substrate
//!
//! Two resolution strategies behind one contract: web-based identifiers
//! resolved over HTTPS, and registry-based identifiers minted and served
//! from a locally-hosted registry.

pub mod canonical;
pub mod keystore;
pub mod registry;
pub mod resolver;
pub mod web;

use coopnet_common::{Error, Result};
use serde::{Deserialize, Serialize};

pub use keystore::Keystore;
pub use registry::{RegistryDidResolver, RegistryParams};
pub use resolver::{DidResolver, MultiResolver};
pub use web::WebDidResolver;

/// Service type under which an instance advertises its federation endpoint
pub const FEDERATION_SERVICE_TYPE: &str = "CoopFederation";

/// Service id fragment for the federation endpoint
pub const FEDERATION_SERVICE_ID: &str = "#coop_fed";

/// Verification method fragment used for federation signing keys
pub const FEDERATION_KEY_FRAGMENT: &str = "coopFed";

/// An identifier document: public keys and service endpoints for a DID
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    /// The DID this document describes
    pub id: String,

    /// Aliases for the subject, e.g. `coop://alice.coop.example`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_known_as: Vec<String>,

    /// Verification methods (public keys)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,

    /// Service endpoints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    /// Create an empty document for a DID
    pub fn new(did: &str) -> Result<Self> {
        if !coopnet_common::did::is_valid(did) {
            return Err(Error::validation(format!("Invalid DID: {}", did)));
        }
        Ok(Self {
            id: did.to_string(),
            also_known_as: vec![],
            verification_method: vec![],
            service: vec![],
        })
    }

    /// Look up a verification method by full id or bare fragment
    pub fn get_verification_method(&self, key_id: &str) -> Option<&VerificationMethod> {
        let full_id = if key_id.starts_with(&self.id) {
            key_id.to_string()
        } else {
            format!("{}#{}", self.id, key_id.trim_start_matches('#'))
        };

        self.verification_method.iter().find(|m| m.id == full_id)
    }

    /// Find the endpoint of the first service entry with the given type
    pub fn service_endpoint(&self, service_type: &str) -> Option<&str> {
        self.service
            .iter()
            .find(|s| s.type_ == service_type)
            .map(|s| s.service_endpoint.as_str())
    }

    /// Endpoint of this instance's federation service, if declared
    pub fn federation_endpoint(&self) -> Option<&str> {
        self.service_endpoint(FEDERATION_SERVICE_TYPE)
    }

    /// Validate the document structure
    pub fn validate(&self) -> Result<()> {
        if !coopnet_common::did::is_valid(&self.id) {
            return Err(Error::validation(format!("Invalid document id: {}", self.id)));
        }

        for method in &self.verification_method {
            if method.id.is_empty() {
                return Err(Error::validation("Verification method must have an id"));
            }
            if method.controller.is_empty() {
                return Err(Error::validation("Verification method must have a controller"));
            }
            coopnet_crypto::decode_public_key(&method.public_key_multibase)
                .map_err(|e| Error::validation(format!("Invalid public key: {}", e)))?;
        }

        for service in &self.service {
            if service.id.is_empty() || service.type_.is_empty() {
                return Err(Error::validation("Service entries must have id and type"));
            }
        }

        Ok(())
    }
}

/// A verification method in an identifier document
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// The id of this verification method, `<did>#<fragment>`
    pub id: String,

    /// The verification method type
    #[serde(rename = "type")]
    pub type_: String,

    /// The controller of this verification method
    pub controller: String,

    /// Multibase-encoded public key
    pub public_key_multibase: String,
}

/// A service endpoint in an identifier document
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// The id of this service, usually a bare fragment
    pub id: String,

    /// The service type
    #[serde(rename = "type")]
    pub type_: String,

    /// The service endpoint URL
    pub service_endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_multikey() -> String {
        coopnet_crypto::encode_public_key(&coopnet_crypto::generate_keypair().public_key())
    }

    #[test]
    fn test_document_creation_and_validation() {
        let doc = DidDocument::new("did:web:coop.example").unwrap();
        assert_eq!(doc.id, "did:web:coop.example");
        assert!(doc.validate().is_ok());

        assert!(DidDocument::new("coop.example").is_err());
    }

    #[test]
    fn test_verification_method_lookup() {
        let mut doc = DidDocument::new("did:web:coop.example").unwrap();
        doc.verification_method.push(VerificationMethod {
            id: format!("{}#{}", doc.id, FEDERATION_KEY_FRAGMENT),
            type_: "Multikey".to_string(),
            controller: doc.id.clone(),
            public_key_multibase: test_multikey(),
        });

        assert!(doc.validate().is_ok());
        assert!(doc.get_verification_method("#coopFed").is_some());
        assert!(doc.get_verification_method("coopFed").is_some());
        assert!(doc
            .get_verification_method("did:web:coop.example#coopFed")
            .is_some());
        assert!(doc.get_verification_method("#other").is_none());
    }

    #[test]
    fn test_service_endpoint_lookup() {
        let mut doc = DidDocument::new("did:web:coop.example").unwrap();
        doc.service.push(Service {
            id: FEDERATION_SERVICE_ID.to_string(),
            type_: FEDERATION_SERVICE_TYPE.to_string(),
            service_endpoint: "https://coop.example".to_string(),
        });

        assert_eq!(doc.federation_endpoint(), Some("https://coop.example"));
        assert_eq!(doc.service_endpoint("OtherService"), None);
    }

    #[test]
    fn test_rejects_malformed_public_key() {
        let mut doc = DidDocument::new("did:web:coop.example").unwrap();
        doc.verification_method.push(VerificationMethod {
            id: format!("{}#coopFed", doc.id),
            type_: "Multikey".to_string(),
            controller: doc.id.clone(),
            public_key_multibase: "not-a-key".to_string(),
        });
        assert!(doc.validate().is_err());
    }
}
