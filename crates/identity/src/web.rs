//! Web-based identifier resolution
//!
//! `did:web:coop.example` resolves to `https://coop.example/.well-known/did.json`;
//! `did:web:coop.example:hubs:main` to `https://coop.example/hubs/main/did.json`.
//! No local persistence: authority lives at the remote domain and the
//! document is re-fetched on every resolution.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use coopnet_common::{Error, Result};
use tracing::debug;

use crate::resolver::DidResolver;
use crate::DidDocument;

/// Default timeout for document fetches
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolver for web-based identifiers
pub struct WebDidResolver {
    client: reqwest::Client,
}

impl WebDidResolver {
    /// Create a new web resolver with a default HTTP client
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Create a web resolver with a caller-supplied HTTP client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for WebDidResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DidResolver for WebDidResolver {
    async fn resolve(&self, did: &str) -> Result<DidDocument> {
        let url = document_url(did)?;
        debug!(did = %did, url = %url, "Fetching identifier document");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/did+json, application/json")
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json::<DidDocument>()
            .await
            .map_err(|e| Error::resolution(format!("Invalid identifier document: {}", e)))
    }

    fn supports_method(&self, method: &str) -> bool {
        method == "web"
    }
}

/// Derive the document URL for a web-based identifier
pub fn document_url(did: &str) -> Result<String> {
    let rest = did
        .strip_prefix("did:web:")
        .ok_or_else(|| Error::validation(format!("Not a web DID: {}", did)))?;

    let mut segments = rest.split(':');
    let host = segments
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Error::validation("Empty host in web DID"))?
        // Percent-decoded port separator for local development hosts
        .replace("%3A", ":");

    let scheme = if is_local_host(&host) { "http" } else { "https" };

    let path_segments: Vec<&str> = segments.collect();
    let url = if path_segments.is_empty() {
        format!("{}://{}/.well-known/did.json", scheme, host)
    } else {
        format!("{}://{}/{}/did.json", scheme, host, path_segments.join("/"))
    };

    Ok(url)
}

/// Plain HTTP is only acceptable for loopback and IP-literal hosts
fn is_local_host(host: &str) -> bool {
    let bare = host.split(':').next().unwrap_or(host);
    bare == "localhost" || bare.parse::<IpAddr>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_identifier_url() {
        assert_eq!(
            document_url("did:web:coop.example").unwrap(),
            "https://coop.example/.well-known/did.json"
        );
    }

    #[test]
    fn test_path_identifier_url() {
        assert_eq!(
            document_url("did:web:coop.example:hubs:main").unwrap(),
            "https://coop.example/hubs/main/did.json"
        );
    }

    #[test]
    fn test_percent_encoded_port_uses_http_for_loopback() {
        assert_eq!(
            document_url("did:web:localhost%3A3000").unwrap(),
            "http://localhost:3000/.well-known/did.json"
        );
        assert_eq!(
            document_url("did:web:127.0.0.1%3A8080").unwrap(),
            "http://127.0.0.1:8080/.well-known/did.json"
        );
    }

    #[test]
    fn test_public_host_with_port_stays_https() {
        assert_eq!(
            document_url("did:web:coop.example%3A8443").unwrap(),
            "https://coop.example:8443/.well-known/did.json"
        );
    }

    #[test]
    fn test_rejects_non_web_dids() {
        assert!(document_url("did:plc:abc").is_err());
        assert!(document_url("did:web:").is_err());
    }
}
