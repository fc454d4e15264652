//! Identifier resolution contract and method dispatch

use std::sync::Arc;

use async_trait::async_trait;
use coopnet_common::{did, Error, Result};
use tracing::debug;

use crate::DidDocument;

/// Interface for identifier resolution
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Resolve a DID to its identifier document
    async fn resolve(&self, did: &str) -> Result<DidDocument>;

    /// Check if this resolver supports a given DID method
    fn supports_method(&self, method: &str) -> bool;
}

/// Resolver that dispatches to the first registered strategy supporting
/// the identifier's method
pub struct MultiResolver {
    resolvers: Vec<Arc<dyn DidResolver>>,
}

impl MultiResolver {
    /// Create a dispatching resolver over the given strategies
    pub fn new(resolvers: Vec<Arc<dyn DidResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl DidResolver for MultiResolver {
    async fn resolve(&self, target: &str) -> Result<DidDocument> {
        let method = did::method(target)?;

        for resolver in &self.resolvers {
            if resolver.supports_method(method) {
                debug!(did = %target, method = %method, "Resolving identifier");
                return resolver.resolve(target).await;
            }
        }

        Err(Error::resolution(format!(
            "No resolver for DID method: {}",
            method
        )))
    }

    fn supports_method(&self, method: &str) -> bool {
        self.resolvers.iter().any(|r| r.supports_method(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver {
        method: &'static str,
    }

    #[async_trait]
    impl DidResolver for FixedResolver {
        async fn resolve(&self, did: &str) -> Result<DidDocument> {
            DidDocument::new(did)
        }

        fn supports_method(&self, method: &str) -> bool {
            method == self.method
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_method() {
        let resolver = MultiResolver::new(vec![
            Arc::new(FixedResolver { method: "plc" }),
            Arc::new(FixedResolver { method: "web" }),
        ]);

        assert!(resolver.resolve("did:plc:abc").await.is_ok());
        assert!(resolver.resolve("did:web:coop.example").await.is_ok());
        assert!(resolver.resolve("did:key:z123").await.is_err());
        assert!(resolver.supports_method("web"));
        assert!(!resolver.supports_method("key"));
    }
}
