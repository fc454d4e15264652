//! Helpers for working with decentralized identifier strings

use crate::{Error, Result};

/// Extract the method name from a DID string
///
/// `did:web:coop.example` -> `web`
pub fn method(did: &str) -> Result<&str> {
    let mut parts = did.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => Ok(method),
        _ => Err(Error::validation(format!("Invalid DID: {}", did))),
    }
}

/// Extract the method-specific identifier from a DID string
///
/// `did:plc:abcd1234` -> `abcd1234`
pub fn method_specific_id(did: &str) -> Result<&str> {
    let mut parts = did.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("did"), Some(method), Some(id)) if !method.is_empty() && !id.is_empty() => Ok(id),
        _ => Err(Error::validation(format!("Invalid DID: {}", did))),
    }
}

/// Check whether a string is a syntactically valid DID
pub fn is_valid(did: &str) -> bool {
    method(did).is_ok()
}

/// Strip a key fragment from a verification method id, returning the DID
///
/// `did:web:coop.example#coop-fed` -> `did:web:coop.example`
pub fn strip_fragment(key_id: &str) -> &str {
    key_id.split('#').next().unwrap_or(key_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_extraction() {
        assert_eq!(method("did:web:coop.example").unwrap(), "web");
        assert_eq!(method("did:plc:abc123").unwrap(), "plc");
        assert!(method("not-a-did").is_err());
        assert!(method("did:web").is_err());
        assert!(method("did::abc").is_err());
    }

    #[test]
    fn test_method_specific_id() {
        assert_eq!(
            method_specific_id("did:web:coop.example:hubs:main").unwrap(),
            "coop.example:hubs:main"
        );
    }

    #[test]
    fn test_strip_fragment() {
        assert_eq!(
            strip_fragment("did:web:coop.example#coop-fed"),
            "did:web:coop.example"
        );
        assert_eq!(strip_fragment("did:plc:abc"), "did:plc:abc");
    }
}
