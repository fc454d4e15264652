//! Request verification
//!
//! Every failure path collapses to `verified: false` with a reason for
//! logs. Callers treat that as "reject with 401", not as a system error.

use std::collections::HashMap;

use chrono::Utc;
use coopnet_common::did;
use coopnet_crypto::digest;
use coopnet_identity::DidResolver;
use tracing::debug;

use crate::{CLOCK_SKEW_SECS, CONTENT_DIGEST_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER, SIGNATURE_LABEL};

/// Outcome of verifying a signed request
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    /// Whether the request proved possession of the signer's key
    pub verified: bool,
    /// The signer's identifier, when verification succeeded
    pub signer_did: Option<String>,
    /// Failure reason, for logging only
    pub reason: Option<String>,
}

impl VerificationOutcome {
    fn ok(signer_did: String) -> Self {
        Self {
            verified: true,
            signer_did: Some(signer_did),
            reason: None,
        }
    }

    fn fail<S: Into<String>>(reason: S) -> Self {
        let reason = reason.into();
        debug!(reason = %reason, "Request signature rejected");
        Self {
            verified: false,
            signer_did: None,
            reason: Some(reason),
        }
    }
}

/// Verify a signed request against its headers and body
pub async fn verify(
    method: &str,
    target_url: &str,
    headers: &HashMap<String, String>,
    body: Option<&[u8]>,
    resolver: &dyn DidResolver,
) -> VerificationOutcome {
    let params = match header(headers, SIGNATURE_INPUT_HEADER)
        .and_then(|v| v.strip_prefix(&format!("{}=", SIGNATURE_LABEL)))
    {
        Some(params) => params,
        None => return VerificationOutcome::fail("Missing signature-input header"),
    };

    let signature = match header(headers, SIGNATURE_HEADER)
        .and_then(|v| v.strip_prefix(&format!("{}=:", SIGNATURE_LABEL)))
        .and_then(|v| v.strip_suffix(':'))
        .and_then(|v| base64::decode(v).ok())
    {
        Some(signature) => signature,
        None => return VerificationOutcome::fail("Missing or malformed signature header"),
    };

    let components = match parse_components(params) {
        Some(components) => components,
        None => return VerificationOutcome::fail("Malformed covered-component list"),
    };

    let created = match parse_param(params, "created").and_then(|v| v.parse::<i64>().ok()) {
        Some(created) => created,
        None => return VerificationOutcome::fail("Missing created parameter"),
    };
    if (Utc::now().timestamp() - created).abs() > CLOCK_SKEW_SECS {
        return VerificationOutcome::fail(format!(
            "Signature created at {} is outside the freshness window",
            created
        ));
    }

    let key_id = match parse_quoted_param(params, "keyid") {
        Some(key_id) => key_id,
        None => return VerificationOutcome::fail("Missing keyid parameter"),
    };
    let signer = did::strip_fragment(&key_id).to_string();

    // The body digest is checked independently of the signature: a
    // mismatch means tampering even if the signature itself verifies.
    let digest_header = header(headers, CONTENT_DIGEST_HEADER);
    if let Some(body) = body {
        let claimed = match digest_header.and_then(|v| digest::parse_content_digest(v).ok()) {
            Some(claimed) => claimed,
            None => return VerificationOutcome::fail("Body present without a valid content-digest"),
        };
        if claimed != digest::sha256(body) {
            return VerificationOutcome::fail("Content digest does not match the received body");
        }
        if !components.iter().any(|c| c == CONTENT_DIGEST_HEADER) {
            return VerificationOutcome::fail("Content digest is not covered by the signature");
        }
    }

    let document = match resolver.resolve(&signer).await {
        Ok(document) => document,
        Err(e) => return VerificationOutcome::fail(format!("Resolution failed: {}", e)),
    };

    let public_key = match document
        .get_verification_method(&key_id)
        .and_then(|m| coopnet_crypto::decode_public_key(&m.public_key_multibase).ok())
    {
        Some(public_key) => public_key,
        None => {
            return VerificationOutcome::fail(format!(
                "No usable verification method for {}",
                key_id
            ))
        }
    };

    // Rebuild the signature base the signer should have produced, in the
    // received component order
    let mut base = String::new();
    for component in &components {
        let line = match component.as_str() {
            "@method" => format!("\"@method\": {}\n", method.to_uppercase()),
            "@target-uri" => format!("\"@target-uri\": {}\n", target_url),
            c if c == CONTENT_DIGEST_HEADER => match digest_header {
                Some(value) => format!("\"{}\": {}\n", CONTENT_DIGEST_HEADER, value),
                None => return VerificationOutcome::fail("Covered digest header is absent"),
            },
            other => {
                return VerificationOutcome::fail(format!("Unsupported covered component: {}", other))
            }
        };
        base.push_str(&line);
    }
    base.push_str(&format!("\"@signature-params\": {}", params));

    match public_key.verify(base.as_bytes(), &signature) {
        Ok(true) => VerificationOutcome::ok(signer),
        Ok(false) => VerificationOutcome::fail("Signature does not verify"),
        Err(e) => VerificationOutcome::fail(format!("Malformed signature: {}", e)),
    }
}

/// Case-insensitive header lookup
fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse the quoted component names between the leading parentheses
fn parse_components(params: &str) -> Option<Vec<String>> {
    let inner = params.strip_prefix('(')?;
    let end = inner.find(')')?;
    Some(
        inner[..end]
            .split_whitespace()
            .map(|c| c.trim_matches('"').to_string())
            .collect(),
    )
}

/// Extract a bare `;name=value` parameter
fn parse_param<'a>(params: &'a str, name: &str) -> Option<&'a str> {
    let marker = format!(";{}=", name);
    let start = params.find(&marker)? + marker.len();
    let rest = &params[start..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Extract a quoted `;name="value"` parameter
fn parse_quoted_param(params: &str, name: &str) -> Option<String> {
    parse_param(params, name).map(|v| v.trim_matches('"').to_string())
}
