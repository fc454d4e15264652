//! Signed request protocol for cross-instance federation calls
//!
//! Produces and verifies proof that an HTTP request originated from the
//! holder of an identifier's private key, bound to method, target and
//! body. Signatures travel in structured text headers so they survive any
//! transport; verification failures are reported as an outcome, never as
//! an error, so callers can map them to a 401 rejection.

pub mod sign;
pub mod verify;

pub use sign::sign;
pub use verify::{verify, VerificationOutcome};

/// Label under which the signature is carried in both headers
pub const SIGNATURE_LABEL: &str = "sig1";

/// Header naming the covered components, key id and creation time
pub const SIGNATURE_INPUT_HEADER: &str = "signature-input";

/// Header carrying the signature bytes
pub const SIGNATURE_HEADER: &str = "signature";

/// Header carrying the body digest
pub const CONTENT_DIGEST_HEADER: &str = "content-digest";

/// Freshness window for the signature creation timestamp, in seconds
pub const CLOCK_SKEW_SECS: i64 = 300;

/// Build the canonical signature base covering the given components
///
/// One line per component, terminated by the signature-params line. Both
/// signer and verifier must produce identical bytes here.
pub(crate) fn signature_base(
    method: &str,
    target_url: &str,
    digest_header: Option<&str>,
    params: &str,
) -> String {
    let mut base = String::new();
    base.push_str(&format!("\"@method\": {}\n", method.to_uppercase()));
    base.push_str(&format!("\"@target-uri\": {}\n", target_url));
    if let Some(digest) = digest_header {
        base.push_str(&format!("\"{}\": {}\n", CONTENT_DIGEST_HEADER, digest));
    }
    base.push_str(&format!("\"@signature-params\": {}", params));
    base
}
