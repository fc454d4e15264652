//! Request signing

use chrono::Utc;
use coopnet_common::Result;
use coopnet_crypto::{digest, SigningKeyPair, SIGNATURE_ALGORITHM};

use crate::{
    signature_base, CONTENT_DIGEST_HEADER, SIGNATURE_HEADER, SIGNATURE_INPUT_HEADER,
    SIGNATURE_LABEL,
};

/// Sign an outbound request, returning the headers to attach
///
/// Covers the method, the target URI and, when a body is present, its
/// content digest. The digest header is emitted alongside the two
/// signature headers.
pub fn sign(
    method: &str,
    target_url: &str,
    body: Option<&[u8]>,
    keypair: &SigningKeyPair,
    key_id: &str,
) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::with_capacity(3);

    let digest_header = body.map(digest::content_digest_header);
    if let Some(value) = &digest_header {
        headers.push((CONTENT_DIGEST_HEADER.to_string(), value.clone()));
    }

    let components = if digest_header.is_some() {
        format!("\"@method\" \"@target-uri\" \"{}\"", CONTENT_DIGEST_HEADER)
    } else {
        "\"@method\" \"@target-uri\"".to_string()
    };

    let params = format!(
        "({});created={};keyid=\"{}\";alg=\"{}\"",
        components,
        Utc::now().timestamp(),
        key_id,
        SIGNATURE_ALGORITHM
    );

    let base = signature_base(method, target_url, digest_header.as_deref(), &params);
    let signature = keypair.sign(base.as_bytes());

    headers.push((
        SIGNATURE_INPUT_HEADER.to_string(),
        format!("{}={}", SIGNATURE_LABEL, params),
    ));
    headers.push((
        SIGNATURE_HEADER.to_string(),
        format!("{}=:{}:", SIGNATURE_LABEL, base64::encode(signature)),
    ));

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coopnet_crypto::SigningKeyPair;

    #[test]
    fn test_signed_headers_shape() {
        let keypair = SigningKeyPair::generate();
        let headers = sign(
            "post",
            "https://hub.example/federation/hub/register",
            Some(b"{}"),
            &keypair,
            "did:web:coop.example#coopFed",
        )
        .unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers[0].0, CONTENT_DIGEST_HEADER);
        assert!(headers[0].1.starts_with("sha-256=:"));

        let input = &headers[1].1;
        assert!(input.starts_with("sig1=(\"@method\" \"@target-uri\" \"content-digest\")"));
        assert!(input.contains(";created="));
        assert!(input.contains(";keyid=\"did:web:coop.example#coopFed\""));
        assert!(input.contains(";alg=\"ecdsa-p256-sha256\""));

        assert!(headers[2].1.starts_with("sig1=:"));
        assert!(headers[2].1.ends_with(':'));
    }

    #[test]
    fn test_bodyless_request_omits_digest() {
        let keypair = SigningKeyPair::generate();
        let headers = sign(
            "POST",
            "https://hub.example/federation/hub/notify",
            None,
            &keypair,
            "did:web:coop.example#coopFed",
        )
        .unwrap();

        assert_eq!(headers.len(), 2);
        assert!(headers[0].1.starts_with("sig1=(\"@method\" \"@target-uri\")"));
    }
}
