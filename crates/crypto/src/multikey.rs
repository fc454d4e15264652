//! Multibase text encoding for P-256 public keys
//!
//! Layout: multibase prefix `z` (base58btc) over the multicodec varint for
//! `p256-pub` (0x1200) followed by the SEC1 compressed point. The byte
//! layout is bit-compatible with external verifiers of the same scheme.

use multibase::Base;

use crate::error::{CryptoError, Result};
use crate::keys::PublicKey;

/// Multicodec varint prefix for a compressed P-256 public key
const P256_MULTICODEC_PREFIX: [u8; 2] = [0x80, 0x24];

/// Encode a public key into its multibase text form
pub fn encode_public_key(key: &PublicKey) -> String {
    let mut bytes = Vec::with_capacity(35);
    bytes.extend_from_slice(&P256_MULTICODEC_PREFIX);
    bytes.extend_from_slice(&key.to_compressed_bytes());
    multibase::encode(Base::Base58Btc, bytes)
}

/// Decode a multibase text form back into a public key
pub fn decode_public_key(encoded: &str) -> Result<PublicKey> {
    let (base, bytes) = multibase::decode(encoded)
        .map_err(|e| CryptoError::InvalidEncoding(format!("Invalid multibase key: {}", e)))?;

    if base != Base::Base58Btc {
        return Err(CryptoError::InvalidEncoding(format!(
            "Unexpected multibase alphabet: {:?}",
            base
        )));
    }

    let point = bytes
        .strip_prefix(&P256_MULTICODEC_PREFIX[..])
        .ok_or_else(|| {
            CryptoError::InvalidEncoding("Key does not carry the p256-pub multicodec tag".into())
        })?;

    PublicKey::from_sec1_bytes(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningKeyPair;

    #[test]
    fn test_encode_decode_roundtrip() {
        let keypair = SigningKeyPair::generate();
        let encoded = encode_public_key(&keypair.public_key());

        assert!(encoded.starts_with('z'));

        let decoded = decode_public_key(&encoded).unwrap();
        assert_eq!(
            decoded.to_compressed_bytes(),
            keypair.public_key().to_compressed_bytes()
        );
    }

    #[test]
    fn test_decode_rejects_missing_codec_tag() {
        let keypair = SigningKeyPair::generate();
        // Encode the bare point without the multicodec prefix
        let bare = multibase::encode(
            Base::Base58Btc,
            keypair.public_key().to_compressed_bytes(),
        );
        assert!(decode_public_key(&bare).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_alphabet() {
        let keypair = SigningKeyPair::generate();
        let mut bytes = P256_MULTICODEC_PREFIX.to_vec();
        bytes.extend_from_slice(&keypair.public_key().to_compressed_bytes());
        let hex_form = multibase::encode(Base::Base16Lower, bytes);
        assert!(decode_public_key(&hex_form).is_err());
    }
}
