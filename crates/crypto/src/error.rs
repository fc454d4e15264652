//! Error types for cryptographic operations

use coopnet_common::Error as CommonError;
use thiserror::Error;

/// Error type for cryptographic operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Invalid signature
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Verification failed
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// Signing failed
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid encoding
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<CryptoError> for CommonError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::InvalidKey(msg)
            | CryptoError::InvalidSignature(msg)
            | CryptoError::VerificationFailed(msg)
            | CryptoError::InvalidEncoding(msg) => CommonError::validation(msg),

            CryptoError::SigningFailed(msg)
            | CryptoError::EncryptionFailed(msg)
            | CryptoError::DecryptionFailed(msg) => CommonError::internal(msg),

            CryptoError::Other(msg) => CommonError::other(msg),
        }
    }
}

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;
