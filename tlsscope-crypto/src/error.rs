//! Error types for the cryptographic provider.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested algorithm is not supported by this provider.
    #[error("Algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),

    /// Invalid key size for the algorithm.
    #[error("Invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize {
        /// Expected key size in bytes
        expected: usize,
        /// Actual key size in bytes
        actual: usize,
    },

    /// Invalid nonce/IV size for the algorithm.
    #[error("Invalid nonce size: expected {expected} bytes, got {actual}")]
    InvalidNonceSize {
        /// Expected nonce size in bytes
        expected: usize,
        /// Actual nonce size in bytes
        actual: usize,
    },

    /// Input length is not acceptable (e.g. not a whole number of cipher blocks).
    #[error("Invalid length parameter")]
    InvalidLength,

    /// Authentication tag verification failed (AEAD).
    #[error("Authentication tag verification failed")]
    AuthenticationFailed,

    /// Signature verification failed.
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid public key.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid private key.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// No key of the requested kind was found in the supplied material.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Key exchange failed.
    #[error("Key exchange failed")]
    KeyExchangeFailed,

    /// Encryption failed.
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Decryption failed.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Random number generation failed.
    #[error("Random number generation failed")]
    RandomGenerationFailed,

    /// General cryptographic error with a message.
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
}
