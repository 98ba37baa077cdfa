//! AEAD (Authenticated Encryption with Associated Data) cipher interface.

use crate::Result;

/// AEAD algorithms used by TLS 1.2 GCM cipher suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlgorithm {
    /// AES-128-GCM (RFC 5288)
    Aes128Gcm,
    /// AES-256-GCM (RFC 5288)
    Aes256Gcm,
}

impl AeadAlgorithm {
    /// Pick the GCM variant for a raw key length.
    pub const fn gcm_for_key_size(key_size: usize) -> Option<Self> {
        match key_size {
            16 => Some(AeadAlgorithm::Aes128Gcm),
            32 => Some(AeadAlgorithm::Aes256Gcm),
            _ => None,
        }
    }

    /// Get the key size in bytes for this algorithm.
    pub const fn key_size(self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm => 16,
            AeadAlgorithm::Aes256Gcm => 32,
        }
    }

    /// Get the nonce size in bytes (4-byte salt plus 8-byte explicit part).
    pub const fn nonce_size(self) -> usize {
        12
    }

    /// Get the authentication tag size in bytes.
    pub const fn tag_size(self) -> usize {
        16
    }

    /// Get the name of this algorithm as used in TLS.
    pub const fn name(self) -> &'static str {
        match self {
            AeadAlgorithm::Aes128Gcm => "AES_128_GCM",
            AeadAlgorithm::Aes256Gcm => "AES_256_GCM",
        }
    }
}

/// AEAD cipher trait.
///
/// Stateless: every call takes the key and the full nonce, so the caller
/// owns nonce bookkeeping.
///
/// # Security Requirements
///
/// - Tag verification MUST be constant-time
/// - Nonces MUST NOT be reused with the same key
pub trait Aead: Send + Sync {
    /// Encrypt and authenticate. Returns `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// - `InvalidKeySize` / `InvalidNonceSize` on malformed inputs
    fn seal(&self, key: &[u8], nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Verify and decrypt `ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed` if the tag does not verify. No plaintext is
    ///   released in that case.
    fn open(&self, key: &[u8], nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Get the algorithm this AEAD implements.
    fn algorithm(&self) -> AeadAlgorithm;
}
