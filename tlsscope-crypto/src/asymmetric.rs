//! RSA keys as used by TLS 1.0-1.2 key transport and client authentication.

use crate::{HashAlgorithm, Result};

/// How a digest is wrapped before PKCS#1 v1.5 signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureDigest {
    /// DER `DigestInfo` for the given hash is prepended (TLS 1.2).
    Prefixed(HashAlgorithm),
    /// The raw bytes are signed as-is, e.g. the 36-byte MD5||SHA1 digest of
    /// TLS 1.0/1.1.
    Unprefixed,
}

/// An RSA key, public only or with its private half.
///
/// All padding is PKCS#1 v1.5.
pub trait AsymmetricKey: Send + Sync + std::fmt::Debug {
    /// Whether private operations are available.
    fn has_private_key(&self) -> bool;

    /// Modulus size in bytes.
    fn modulus_size(&self) -> usize;

    /// Encrypt with the public key.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt with the private key.
    ///
    /// # Errors
    ///
    /// - `InvalidPrivateKey` when only the public half is loaded
    /// - `DecryptionFailed` on bad padding
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Sign an already computed digest.
    fn sign(&self, digest_kind: SignatureDigest, digest: &[u8]) -> Result<Vec<u8>>;

    /// Verify a signature over an already computed digest.
    ///
    /// # Errors
    ///
    /// `SignatureVerificationFailed` if the signature does not match.
    fn verify(&self, digest_kind: SignatureDigest, digest: &[u8], signature: &[u8]) -> Result<()>;
}
