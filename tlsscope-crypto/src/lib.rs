//! # tlsscope cryptographic provider interface
//!
//! Trait-based capabilities consumed by `tlsscope-core`. The core never
//! names a concrete algorithm implementation; it asks a [`CryptoProvider`]
//! for one.
//!
//! ## Architecture
//!
//! ```text
//! CryptoProvider (main trait)
//! ├── Hash (MD5, SHA-1, SHA-2)
//! ├── Hmac (record MACs, PRF)
//! ├── Cipher (NULL, RC4, RC2/DES/3DES/AES in CBC mode)
//! ├── Aead (AES-GCM)
//! ├── Random (CSPRNG)
//! ├── KeyExchange (ECDHE on named curves, finite-field DHE)
//! └── AsymmetricKey (RSA PKCS#1 v1.5)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use tlsscope_crypto::{CryptoProvider, HashAlgorithm};
//!
//! let provider = SomeProvider::new();
//! let mut hmac = provider.hmac(HashAlgorithm::Sha256, b"key")?;
//! hmac.update(b"data");
//! let tag = hmac.finalize();
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

pub mod aead;
pub mod asymmetric;
pub mod cipher;
pub mod error;
pub mod hash;
pub mod hmac;
pub mod key_exchange;
pub mod random;

pub use aead::{Aead, AeadAlgorithm};
pub use asymmetric::{AsymmetricKey, SignatureDigest};
pub use cipher::{Cipher, CipherAlgorithm};
pub use error::{Error, Result};
pub use hash::{Hash, HashAlgorithm};
pub use hmac::Hmac;
pub use key_exchange::{KeyExchange, KeyExchangeAlgorithm, PrivateKey, PublicKey, SharedSecret};
pub use random::Random;

/// The main cryptographic provider trait.
///
/// Every factory returns a boxed trait object so the core can stay
/// backend-agnostic. Implementations must be `Send + Sync`: independent
/// sessions may share one provider across threads.
pub trait CryptoProvider: Send + Sync + 'static {
    /// Create a new instance of the crypto provider.
    fn new() -> Self
    where
        Self: Sized;

    /// Get a hash function instance.
    fn hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>>;

    /// Get an HMAC instance keyed with `key`.
    fn hmac(&self, algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>>;

    /// Get a keyed symmetric cipher.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - The cipher to instantiate
    /// * `key` - Raw key bytes
    /// * `iv` - CBC initialization vector; ignored (and may be empty) for
    ///   stream ciphers
    fn cipher(&self, algorithm: CipherAlgorithm, key: &[u8], iv: &[u8]) -> Result<Box<dyn Cipher>>;

    /// Get an AEAD cipher instance.
    fn aead(&self, algorithm: AeadAlgorithm) -> Result<Box<dyn Aead>>;

    /// Get the random number generator.
    fn random(&self) -> &dyn Random;

    /// Get an elliptic-curve key exchange instance.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` for [`KeyExchangeAlgorithm::FiniteField`]; use
    /// [`CryptoProvider::dh`] for that.
    fn key_exchange(&self, algorithm: KeyExchangeAlgorithm) -> Result<Box<dyn KeyExchange>>;

    /// Get a finite-field Diffie-Hellman instance over big-endian `prime`
    /// and `generator`.
    fn dh(&self, prime: &[u8], generator: &[u8]) -> Result<Box<dyn KeyExchange>>;

    /// Extract the RSA public key from a DER certificate.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` when the certificate carries a non-RSA key.
    fn rsa_public_key_from_certificate(&self, der: &[u8]) -> Result<Box<dyn AsymmetricKey>>;

    /// Load an RSA private key from PEM or DER.
    ///
    /// With `private_only`, PEM input is restricted to blocks whose label
    /// contains `PRIVATE`.
    ///
    /// # Errors
    ///
    /// `KeyNotFound` when no private key is present.
    fn rsa_private_key(&self, data: &[u8], private_only: bool) -> Result<Box<dyn AsymmetricKey>>;

    /// Check if a hash algorithm is supported.
    fn supports_hash(&self, algorithm: HashAlgorithm) -> bool {
        self.hash(algorithm).is_ok()
    }

    /// Check if a key exchange curve is supported.
    fn supports_key_exchange(&self, algorithm: KeyExchangeAlgorithm) -> bool {
        self.key_exchange(algorithm).is_ok()
    }
}
