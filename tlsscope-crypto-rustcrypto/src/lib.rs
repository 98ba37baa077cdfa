//! # RustCrypto-based provider for tlsscope
//!
//! Implements every `tlsscope-crypto` capability on top of the RustCrypto
//! project's crates.
//!
//! ## Supported Algorithms
//!
//! - **Hash / HMAC**: MD5, SHA-1, SHA-256, SHA-384, SHA-512
//! - **Ciphers**: NULL, RC4 (40/56/128-bit keys), RC2-CBC, DES-CBC, 3DES-CBC, AES-CBC
//! - **AEAD**: AES-128-GCM, AES-256-GCM
//! - **Key Exchange**: ECDH P-256, P-384, finite-field DH over arbitrary groups
//! - **RSA**: PKCS#1 v1.5 encryption and signatures, certificate and PEM/DER key loading
//! - **RNG**: OS entropy via `rand::rngs::OsRng`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tlsscope_crypto::{CryptoProvider, HashAlgorithm};
//! use tlsscope_crypto_rustcrypto::RustCryptoProvider;
//!
//! let provider = RustCryptoProvider::new();
//! let mut hash = provider.hash(HashAlgorithm::Sha256).unwrap();
//! hash.update(b"abc");
//! let digest = hash.finalize();
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_qualifications,
    missing_debug_implementations
)]

use tlsscope_crypto::{
    Aead, AeadAlgorithm, AsymmetricKey, Cipher, CipherAlgorithm, CryptoProvider, Hash,
    HashAlgorithm, Hmac, KeyExchange, KeyExchangeAlgorithm, Random, Result,
};

pub mod aead;
pub mod cipher;
pub mod hash;
pub mod hmac;
pub mod kex;
pub mod random;
pub mod rsa_key;

use random::OsRandom;

/// Cryptography provider using RustCrypto implementations.
///
/// Stateless apart from the RNG handle; `Send + Sync` and cheap to create.
///
/// # Example
///
/// ```rust,no_run
/// use tlsscope_crypto::CryptoProvider;
/// use tlsscope_crypto_rustcrypto::RustCryptoProvider;
///
/// let provider = RustCryptoProvider::new();
/// ```
#[derive(Debug)]
pub struct RustCryptoProvider {
    random: OsRandom,
}

impl Default for RustCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn new() -> Self {
        Self { random: OsRandom }
    }

    fn hash(&self, algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
        hash::create_hash(algorithm)
    }

    fn hmac(&self, algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>> {
        hmac::create_hmac(algorithm, key)
    }

    fn cipher(&self, algorithm: CipherAlgorithm, key: &[u8], iv: &[u8]) -> Result<Box<dyn Cipher>> {
        cipher::create_cipher(algorithm, key, iv)
    }

    fn aead(&self, algorithm: AeadAlgorithm) -> Result<Box<dyn Aead>> {
        aead::create_aead(algorithm)
    }

    fn random(&self) -> &dyn Random {
        &self.random
    }

    fn key_exchange(&self, algorithm: KeyExchangeAlgorithm) -> Result<Box<dyn KeyExchange>> {
        kex::create_key_exchange(algorithm)
    }

    fn dh(&self, prime: &[u8], generator: &[u8]) -> Result<Box<dyn KeyExchange>> {
        kex::create_dh(prime, generator)
    }

    fn rsa_public_key_from_certificate(&self, der: &[u8]) -> Result<Box<dyn AsymmetricKey>> {
        rsa_key::public_key_from_certificate(der)
    }

    fn rsa_private_key(&self, data: &[u8], private_only: bool) -> Result<Box<dyn AsymmetricKey>> {
        rsa_key::private_key_from_bytes(data, private_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_support() {
        let provider = RustCryptoProvider::new();
        assert!(provider.supports_hash(HashAlgorithm::Md5));
        assert!(provider.supports_hash(HashAlgorithm::Sha384));
    }

    #[test]
    fn test_key_exchange_support() {
        let provider = RustCryptoProvider::new();
        assert!(provider.supports_key_exchange(KeyExchangeAlgorithm::Secp256r1));
        assert!(provider.supports_key_exchange(KeyExchangeAlgorithm::Secp384r1));
        assert!(!provider.supports_key_exchange(KeyExchangeAlgorithm::FiniteField));
    }

    #[test]
    fn test_random_is_reachable() {
        let provider = RustCryptoProvider::new();
        assert_eq!(provider.random().generate(32).unwrap().len(), 32);
    }
}
