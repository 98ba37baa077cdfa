//! Hash function implementations using the RustCrypto digest crates.

use digest::Digest;
use tlsscope_crypto::{Hash, HashAlgorithm, Result};

/// Create a hash instance for the specified algorithm.
pub fn create_hash(algorithm: HashAlgorithm) -> Result<Box<dyn Hash>> {
    match algorithm {
        HashAlgorithm::Md5 => Ok(DigestHash::<md5::Md5>::boxed(algorithm)),
        HashAlgorithm::Sha1 => Ok(DigestHash::<sha1::Sha1>::boxed(algorithm)),
        HashAlgorithm::Sha256 => Ok(DigestHash::<sha2::Sha256>::boxed(algorithm)),
        HashAlgorithm::Sha384 => Ok(DigestHash::<sha2::Sha384>::boxed(algorithm)),
        HashAlgorithm::Sha512 => Ok(DigestHash::<sha2::Sha512>::boxed(algorithm)),
    }
}

/// Any `digest::Digest` behind the provider's `Hash` trait.
struct DigestHash<D> {
    hasher: D,
    algorithm: HashAlgorithm,
}

impl<D: Digest + Send + 'static> DigestHash<D> {
    fn boxed(algorithm: HashAlgorithm) -> Box<dyn Hash> {
        Box::new(Self {
            hasher: D::new(),
            algorithm,
        })
    }
}

impl<D: Digest + Send> Hash for DigestHash<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.hasher, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.hasher.finalize().to_vec()
    }

    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}
