//! HMAC implementations using the `hmac` crate.

use hmac::digest::KeyInit;
use hmac::{Hmac as HmacCore, Mac};
use tlsscope_crypto::{Error, HashAlgorithm, Hmac, Result};

/// Create an HMAC instance for the specified hash algorithm.
pub fn create_hmac(algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>> {
    match algorithm {
        HashAlgorithm::Md5 => MacState::<HmacCore<md5::Md5>>::boxed(algorithm, key),
        HashAlgorithm::Sha1 => MacState::<HmacCore<sha1::Sha1>>::boxed(algorithm, key),
        HashAlgorithm::Sha256 => MacState::<HmacCore<sha2::Sha256>>::boxed(algorithm, key),
        HashAlgorithm::Sha384 => MacState::<HmacCore<sha2::Sha384>>::boxed(algorithm, key),
        HashAlgorithm::Sha512 => MacState::<HmacCore<sha2::Sha512>>::boxed(algorithm, key),
    }
}

struct MacState<M> {
    mac: M,
    algorithm: HashAlgorithm,
}

impl<M: Mac + KeyInit + Send + 'static> MacState<M> {
    fn boxed(algorithm: HashAlgorithm, key: &[u8]) -> Result<Box<dyn Hmac>> {
        let mac = <M as KeyInit>::new_from_slice(key)
            .map_err(|e| Error::CryptoError(format!("HMAC key rejected: {}", e)))?;
        Ok(Box::new(Self { mac, algorithm }))
    }
}

impl<M: Mac + Send> Hmac for MacState<M> {
    fn update(&mut self, data: &[u8]) {
        Mac::update(&mut self.mac, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.mac.finalize().into_bytes().to_vec()
    }

    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}
