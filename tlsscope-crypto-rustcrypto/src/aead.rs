//! AES-GCM using the `aes-gcm` crate.

use aes_gcm::aead::{Aead as AeadCipher, KeyInit, Nonce, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use tlsscope_crypto::{Aead, AeadAlgorithm, Error, Result};

/// Create an AEAD instance for the specified algorithm.
pub fn create_aead(algorithm: AeadAlgorithm) -> Result<Box<dyn Aead>> {
    Ok(Box::new(Gcm { algorithm }))
}

#[derive(Debug)]
struct Gcm {
    algorithm: AeadAlgorithm,
}

impl Gcm {
    fn check_nonce(&self, nonce: &[u8]) -> Result<()> {
        if nonce.len() != self.algorithm.nonce_size() {
            return Err(Error::InvalidNonceSize {
                expected: self.algorithm.nonce_size(),
                actual: nonce.len(),
            });
        }
        Ok(())
    }
}

fn keyed<C: KeyInit>(key: &[u8], expected: usize) -> Result<C> {
    C::new_from_slice(key).map_err(|_| Error::InvalidKeySize {
        expected,
        actual: key.len(),
    })
}

fn seal_with<C: AeadCipher + KeyInit>(
    key: &[u8],
    expected_key: usize,
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    keyed::<C>(key, expected_key)?
        .encrypt(Nonce::<C>::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| Error::EncryptionFailed)
}

fn open_with<C: AeadCipher + KeyInit>(
    key: &[u8],
    expected_key: usize,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    keyed::<C>(key, expected_key)?
        .decrypt(Nonce::<C>::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| Error::AuthenticationFailed)
}

impl Aead for Gcm {
    fn seal(&self, key: &[u8], nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.check_nonce(nonce)?;
        let expected = self.algorithm.key_size();
        match self.algorithm {
            AeadAlgorithm::Aes128Gcm => seal_with::<Aes128Gcm>(key, expected, nonce, aad, plaintext),
            AeadAlgorithm::Aes256Gcm => seal_with::<Aes256Gcm>(key, expected, nonce, aad, plaintext),
        }
    }

    fn open(&self, key: &[u8], nonce: &[u8], aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.check_nonce(nonce)?;
        if ciphertext.len() < self.algorithm.tag_size() {
            return Err(Error::InvalidLength);
        }
        let expected = self.algorithm.key_size();
        match self.algorithm {
            AeadAlgorithm::Aes128Gcm => open_with::<Aes128Gcm>(key, expected, nonce, aad, ciphertext),
            AeadAlgorithm::Aes256Gcm => open_with::<Aes256Gcm>(key, expected, nonce, aad, ciphertext),
        }
    }

    fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcm_round_trip() {
        let aead = create_aead(AeadAlgorithm::Aes128Gcm).unwrap();
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 12];
        let sealed = aead.seal(&key, &nonce, b"header", b"payload").unwrap();
        assert_eq!(sealed.len(), b"payload".len() + 16);

        let opened = aead.open(&key, &nonce, b"header", &sealed).unwrap();
        assert_eq!(opened, b"payload");
    }

    #[test]
    fn test_gcm_rejects_tampered_tag() {
        let aead = create_aead(AeadAlgorithm::Aes256Gcm).unwrap();
        let key = [0x33u8; 32];
        let nonce = [0x44u8; 12];
        let mut sealed = aead.seal(&key, &nonce, b"", b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert_eq!(
            aead.open(&key, &nonce, b"", &sealed),
            Err(Error::AuthenticationFailed)
        );
    }

    #[test]
    fn test_gcm_rejects_wrong_aad() {
        let aead = create_aead(AeadAlgorithm::Aes128Gcm).unwrap();
        let key = [0x55u8; 16];
        let nonce = [0x66u8; 12];
        let sealed = aead.seal(&key, &nonce, b"aad-1", b"payload").unwrap();
        assert!(aead.open(&key, &nonce, b"aad-2", &sealed).is_err());
    }

    #[test]
    fn test_gcm_key_and_nonce_sizes() {
        let aead = create_aead(AeadAlgorithm::Aes128Gcm).unwrap();
        assert!(matches!(
            aead.seal(&[0u8; 32], &[0u8; 12], b"", b"x"),
            Err(Error::InvalidKeySize { expected: 16, actual: 32 })
        ));
        assert!(matches!(
            aead.seal(&[0u8; 16], &[0u8; 8], b"", b"x"),
            Err(Error::InvalidNonceSize { expected: 12, actual: 8 })
        ));
    }
}
