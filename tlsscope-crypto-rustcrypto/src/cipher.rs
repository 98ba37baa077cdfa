//! Stream and CBC ciphers for TLS record protection.
//!
//! Block ciphers are always used in CBC mode with caller-managed IVs and no
//! padding; TLS does its own padding above this layer.

use cipher::consts::{U16, U5, U7, U8};
use cipher::generic_array::GenericArray;
use cipher::{
    BlockCipher, BlockDecryptMut, BlockEncryptMut, BlockSizeUser, InnerIvInit, KeyInit,
    StreamCipher,
};
use tlsscope_crypto::{Cipher, CipherAlgorithm, Error, Result};

/// Create a keyed cipher for the specified algorithm.
pub fn create_cipher(
    algorithm: CipherAlgorithm,
    key: &[u8],
    iv: &[u8],
) -> Result<Box<dyn Cipher>> {
    match algorithm {
        CipherAlgorithm::Null => Ok(Box::new(NullCipher)),
        CipherAlgorithm::Rc4 => create_rc4(key),
        CipherAlgorithm::Rc2 { effective_key_bits } => {
            if key.is_empty() || key.len() > 128 {
                return Err(Error::InvalidKeySize {
                    expected: 16,
                    actual: key.len(),
                });
            }
            let bits = effective_key_bits as usize;
            CbcCipher::boxed(
                algorithm,
                rc2::Rc2::new_with_eff_key_len(key, bits),
                rc2::Rc2::new_with_eff_key_len(key, bits),
                iv,
            )
        },
        CipherAlgorithm::Des => CbcCipher::boxed(
            algorithm,
            keyed::<des::Des>(key, 8)?,
            keyed::<des::Des>(key, 8)?,
            iv,
        ),
        CipherAlgorithm::TripleDes => CbcCipher::boxed(
            algorithm,
            keyed::<des::TdesEde3>(key, 24)?,
            keyed::<des::TdesEde3>(key, 24)?,
            iv,
        ),
        CipherAlgorithm::Aes => match key.len() {
            16 => CbcCipher::boxed(
                algorithm,
                keyed::<aes::Aes128>(key, 16)?,
                keyed::<aes::Aes128>(key, 16)?,
                iv,
            ),
            32 => CbcCipher::boxed(
                algorithm,
                keyed::<aes::Aes256>(key, 32)?,
                keyed::<aes::Aes256>(key, 32)?,
                iv,
            ),
            actual => Err(Error::InvalidKeySize {
                expected: 16,
                actual,
            }),
        },
    }
}

fn keyed<C: KeyInit>(key: &[u8], expected: usize) -> Result<C> {
    C::new_from_slice(key).map_err(|_| Error::InvalidKeySize {
        expected,
        actual: key.len(),
    })
}

fn create_rc4(key: &[u8]) -> Result<Box<dyn Cipher>> {
    match key.len() {
        5 => Rc4Cipher::<rc4::Rc4<U5>>::boxed(key),
        7 => Rc4Cipher::<rc4::Rc4<U7>>::boxed(key),
        8 => Rc4Cipher::<rc4::Rc4<U8>>::boxed(key),
        16 => Rc4Cipher::<rc4::Rc4<U16>>::boxed(key),
        n => Err(Error::UnsupportedAlgorithm(format!(
            "RC4 with a {}-byte key",
            n
        ))),
    }
}

/// Identity transform for `*_WITH_NULL_*` suites.
#[derive(Debug)]
struct NullCipher;

impl Cipher for NullCipher {
    fn encrypt(&mut self, _data: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn decrypt(&mut self, _data: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn algorithm(&self) -> CipherAlgorithm {
        CipherAlgorithm::Null
    }
}

/// RC4 with independent keystreams for each direction of use.
struct Rc4Cipher<S> {
    encryptor: S,
    decryptor: S,
}

impl<S: KeyInit + StreamCipher + Send + 'static> Rc4Cipher<S> {
    fn boxed(key: &[u8]) -> Result<Box<dyn Cipher>> {
        let encryptor = keyed::<S>(key, key.len())?;
        let decryptor = keyed::<S>(key, key.len())?;
        Ok(Box::new(Self {
            encryptor,
            decryptor,
        }))
    }
}

impl<S: StreamCipher + Send> Cipher for Rc4Cipher<S> {
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        self.encryptor.apply_keystream(data);
        Ok(())
    }

    fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        self.decryptor.apply_keystream(data);
        Ok(())
    }

    fn algorithm(&self) -> CipherAlgorithm {
        CipherAlgorithm::Rc4
    }
}

/// CBC mode over any block cipher. The chaining value persists between
/// calls, which gives TLS 1.0 its implicit IV.
struct CbcCipher<C>
where
    C: BlockEncryptMut + BlockDecryptMut + BlockCipher,
{
    algorithm: CipherAlgorithm,
    encryptor: cbc::Encryptor<C>,
    decryptor: cbc::Decryptor<C>,
}

impl<C> CbcCipher<C>
where
    C: BlockEncryptMut + BlockDecryptMut + BlockCipher + Send + 'static,
{
    fn boxed(
        algorithm: CipherAlgorithm,
        encrypt_inner: C,
        decrypt_inner: C,
        iv: &[u8],
    ) -> Result<Box<dyn Cipher>> {
        let iv_error = || Error::InvalidNonceSize {
            expected: C::block_size(),
            actual: iv.len(),
        };
        let encryptor = cbc::Encryptor::inner_iv_slice_init(encrypt_inner, iv).map_err(|_| iv_error())?;
        let decryptor = cbc::Decryptor::inner_iv_slice_init(decrypt_inner, iv).map_err(|_| iv_error())?;
        Ok(Box::new(Self {
            algorithm,
            encryptor,
            decryptor,
        }))
    }
}

impl<C> Cipher for CbcCipher<C>
where
    C: BlockEncryptMut + BlockDecryptMut + BlockCipher + Send,
{
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let block_size = C::block_size();
        if data.len() % block_size != 0 {
            return Err(Error::InvalidLength);
        }
        for block in data.chunks_exact_mut(block_size) {
            self.encryptor
                .encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    fn decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let block_size = C::block_size();
        if data.len() % block_size != 0 {
            return Err(Error::InvalidLength);
        }
        for block in data.chunks_exact_mut(block_size) {
            self.decryptor
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }

    fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes128_cbc_nist_vector() {
        // NIST SP 800-38A F.2.1, first block
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let mut data = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();

        let mut cipher = create_cipher(CipherAlgorithm::Aes, &key, &iv).unwrap();
        cipher.encrypt(&mut data).unwrap();
        assert_eq!(hex::encode(&data), "7649abac8119b246cee98e9b12e9197d");
    }

    #[test]
    fn test_cbc_chains_across_calls() {
        let key = [7u8; 16];
        let iv = [9u8; 16];
        let plaintext = [0x42u8; 48];

        let mut one_shot = plaintext;
        create_cipher(CipherAlgorithm::Aes, &key, &iv)
            .unwrap()
            .encrypt(&mut one_shot)
            .unwrap();

        let mut cipher = create_cipher(CipherAlgorithm::Aes, &key, &iv).unwrap();
        let mut first = [0x42u8; 16];
        let mut rest = [0x42u8; 32];
        cipher.encrypt(&mut first).unwrap();
        cipher.encrypt(&mut rest).unwrap();

        assert_eq!(&one_shot[..16], &first[..]);
        assert_eq!(&one_shot[16..], &rest[..]);

        let mut decryptor = create_cipher(CipherAlgorithm::Aes, &key, &iv).unwrap();
        decryptor.decrypt(&mut first).unwrap();
        decryptor.decrypt(&mut rest).unwrap();
        assert_eq!(first, [0x42u8; 16]);
        assert_eq!(rest, [0x42u8; 32]);
    }

    #[test]
    fn test_block_ciphers_round_trip() {
        let cases = [
            (CipherAlgorithm::Des, 8usize),
            (CipherAlgorithm::TripleDes, 24),
            (CipherAlgorithm::Rc2 { effective_key_bits: 40 }, 16),
            (CipherAlgorithm::Aes, 32),
        ];
        for (algorithm, key_len) in cases {
            let key = vec![0x5au8; key_len];
            let iv = vec![0x11u8; algorithm.block_size()];
            let mut data = vec![0xa5u8; algorithm.block_size() * 3];
            let mut cipher = create_cipher(algorithm, &key, &iv).unwrap();
            cipher.encrypt(&mut data).unwrap();
            assert_ne!(data, vec![0xa5u8; algorithm.block_size() * 3]);
            cipher.decrypt(&mut data).unwrap();
            assert_eq!(data, vec![0xa5u8; algorithm.block_size() * 3], "{:?}", algorithm);
        }
    }

    #[test]
    fn test_partial_block_rejected() {
        let mut cipher = create_cipher(CipherAlgorithm::Aes, &[0u8; 16], &[0u8; 16]).unwrap();
        let mut data = [0u8; 15];
        assert_eq!(cipher.encrypt(&mut data), Err(Error::InvalidLength));
    }

    #[test]
    fn test_wrong_iv_size_rejected() {
        let result = create_cipher(CipherAlgorithm::Aes, &[0u8; 16], &[0u8; 8]);
        assert!(matches!(
            result,
            Err(Error::InvalidNonceSize {
                expected: 16,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_rc4_keystream_continues() {
        let key = [3u8; 16];
        let mut cipher = create_cipher(CipherAlgorithm::Rc4, &key, &[]).unwrap();
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        cipher.encrypt(&mut a).unwrap();
        cipher.encrypt(&mut b).unwrap();
        assert_ne!(a, b);

        cipher.decrypt(&mut a).unwrap();
        cipher.decrypt(&mut b).unwrap();
        assert_eq!(a, [0u8; 8]);
        assert_eq!(b, [0u8; 8]);
    }

    #[test]
    fn test_rc4_export_key_sizes() {
        for len in [5usize, 8, 16] {
            assert!(create_cipher(CipherAlgorithm::Rc4, &vec![1u8; len], &[]).is_ok());
        }
        assert!(create_cipher(CipherAlgorithm::Rc4, &[1u8; 3], &[]).is_err());
    }

    #[test]
    fn test_null_cipher_is_identity() {
        let mut cipher = create_cipher(CipherAlgorithm::Null, &[], &[]).unwrap();
        let mut data = *b"plaintext";
        cipher.encrypt(&mut data).unwrap();
        assert_eq!(&data, b"plaintext");
    }
}
