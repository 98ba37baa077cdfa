//! Ephemeral Diffie-Hellman: ECDH over P-256/P-384 and finite-field DH.

use num_bigint::BigUint;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use tlsscope_crypto::{
    Error, KeyExchange, KeyExchangeAlgorithm, PrivateKey, PublicKey, Random, Result, SharedSecret,
};

use crate::random::OsRandom;

/// Create an elliptic-curve key exchange instance.
pub fn create_key_exchange(algorithm: KeyExchangeAlgorithm) -> Result<Box<dyn KeyExchange>> {
    match algorithm {
        KeyExchangeAlgorithm::Secp256r1 => Ok(Box::new(EcdhP256)),
        KeyExchangeAlgorithm::Secp384r1 => Ok(Box::new(EcdhP384)),
        KeyExchangeAlgorithm::FiniteField => Err(Error::UnsupportedAlgorithm(
            "finite-field DH needs explicit group parameters".to_string(),
        )),
    }
}

/// Create a finite-field DH instance over the given group.
pub fn create_dh(prime: &[u8], generator: &[u8]) -> Result<Box<dyn KeyExchange>> {
    let prime = BigUint::from_bytes_be(prime);
    let generator = BigUint::from_bytes_be(generator);
    if prime <= BigUint::from(3u32) {
        return Err(Error::InvalidPublicKey(format!(
            "DH prime too small ({} bits)",
            prime.bits()
        )));
    }
    if generator < BigUint::from(2u32) || generator >= prime {
        return Err(Error::InvalidPublicKey(
            "DH generator out of range".to_string(),
        ));
    }
    Ok(Box::new(FiniteFieldDh { prime, generator }))
}

macro_rules! ecdh_curve {
    ($name:ident, $curve:ident, $algorithm:expr) => {
        #[derive(Debug)]
        struct $name;

        impl $name {
            fn secret(private_key: &PrivateKey) -> Result<$curve::SecretKey> {
                $curve::SecretKey::from_slice(private_key.as_bytes()).map_err(|_| {
                    Error::InvalidPrivateKey(format!(
                        "{} scalar of {} bytes rejected",
                        $algorithm.name(),
                        private_key.as_bytes().len()
                    ))
                })
            }
        }

        impl KeyExchange for $name {
            fn generate_keypair(&self) -> Result<(PrivateKey, PublicKey)> {
                let secret = $curve::SecretKey::random(&mut OsRng);
                let point = secret.public_key().to_encoded_point(false);
                Ok((
                    PrivateKey::from_bytes(secret.to_bytes().to_vec()),
                    PublicKey::from_bytes(point.as_bytes().to_vec()),
                ))
            }

            fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey> {
                let point = Self::secret(private_key)?
                    .public_key()
                    .to_encoded_point(false);
                Ok(PublicKey::from_bytes(point.as_bytes().to_vec()))
            }

            fn exchange(
                &self,
                private_key: &PrivateKey,
                peer_public_key: &[u8],
            ) -> Result<SharedSecret> {
                let secret = Self::secret(private_key)?;
                let peer = $curve::PublicKey::from_sec1_bytes(peer_public_key).map_err(|_| {
                    Error::InvalidPublicKey(format!(
                        "{} point of {} bytes is not on the curve",
                        $algorithm.name(),
                        peer_public_key.len()
                    ))
                })?;
                let shared =
                    $curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
                Ok(SharedSecret::from_bytes(shared.raw_secret_bytes().to_vec()))
            }

            fn algorithm(&self) -> KeyExchangeAlgorithm {
                $algorithm
            }
        }
    };
}

ecdh_curve!(EcdhP256, p256, KeyExchangeAlgorithm::Secp256r1);
ecdh_curve!(EcdhP384, p384, KeyExchangeAlgorithm::Secp384r1);

/// Classic DH over a server-supplied group (RFC 2631 style, no subgroup checks).
#[derive(Debug)]
struct FiniteFieldDh {
    prime: BigUint,
    generator: BigUint,
}

impl FiniteFieldDh {
    fn exponent(&self, private_key: &PrivateKey) -> Result<BigUint> {
        let x = BigUint::from_bytes_be(private_key.as_bytes());
        if x < BigUint::from(1u32) || x >= self.prime {
            return Err(Error::InvalidPrivateKey(
                "DH exponent out of range".to_string(),
            ));
        }
        Ok(x)
    }
}

impl KeyExchange for FiniteFieldDh {
    fn generate_keypair(&self) -> Result<(PrivateKey, PublicKey)> {
        let len = ((self.prime.bits() + 7) / 8) as usize;
        let bytes = OsRandom.generate(len)?;
        // x in [1, p - 2]
        let x = BigUint::from_bytes_be(&bytes) % (&self.prime - 2u32) + 1u32;
        let y = self.generator.modpow(&x, &self.prime);
        Ok((
            PrivateKey::from_bytes(x.to_bytes_be()),
            PublicKey::from_bytes(y.to_bytes_be()),
        ))
    }

    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey> {
        let x = self.exponent(private_key)?;
        Ok(PublicKey::from_bytes(
            self.generator.modpow(&x, &self.prime).to_bytes_be(),
        ))
    }

    fn exchange(&self, private_key: &PrivateKey, peer_public_key: &[u8]) -> Result<SharedSecret> {
        let x = self.exponent(private_key)?;
        let y = BigUint::from_bytes_be(peer_public_key);
        if y <= BigUint::from(1u32) || y >= &self.prime - 1u32 {
            return Err(Error::InvalidPublicKey(
                "DH public value out of range".to_string(),
            ));
        }
        // to_bytes_be carries no leading zero bytes
        Ok(SharedSecret::from_bytes(
            y.modpow(&x, &self.prime).to_bytes_be(),
        ))
    }

    fn algorithm(&self) -> KeyExchangeAlgorithm {
        KeyExchangeAlgorithm::FiniteField
    }
}
