//! RSA keys: certificate extraction, PEM/DER loading and PKCS#1 v1.5 operations.

use rand::rngs::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use tlsscope_crypto::{AsymmetricKey, Error, HashAlgorithm, Result, SignatureDigest};
use x509_parser::oid_registry::OID_PKCS1_RSAENCRYPTION;
use x509_parser::pem::Pem;

/// An RSA key pair, or only its public half.
pub struct RsaKey {
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
}

impl std::fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKey")
            .field("modulus_bits", &(self.public.size() * 8))
            .field("private", &self.private.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RsaKey {
    /// Wrap a private key.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        Self {
            public: private.to_public_key(),
            private: Some(private),
        }
    }

    /// Wrap a public key.
    pub fn from_public(public: RsaPublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }
}

/// Extract the RSA public key from a DER-encoded X.509 certificate.
pub fn public_key_from_certificate(der: &[u8]) -> Result<Box<dyn AsymmetricKey>> {
    let (_, certificate) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| Error::InvalidPublicKey(format!("certificate parse error: {}", e)))?;
    let spki = certificate.public_key();
    if spki.algorithm.algorithm != OID_PKCS1_RSAENCRYPTION {
        return Err(Error::UnsupportedAlgorithm(format!(
            "certificate key algorithm {}",
            spki.algorithm.algorithm
        )));
    }
    let public = RsaPublicKey::from_public_key_der(spki.raw)
        .map_err(|e| Error::InvalidPublicKey(format!("RSA key in certificate: {}", e)))?;
    Ok(Box::new(RsaKey::from_public(public)))
}

/// Load an RSA private key from PEM (any number of blocks) or raw DER.
pub fn private_key_from_bytes(data: &[u8], private_only: bool) -> Result<Box<dyn AsymmetricKey>> {
    if !contains(data, b"-----BEGIN ") {
        return decode_private_der(data)
            .map(|key| Box::new(RsaKey::from_private(key)) as Box<dyn AsymmetricKey>)
            .ok_or_else(|| Error::KeyNotFound("DER input is not an RSA private key".to_string()));
    }

    for block in Pem::iter_from_buffer(data) {
        let block = block.map_err(|e| Error::InvalidPrivateKey(format!("PEM error: {}", e)))?;
        if private_only && !block.label.contains("PRIVATE") {
            continue;
        }
        if let Some(key) = decode_private_der(&block.contents) {
            return Ok(Box::new(RsaKey::from_private(key)));
        }
    }
    Err(Error::KeyNotFound(
        "no RSA private key block in PEM input".to_string(),
    ))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn decode_private_der(der: &[u8]) -> Option<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs1_der(der)
        .ok()
        .or_else(|| RsaPrivateKey::from_pkcs8_der(der).ok())
}

fn signature_scheme(digest_kind: SignatureDigest) -> Pkcs1v15Sign {
    match digest_kind {
        SignatureDigest::Prefixed(HashAlgorithm::Md5) => Pkcs1v15Sign::new::<md5::Md5>(),
        SignatureDigest::Prefixed(HashAlgorithm::Sha1) => Pkcs1v15Sign::new::<sha1::Sha1>(),
        SignatureDigest::Prefixed(HashAlgorithm::Sha256) => Pkcs1v15Sign::new::<sha2::Sha256>(),
        SignatureDigest::Prefixed(HashAlgorithm::Sha384) => Pkcs1v15Sign::new::<sha2::Sha384>(),
        SignatureDigest::Prefixed(HashAlgorithm::Sha512) => Pkcs1v15Sign::new::<sha2::Sha512>(),
        SignatureDigest::Unprefixed => Pkcs1v15Sign::new_unprefixed(),
    }
}

impl RsaKey {
    fn private(&self) -> Result<&RsaPrivateKey> {
        self.private
            .as_ref()
            .ok_or_else(|| Error::InvalidPrivateKey("only the public key is loaded".to_string()))
    }
}

impl AsymmetricKey for RsaKey {
    fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    fn modulus_size(&self) -> usize {
        self.public.size()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.public
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
            .map_err(|_| Error::EncryptionFailed)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.private()?
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| Error::DecryptionFailed)
    }

    fn sign(&self, digest_kind: SignatureDigest, digest: &[u8]) -> Result<Vec<u8>> {
        self.private()?
            .sign(signature_scheme(digest_kind), digest)
            .map_err(|e| Error::CryptoError(format!("RSA signing failed: {}", e)))
    }

    fn verify(&self, digest_kind: SignatureDigest, digest: &[u8], signature: &[u8]) -> Result<()> {
        self.public
            .verify(signature_scheme(digest_kind), digest, signature)
            .map_err(|_| Error::SignatureVerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Digest;

    const SERVER_CERT: &[u8] = include_bytes!("../../tlsscope-core/tests/data/server.der");
    const ECDSA_CERT: &[u8] = include_bytes!("../../tlsscope-core/tests/data/ecdsa.der");
    const SERVER_KEY_PEM: &[u8] = include_bytes!("../../tlsscope-core/tests/data/server.key.pem");
    const SERVER_KEY_DER: &[u8] = include_bytes!("../../tlsscope-core/tests/data/server.key.der");
    const SERVER_BUNDLE: &[u8] = include_bytes!("../../tlsscope-core/tests/data/server.bundle.pem");
    const SERVER_PUBLIC_PEM: &[u8] = include_bytes!("../../tlsscope-core/tests/data/server.pub.pem");

    #[test]
    fn test_certificate_key_matches_private_key() {
        let public = public_key_from_certificate(SERVER_CERT).unwrap();
        let private = private_key_from_bytes(SERVER_KEY_PEM, true).unwrap();
        assert!(!public.has_private_key());
        assert!(private.has_private_key());
        assert_eq!(public.modulus_size(), 256);

        let ciphertext = public.encrypt(b"premaster").unwrap();
        assert_eq!(private.decrypt(&ciphertext).unwrap(), b"premaster");
    }

    #[test]
    fn test_ecdsa_certificate_is_unsupported() {
        assert!(matches!(
            public_key_from_certificate(ECDSA_CERT),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_garbage_certificate() {
        assert!(matches!(
            public_key_from_certificate(b"not a certificate"),
            Err(Error::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_load_pkcs8_der() {
        let key = private_key_from_bytes(SERVER_KEY_DER, false).unwrap();
        assert!(key.has_private_key());
    }

    #[test]
    fn test_bundle_skips_certificate_block() {
        let key = private_key_from_bytes(SERVER_BUNDLE, true).unwrap();
        assert!(key.has_private_key());
        let key = private_key_from_bytes(SERVER_BUNDLE, false).unwrap();
        assert!(key.has_private_key());
    }

    #[test]
    fn test_public_only_pem_is_not_found() {
        assert!(matches!(
            private_key_from_bytes(SERVER_PUBLIC_PEM, true),
            Err(Error::KeyNotFound(_))
        ));
        assert!(matches!(
            private_key_from_bytes(SERVER_PUBLIC_PEM, false),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_sign_verify_prefixed_and_unprefixed() {
        let key = private_key_from_bytes(SERVER_KEY_PEM, true).unwrap();
        let public = public_key_from_certificate(SERVER_CERT).unwrap();

        let digest = sha2::Sha256::digest(b"handshake messages").to_vec();
        let signature = key
            .sign(SignatureDigest::Prefixed(HashAlgorithm::Sha256), &digest)
            .unwrap();
        public
            .verify(SignatureDigest::Prefixed(HashAlgorithm::Sha256), &digest, &signature)
            .unwrap();

        let md5_sha1 = [0xabu8; 36];
        let signature = key.sign(SignatureDigest::Unprefixed, &md5_sha1).unwrap();
        public
            .verify(SignatureDigest::Unprefixed, &md5_sha1, &signature)
            .unwrap();
        assert_eq!(
            public.verify(SignatureDigest::Unprefixed, &[0xcdu8; 36], &signature),
            Err(Error::SignatureVerificationFailed)
        );
    }

    #[test]
    fn test_decrypt_needs_private_key() {
        let public = public_key_from_certificate(SERVER_CERT).unwrap();
        assert!(matches!(
            public.decrypt(&[0u8; 256]),
            Err(Error::InvalidPrivateKey(_))
        ));
    }
}
