//! Security parameters: master secret and per-direction key material.
//!
//! ```text
//! master_secret = PRF(pre_master_secret, "master secret",
//!                     client_random + server_random)[0..47]
//!
//! key_block = PRF(master_secret, "key expansion",
//!                 server_random + client_random)
//!
//! client_write_MAC_key | server_write_MAC_key |
//! client_write_key     | server_write_key     |
//! client_write_IV      | server_write_IV
//! ```
//!
//! Sizing per record protection mode:
//!
//! | mode   | MAC key        | IV                       |
//! |--------|----------------|--------------------------|
//! | GCM    | 0              | 4 (salt)                 |
//! | CBC    | digest output  | cipher block size        |
//! | STREAM | digest output  | 0                        |
//!
//! Export suites negotiated at TLS 1.0 additionally run the RFC 2246 §6.3
//! expansion: the key block only supplies short raw keys, and the IVs are
//! derived from the randoms alone.

use std::fmt;

use tlsscope_crypto::{CipherAlgorithm, CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

use crate::cipher_suites::{self, CipherMode, CipherSuiteDescriptor};
use crate::error::{Error, Result};
use crate::keystore::SymmetricKeystore;
use crate::prf::{labels, Prf, MASTER_SECRET_LENGTH, RANDOM_LENGTH};
use crate::protocol::ProtocolVersion;

/// GCM implicit nonce part taken from the key block.
pub const GCM_SALT_LENGTH: usize = 4;

/// GCM explicit nonce carried in each record.
pub const GCM_EXPLICIT_NONCE_LENGTH: usize = 8;

/// Sizes the key block is cut into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySizes {
    /// MAC key length
    pub mac_key_length: usize,
    /// Cipher key length as taken from the key block
    pub cipher_key_length: usize,
    /// IV length
    pub iv_length: usize,
}

impl KeySizes {
    /// Sizes for a suite.
    pub fn for_suite(suite: &CipherSuiteDescriptor) -> Self {
        let mac_key_length = suite.mac.map_or(0, HashAlgorithm::output_size);
        let (mac_key_length, iv_length) = match suite.cipher.mode {
            CipherMode::Gcm => (0, GCM_SALT_LENGTH),
            CipherMode::Cbc => (mac_key_length, suite.cipher.block_size()),
            CipherMode::Stream => (mac_key_length, 0),
        };
        Self {
            mac_key_length,
            cipher_key_length: suite.cipher.key_length,
            iv_length,
        }
    }

    /// Key block length for both directions.
    pub const fn key_block_length(&self) -> usize {
        2 * (self.mac_key_length + self.cipher_key_length + self.iv_length)
    }
}

/// Everything derived from one negotiation.
#[derive(Clone)]
pub struct SecurityParameters {
    suite: &'static CipherSuiteDescriptor,
    version: ProtocolVersion,
    sizes: KeySizes,
    premaster_secret: Option<Zeroizing<Vec<u8>>>,
    master_secret: Zeroizing<Vec<u8>>,
    client_keystore: SymmetricKeystore,
    server_keystore: SymmetricKeystore,
}

impl SecurityParameters {
    /// Derive the master secret from the premaster secret, then the keys.
    ///
    /// # Errors
    ///
    /// - `UnsupportedCipherSuite` for ids missing from the registry
    /// - `InvalidLength` for randoms that are not 32 bytes
    pub fn from_premaster_secret(
        provider: &dyn CryptoProvider,
        prf: &Prf,
        suite_id: u16,
        premaster_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
    ) -> Result<Self> {
        let master_secret =
            prf.master_secret(provider, premaster_secret, client_random, server_random)?;
        let mut params = Self::from_master_secret(
            provider,
            prf,
            suite_id,
            &master_secret,
            client_random,
            server_random,
        )?;
        params.premaster_secret = Some(Zeroizing::new(premaster_secret.to_vec()));
        Ok(params)
    }

    /// Derive keys from an already known master secret (resumption).
    ///
    /// # Errors
    ///
    /// As [`SecurityParameters::from_premaster_secret`], plus `InvalidLength`
    /// when the master secret is not 48 bytes.
    pub fn from_master_secret(
        provider: &dyn CryptoProvider,
        prf: &Prf,
        suite_id: u16,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
    ) -> Result<Self> {
        let suite = cipher_suites::lookup(suite_id).ok_or(Error::UnsupportedCipherSuite(suite_id))?;
        if master_secret.len() != MASTER_SECRET_LENGTH {
            return Err(Error::invalid_length(
                "master secret",
                MASTER_SECRET_LENGTH,
                master_secret.len(),
            ));
        }
        for random in [client_random, server_random] {
            if random.len() != RANDOM_LENGTH {
                return Err(Error::invalid_length("random", RANDOM_LENGTH, random.len()));
            }
        }

        let version = prf.version();
        let sizes = KeySizes::for_suite(suite);
        let export = suite.export && version == ProtocolVersion::Tls10;
        // Export IVs do not come from the key block.
        let block_iv_length = if export { 0 } else { sizes.iv_length };
        let block_length = 2 * (sizes.mac_key_length + sizes.cipher_key_length + block_iv_length);

        tracing::debug!(
            suite = suite.name,
            mode = suite.cipher.mode.name(),
            mac_key_length = sizes.mac_key_length,
            cipher_key_length = sizes.cipher_key_length,
            iv_length = sizes.iv_length,
            block_length,
            export,
            "Deriving key block"
        );

        let key_block =
            prf.key_block(provider, master_secret, client_random, server_random, block_length)?;
        let mut block = KeyBlock::new(&key_block);
        let client_mac = block.take(sizes.mac_key_length);
        let server_mac = block.take(sizes.mac_key_length);
        let client_key = block.take(sizes.cipher_key_length);
        let server_key = block.take(sizes.cipher_key_length);
        let client_iv = block.take(block_iv_length);
        let server_iv = block.take(block_iv_length);
        debug_assert!(block.is_empty());

        let (client_keystore, server_keystore) = if export {
            let expanded = ExportKeys::derive(
                provider,
                prf,
                suite,
                sizes.iv_length,
                (client_key, server_key),
                client_random,
                server_random,
            )?;
            (
                SymmetricKeystore::new(expanded.client_key, client_mac.to_vec(), expanded.client_iv),
                SymmetricKeystore::new(expanded.server_key, server_mac.to_vec(), expanded.server_iv),
            )
        } else {
            (
                SymmetricKeystore::new(client_key.to_vec(), client_mac.to_vec(), client_iv.to_vec()),
                SymmetricKeystore::new(server_key.to_vec(), server_mac.to_vec(), server_iv.to_vec()),
            )
        };

        Ok(Self {
            suite,
            version,
            sizes,
            premaster_secret: None,
            master_secret: Zeroizing::new(master_secret.to_vec()),
            client_keystore,
            server_keystore,
        })
    }

    /// The negotiated suite.
    pub fn suite(&self) -> &'static CipherSuiteDescriptor {
        self.suite
    }

    /// The negotiated version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Record protection mode.
    pub fn cipher_mode(&self) -> CipherMode {
        self.suite.cipher.mode
    }

    /// Bulk cipher algorithm.
    pub fn cipher_algorithm(&self) -> CipherAlgorithm {
        self.suite.cipher.algorithm
    }

    /// Record MAC digest.
    pub fn mac_algorithm(&self) -> Option<HashAlgorithm> {
        self.suite.mac
    }

    /// Cipher block size (zero for stream ciphers).
    pub fn block_size(&self) -> usize {
        self.suite.cipher.block_size()
    }

    /// MAC key length.
    pub fn mac_key_length(&self) -> usize {
        self.sizes.mac_key_length
    }

    /// Cipher key length as taken from the key block.
    pub fn cipher_key_length(&self) -> usize {
        self.sizes.cipher_key_length
    }

    /// IV length.
    pub fn iv_length(&self) -> usize {
        self.sizes.iv_length
    }

    /// Key block sizing.
    pub fn sizes(&self) -> KeySizes {
        self.sizes
    }

    /// Premaster secret, when derivation started from one.
    pub fn premaster_secret(&self) -> Option<&[u8]> {
        self.premaster_secret.as_ref().map(|s| s.as_slice())
    }

    /// 48-byte master secret.
    pub fn master_secret(&self) -> &[u8] {
        &self.master_secret
    }

    /// Client write keys.
    pub fn client_keystore(&self) -> &SymmetricKeystore {
        &self.client_keystore
    }

    /// Server write keys.
    pub fn server_keystore(&self) -> &SymmetricKeystore {
        &self.server_keystore
    }
}

impl fmt::Debug for SecurityParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityParameters")
            .field("suite", &self.suite.name)
            .field("version", &self.version)
            .field("sizes", &self.sizes)
            .field("premaster_secret", &self.premaster_secret.as_ref().map(|_| "<redacted>"))
            .field("master_secret", &"<redacted>")
            .field("client_keystore", &self.client_keystore)
            .field("server_keystore", &self.server_keystore)
            .finish()
    }
}

impl fmt::Display for SecurityParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Security parameters: {} {}", self.version, self.suite)?;
        writeln!(
            f,
            "  cipher: {} {} (key {} bytes, block {} bytes)",
            self.suite.cipher.algorithm.name(),
            self.suite.cipher.mode.name(),
            self.sizes.cipher_key_length,
            self.block_size()
        )?;
        write!(
            f,
            "  mac: {} (key {} bytes), iv: {} bytes",
            self.suite.mac_name(),
            self.sizes.mac_key_length,
            self.sizes.iv_length
        )
    }
}

/// Sequential reader over the key block.
struct KeyBlock<'a> {
    rest: &'a [u8],
}

impl<'a> KeyBlock<'a> {
    fn new(block: &'a [u8]) -> Self {
        Self { rest: block }
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let (head, tail) = self.rest.split_at(len.min(self.rest.len()));
        self.rest = tail;
        head
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }
}

/// Final export-grade keys (RFC 2246 §6.3).
struct ExportKeys {
    client_key: Vec<u8>,
    server_key: Vec<u8>,
    client_iv: Vec<u8>,
    server_iv: Vec<u8>,
}

impl ExportKeys {
    fn derive(
        provider: &dyn CryptoProvider,
        prf: &Prf,
        suite: &CipherSuiteDescriptor,
        iv_length: usize,
        (client_key, server_key): (&[u8], &[u8]),
        client_random: &[u8],
        server_random: &[u8],
    ) -> Result<Self> {
        let mut seed = Vec::with_capacity(2 * RANDOM_LENGTH);
        seed.extend_from_slice(client_random);
        seed.extend_from_slice(server_random);

        let length = suite.expanded_key_length;
        let client_key = prf.compute(provider, client_key, labels::CLIENT_WRITE_KEY, &seed, length)?;
        let server_key = prf.compute(provider, server_key, labels::SERVER_WRITE_KEY, &seed, length)?;
        let mut ivs = prf.compute(provider, &[], labels::IV_BLOCK, &seed, 2 * iv_length)?;
        let server_iv = ivs.split_off(iv_length);
        Ok(Self {
            client_key,
            server_key,
            client_iv: ivs,
            server_iv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlsscope_crypto_rustcrypto::RustCryptoProvider;

    const CLIENT_RANDOM: [u8; 32] = [0x11; 32];
    const SERVER_RANDOM: [u8; 32] = [0x22; 32];

    fn derive(version: ProtocolVersion, suite_id: u16, pms: &[u8]) -> SecurityParameters {
        let provider = RustCryptoProvider::new();
        let suite = cipher_suites::lookup(suite_id).unwrap();
        let prf = Prf::for_suite(version, suite);
        SecurityParameters::from_premaster_secret(
            &provider,
            &prf,
            suite_id,
            pms,
            &CLIENT_RANDOM,
            &SERVER_RANDOM,
        )
        .unwrap()
    }

    #[test]
    fn test_sizing_by_mode() {
        let gcm = KeySizes::for_suite(cipher_suites::lookup(0x009c).unwrap());
        assert_eq!(
            gcm,
            KeySizes {
                mac_key_length: 0,
                cipher_key_length: 16,
                iv_length: 4
            }
        );
        let cbc = KeySizes::for_suite(cipher_suites::lookup(0x003d).unwrap());
        assert_eq!(
            cbc,
            KeySizes {
                mac_key_length: 32,
                cipher_key_length: 32,
                iv_length: 16
            }
        );
        let des = KeySizes::for_suite(cipher_suites::lookup(0x000a).unwrap());
        assert_eq!(des.iv_length, 8);
        let stream = KeySizes::for_suite(cipher_suites::lookup(0x0005).unwrap());
        assert_eq!(
            stream,
            KeySizes {
                mac_key_length: 20,
                cipher_key_length: 16,
                iv_length: 0
            }
        );
        assert_eq!(stream.key_block_length(), 72);
    }

    #[test]
    fn test_master_secret_length_for_every_suite() {
        let pms = [0x03u8; 48];
        for suite in cipher_suites::all() {
            for version in [ProtocolVersion::Tls10, ProtocolVersion::Tls12] {
                let params = derive(version, suite.id, &pms);
                assert_eq!(params.master_secret().len(), 48, "{}", suite);
                assert_eq!(params.premaster_secret(), Some(&pms[..]));
                let client = params.client_keystore();
                assert_eq!(client.mac_key.len(), params.mac_key_length(), "{}", suite);
                assert_eq!(client.iv.len(), params.iv_length(), "{}", suite);
                let expected_key = if suite.export && version == ProtocolVersion::Tls10 {
                    suite.expanded_key_length
                } else {
                    suite.cipher.key_length
                };
                assert_eq!(client.key.len(), expected_key, "{}", suite);
            }
        }
    }

    #[test]
    fn test_key_block_slicing_order() {
        let provider = RustCryptoProvider::new();
        let params = derive(ProtocolVersion::Tls12, 0x002f, &[0x03; 48]);
        let prf = Prf::new(ProtocolVersion::Tls12, None).unwrap();
        let block = prf
            .key_block(
                &provider,
                params.master_secret(),
                &CLIENT_RANDOM,
                &SERVER_RANDOM,
                104,
            )
            .unwrap();
        let client = params.client_keystore();
        let server = params.server_keystore();
        assert_eq!(&client.mac_key[..], &block[0..20]);
        assert_eq!(&server.mac_key[..], &block[20..40]);
        assert_eq!(&client.key[..], &block[40..56]);
        assert_eq!(&server.key[..], &block[56..72]);
        assert_eq!(&client.iv[..], &block[72..88]);
        assert_eq!(&server.iv[..], &block[88..104]);
    }

    #[test]
    fn test_from_master_secret_matches_full_derivation() {
        let provider = RustCryptoProvider::new();
        let full = derive(ProtocolVersion::Tls12, 0xc02f, &[0x03; 48]);
        let prf = Prf::for_suite(ProtocolVersion::Tls12, full.suite());
        let resumed = SecurityParameters::from_master_secret(
            &provider,
            &prf,
            0xc02f,
            full.master_secret(),
            &CLIENT_RANDOM,
            &SERVER_RANDOM,
        )
        .unwrap();
        assert_eq!(resumed.client_keystore(), full.client_keystore());
        assert_eq!(resumed.server_keystore(), full.server_keystore());
        assert!(resumed.premaster_secret().is_none());
    }

    #[test]
    fn test_independent_derivations_agree() {
        let a = derive(ProtocolVersion::Tls11, 0x0035, &[0x42; 48]);
        let b = derive(ProtocolVersion::Tls11, 0x0035, &[0x42; 48]);
        assert_eq!(a.master_secret(), b.master_secret());
        assert_eq!(a.client_keystore(), b.client_keystore());
        assert_eq!(a.server_keystore(), b.server_keystore());
        assert_ne!(a.client_keystore(), a.server_keystore());
    }

    #[test]
    fn test_export_expansion() {
        let provider = RustCryptoProvider::new();
        let params = derive(ProtocolVersion::Tls10, 0x0006, &[0x03; 48]);
        let prf = params_prf(ProtocolVersion::Tls10);
        // Key block holds two MD5 MAC keys and two 5-byte raw keys only.
        let block = prf
            .key_block(
                &provider,
                params.master_secret(),
                &CLIENT_RANDOM,
                &SERVER_RANDOM,
                42,
            )
            .unwrap();
        let mut seed = CLIENT_RANDOM.to_vec();
        seed.extend_from_slice(&SERVER_RANDOM);
        let client_key = prf
            .compute(&provider, &block[32..37], labels::CLIENT_WRITE_KEY, &seed, 16)
            .unwrap();
        let ivs = prf.compute(&provider, &[], labels::IV_BLOCK, &seed, 16).unwrap();
        assert_eq!(&params.client_keystore().key[..], &client_key[..]);
        assert_eq!(&params.client_keystore().iv[..], &ivs[..8]);
        assert_eq!(&params.server_keystore().iv[..], &ivs[8..]);
    }

    fn params_prf(version: ProtocolVersion) -> Prf {
        Prf::new(version, None).unwrap()
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let provider = RustCryptoProvider::new();
        let prf = params_prf(ProtocolVersion::Tls12);
        assert_eq!(
            SecurityParameters::from_master_secret(
                &provider,
                &prf,
                0x1301,
                &[0; 48],
                &CLIENT_RANDOM,
                &SERVER_RANDOM
            )
            .unwrap_err(),
            Error::UnsupportedCipherSuite(0x1301)
        );
        assert_eq!(
            SecurityParameters::from_master_secret(
                &provider,
                &prf,
                0x002f,
                &[0; 47],
                &CLIENT_RANDOM,
                &SERVER_RANDOM
            )
            .unwrap_err(),
            Error::invalid_length("master secret", 48, 47)
        );
        assert!(SecurityParameters::from_master_secret(
            &provider,
            &prf,
            0x002f,
            &[0; 48],
            &CLIENT_RANDOM[..31],
            &SERVER_RANDOM
        )
        .is_err());
    }
}
