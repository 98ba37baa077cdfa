//! TLS 1.0-1.2 cipher suite registry.
//!
//! A cipher suite fixes the whole record-protection recipe:
//! - Key exchange (RSA key transport, DHE, ECDHE)
//! - Server authentication (RSA, DSA, ECDSA)
//! - Bulk cipher, its key length and mode (stream, CBC, GCM)
//! - Record MAC digest, and for TLS 1.2 the PRF digest
//!
//! Format: TLS_{KeyExchange}_{Authentication}_WITH_{Encryption}_{Hash}
//!
//! The table is plain data. Algorithm implementations are obtained from a
//! [`tlsscope_crypto::CryptoProvider`] when a session needs them.

use tlsscope_crypto::{CipherAlgorithm, HashAlgorithm};

/// How the premaster secret is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchangeKind {
    /// No key exchange (`TLS_NULL_WITH_NULL_NULL`).
    Null,
    /// RSA key transport.
    Rsa,
    /// Ephemeral finite-field Diffie-Hellman.
    Dhe,
    /// Ephemeral elliptic-curve Diffie-Hellman.
    Ecdhe,
}

impl KeyExchangeKind {
    /// Name as used in suite names.
    pub const fn name(self) -> &'static str {
        match self {
            KeyExchangeKind::Null => "NULL",
            KeyExchangeKind::Rsa => "RSA",
            KeyExchangeKind::Dhe => "DHE",
            KeyExchangeKind::Ecdhe => "ECDHE",
        }
    }
}

/// Server authentication algorithm of ephemeral key exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// RSA signatures
    Rsa,
    /// DSA (DSS) signatures
    Dsa,
    /// ECDSA signatures
    Ecdsa,
}

impl SignatureKind {
    /// Name as used in suite names.
    pub const fn name(self) -> &'static str {
        match self {
            SignatureKind::Rsa => "RSA",
            SignatureKind::Dsa => "DSS",
            SignatureKind::Ecdsa => "ECDSA",
        }
    }
}

/// Record protection family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherMode {
    /// Stream cipher (RC4, NULL): `data || MAC`
    Stream,
    /// Block cipher in CBC mode: MAC-then-pad-then-encrypt
    Cbc,
    /// AES-GCM AEAD
    Gcm,
}

impl CipherMode {
    /// Mode name.
    pub const fn name(self) -> &'static str {
        match self {
            CipherMode::Stream => "STREAM",
            CipherMode::Cbc => "CBC",
            CipherMode::Gcm => "GCM",
        }
    }
}

/// Bulk cipher of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BulkCipher {
    /// Cipher family
    pub algorithm: CipherAlgorithm,
    /// Key length in bytes as taken from the key block
    pub key_length: usize,
    /// Record protection mode
    pub mode: CipherMode,
}

impl BulkCipher {
    const fn new(algorithm: CipherAlgorithm, key_length: usize, mode: CipherMode) -> Self {
        Self {
            algorithm,
            key_length,
            mode,
        }
    }

    /// Cipher block size in bytes (zero for stream ciphers).
    pub const fn block_size(&self) -> usize {
        self.algorithm.block_size()
    }
}

/// Registry entry for one cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuiteDescriptor {
    /// IANA identifier
    pub id: u16,
    /// IANA name
    pub name: &'static str,
    /// Export-grade suite
    pub export: bool,
    /// Key exchange method
    pub key_exchange: KeyExchangeKind,
    /// Server signature algorithm for ephemeral key exchange
    pub signature: Option<SignatureKind>,
    /// Bulk cipher
    pub cipher: BulkCipher,
    /// Record MAC digest; `None` for AEAD and NULL-MAC suites
    pub mac: Option<HashAlgorithm>,
    /// TLS 1.2 PRF digest when it is not SHA-256
    pub prf_digest: Option<HashAlgorithm>,
    /// Final key length after export key expansion (RFC 2246 §6.3)
    pub expanded_key_length: usize,
}

impl CipherSuiteDescriptor {
    const fn new(
        id: u16,
        name: &'static str,
        key_exchange: KeyExchangeKind,
        signature: Option<SignatureKind>,
        cipher: BulkCipher,
        mac: Option<HashAlgorithm>,
    ) -> Self {
        Self {
            id,
            name,
            export: false,
            key_exchange,
            signature,
            cipher,
            mac,
            prf_digest: None,
            expanded_key_length: cipher.key_length,
        }
    }

    const fn exportable(mut self, expanded_key_length: usize) -> Self {
        self.export = true;
        self.expanded_key_length = expanded_key_length;
        self
    }

    const fn prf(mut self, digest: HashAlgorithm) -> Self {
        self.prf_digest = Some(digest);
        self
    }

    /// Whether records are actually encrypted.
    pub const fn is_null_cipher(&self) -> bool {
        matches!(self.cipher.algorithm, CipherAlgorithm::Null)
    }

    /// MAC name, `"NULL"` when the suite has no record MAC.
    pub const fn mac_name(&self) -> &'static str {
        match self.mac {
            Some(digest) => digest.name(),
            None => "NULL",
        }
    }
}

impl std::fmt::Display for CipherSuiteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:04x})", self.name, self.id)
    }
}

/// Look up a suite by its identifier.
pub fn lookup(id: u16) -> Option<&'static CipherSuiteDescriptor> {
    CIPHER_SUITES.iter().find(|suite| suite.id == id)
}

/// Every registered suite.
pub fn all() -> &'static [CipherSuiteDescriptor] {
    CIPHER_SUITES
}

use CipherAlgorithm as A;
use CipherMode::{Cbc, Gcm, Stream};
use HashAlgorithm::{Md5, Sha1, Sha256, Sha384};
use KeyExchangeKind::{Dhe, Ecdhe, Rsa as RsaKx};
use SignatureKind::{Dsa, Ecdsa, Rsa as RsaSig};

const NULL: BulkCipher = BulkCipher::new(A::Null, 0, Stream);
const RC4_40: BulkCipher = BulkCipher::new(A::Rc4, 5, Stream);
const RC4_56: BulkCipher = BulkCipher::new(A::Rc4, 7, Stream);
const RC4_128: BulkCipher = BulkCipher::new(A::Rc4, 16, Stream);
const RC2_CBC_40: BulkCipher = BulkCipher::new(A::Rc2 { effective_key_bits: 40 }, 5, Cbc);
const RC2_CBC_56: BulkCipher = BulkCipher::new(A::Rc2 { effective_key_bits: 56 }, 7, Cbc);
const DES40_CBC: BulkCipher = BulkCipher::new(A::Des, 5, Cbc);
const DES56_CBC: BulkCipher = BulkCipher::new(A::Des, 7, Cbc);
const DES_CBC: BulkCipher = BulkCipher::new(A::Des, 8, Cbc);
const DES3_EDE_CBC: BulkCipher = BulkCipher::new(A::TripleDes, 24, Cbc);
const AES_128_CBC: BulkCipher = BulkCipher::new(A::Aes, 16, Cbc);
const AES_256_CBC: BulkCipher = BulkCipher::new(A::Aes, 32, Cbc);
const AES_128_GCM: BulkCipher = BulkCipher::new(A::Aes, 16, Gcm);
const AES_256_GCM: BulkCipher = BulkCipher::new(A::Aes, 32, Gcm);

const fn rsa(id: u16, name: &'static str, cipher: BulkCipher, mac: Option<HashAlgorithm>) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor::new(id, name, RsaKx, None, cipher, mac)
}

const fn dhe(
    id: u16,
    name: &'static str,
    signature: SignatureKind,
    cipher: BulkCipher,
    mac: Option<HashAlgorithm>,
) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor::new(id, name, Dhe, Some(signature), cipher, mac)
}

const fn ecdhe(
    id: u16,
    name: &'static str,
    signature: SignatureKind,
    cipher: BulkCipher,
    mac: Option<HashAlgorithm>,
) -> CipherSuiteDescriptor {
    CipherSuiteDescriptor::new(id, name, Ecdhe, Some(signature), cipher, mac)
}

static CIPHER_SUITES: &[CipherSuiteDescriptor] = &[
    CipherSuiteDescriptor::new(0x0000, "TLS_NULL_WITH_NULL_NULL", KeyExchangeKind::Null, None, NULL, None),
    // RSA key transport
    rsa(0x0001, "TLS_RSA_WITH_NULL_MD5", NULL, Some(Md5)),
    rsa(0x0002, "TLS_RSA_WITH_NULL_SHA", NULL, Some(Sha1)),
    rsa(0x003b, "TLS_RSA_WITH_NULL_SHA256", NULL, Some(Sha256)),
    rsa(0x0003, "TLS_RSA_EXPORT_WITH_RC4_40_MD5", RC4_40, Some(Md5)).exportable(16),
    rsa(0x0004, "TLS_RSA_WITH_RC4_128_MD5", RC4_128, Some(Md5)),
    rsa(0x0005, "TLS_RSA_WITH_RC4_128_SHA", RC4_128, Some(Sha1)),
    rsa(0x0006, "TLS_RSA_EXPORT_WITH_RC2_CBC_40_MD5", RC2_CBC_40, Some(Md5)).exportable(16),
    rsa(0x0008, "TLS_RSA_EXPORT_WITH_DES40_CBC_SHA", DES40_CBC, Some(Sha1)).exportable(8),
    rsa(0x0009, "TLS_RSA_WITH_DES_CBC_SHA", DES_CBC, Some(Sha1)),
    rsa(0x000a, "TLS_RSA_WITH_3DES_EDE_CBC_SHA", DES3_EDE_CBC, Some(Sha1)),
    rsa(0x002f, "TLS_RSA_WITH_AES_128_CBC_SHA", AES_128_CBC, Some(Sha1)),
    rsa(0x0035, "TLS_RSA_WITH_AES_256_CBC_SHA", AES_256_CBC, Some(Sha1)),
    rsa(0x003c, "TLS_RSA_WITH_AES_128_CBC_SHA256", AES_128_CBC, Some(Sha256)),
    rsa(0x003d, "TLS_RSA_WITH_AES_256_CBC_SHA256", AES_256_CBC, Some(Sha256)),
    rsa(0x0060, "TLS_RSA_EXPORT1024_WITH_RC4_56_MD5", RC4_56, Some(Md5)).exportable(16),
    rsa(0x0061, "TLS_RSA_EXPORT1024_WITH_RC2_CBC_56_MD5", RC2_CBC_56, Some(Md5)).exportable(16),
    rsa(0x0062, "TLS_RSA_EXPORT1024_WITH_DES_CBC_SHA", DES56_CBC, Some(Sha1)).exportable(8),
    rsa(0x0064, "TLS_RSA_EXPORT1024_WITH_RC4_56_SHA", RC4_56, Some(Sha1)).exportable(16),
    rsa(0x009c, "TLS_RSA_WITH_AES_128_GCM_SHA256", AES_128_GCM, None).prf(Sha256),
    rsa(0x009d, "TLS_RSA_WITH_AES_256_GCM_SHA384", AES_256_GCM, None).prf(Sha384),
    // DHE with DSS certificates
    dhe(0x0011, "TLS_DHE_DSS_EXPORT_WITH_DES40_CBC_SHA", Dsa, DES40_CBC, Some(Sha1)).exportable(8),
    dhe(0x0012, "TLS_DHE_DSS_WITH_DES_CBC_SHA", Dsa, DES_CBC, Some(Sha1)),
    dhe(0x0013, "TLS_DHE_DSS_WITH_3DES_EDE_CBC_SHA", Dsa, DES3_EDE_CBC, Some(Sha1)),
    dhe(0x0032, "TLS_DHE_DSS_WITH_AES_128_CBC_SHA", Dsa, AES_128_CBC, Some(Sha1)),
    dhe(0x0038, "TLS_DHE_DSS_WITH_AES_256_CBC_SHA", Dsa, AES_256_CBC, Some(Sha1)),
    dhe(0x0040, "TLS_DHE_DSS_WITH_AES_128_CBC_SHA256", Dsa, AES_128_CBC, Some(Sha256)),
    dhe(0x006a, "TLS_DHE_DSS_WITH_AES_256_CBC_SHA256", Dsa, AES_256_CBC, Some(Sha256)),
    dhe(0x0063, "TLS_DHE_DSS_EXPORT1024_WITH_DES_CBC_SHA", Dsa, DES56_CBC, Some(Sha1)).exportable(8),
    dhe(0x0065, "TLS_DHE_DSS_EXPORT1024_WITH_RC4_56_SHA", Dsa, RC4_56, Some(Sha1)).exportable(16),
    dhe(0x0066, "TLS_DHE_DSS_WITH_RC4_128_SHA", Dsa, RC4_128, Some(Sha1)),
    dhe(0x00a2, "TLS_DHE_DSS_WITH_AES_128_GCM_SHA256", Dsa, AES_128_GCM, None).prf(Sha256),
    dhe(0x00a3, "TLS_DHE_DSS_WITH_AES_256_GCM_SHA384", Dsa, AES_256_GCM, None).prf(Sha384),
    // DHE with RSA certificates
    dhe(0x0014, "TLS_DHE_RSA_EXPORT_WITH_DES40_CBC_SHA", RsaSig, DES40_CBC, Some(Sha1)).exportable(8),
    dhe(0x0015, "TLS_DHE_RSA_WITH_DES_CBC_SHA", RsaSig, DES_CBC, Some(Sha1)),
    dhe(0x0016, "TLS_DHE_RSA_WITH_3DES_EDE_CBC_SHA", RsaSig, DES3_EDE_CBC, Some(Sha1)),
    dhe(0x0033, "TLS_DHE_RSA_WITH_AES_128_CBC_SHA", RsaSig, AES_128_CBC, Some(Sha1)),
    dhe(0x0039, "TLS_DHE_RSA_WITH_AES_256_CBC_SHA", RsaSig, AES_256_CBC, Some(Sha1)),
    dhe(0x0067, "TLS_DHE_RSA_WITH_AES_128_CBC_SHA256", RsaSig, AES_128_CBC, Some(Sha256)),
    dhe(0x006b, "TLS_DHE_RSA_WITH_AES_256_CBC_SHA256", RsaSig, AES_256_CBC, Some(Sha256)),
    dhe(0x009e, "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256", RsaSig, AES_128_GCM, None).prf(Sha256),
    dhe(0x009f, "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384", RsaSig, AES_256_GCM, None).prf(Sha384),
    // ECDHE with ECDSA certificates
    ecdhe(0xc006, "TLS_ECDHE_ECDSA_WITH_NULL_SHA", Ecdsa, NULL, Some(Sha1)),
    ecdhe(0xc007, "TLS_ECDHE_ECDSA_WITH_RC4_128_SHA", Ecdsa, RC4_128, Some(Sha1)),
    ecdhe(0xc008, "TLS_ECDHE_ECDSA_WITH_3DES_EDE_CBC_SHA", Ecdsa, DES3_EDE_CBC, Some(Sha1)),
    ecdhe(0xc009, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA", Ecdsa, AES_128_CBC, Some(Sha1)),
    ecdhe(0xc00a, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA", Ecdsa, AES_256_CBC, Some(Sha1)),
    ecdhe(0xc023, "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256", Ecdsa, AES_128_CBC, Some(Sha256)),
    ecdhe(0xc024, "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384", Ecdsa, AES_256_CBC, Some(Sha384)).prf(Sha384),
    ecdhe(0xc02b, "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256", Ecdsa, AES_128_GCM, None).prf(Sha256),
    ecdhe(0xc02c, "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384", Ecdsa, AES_256_GCM, None).prf(Sha384),
    // ECDHE with RSA certificates
    ecdhe(0xc010, "TLS_ECDHE_RSA_WITH_NULL_SHA", RsaSig, NULL, Some(Sha1)),
    ecdhe(0xc011, "TLS_ECDHE_RSA_WITH_RC4_128_SHA", RsaSig, RC4_128, Some(Sha1)),
    ecdhe(0xc012, "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA", RsaSig, DES3_EDE_CBC, Some(Sha1)),
    ecdhe(0xc013, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA", RsaSig, AES_128_CBC, Some(Sha1)),
    ecdhe(0xc014, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA", RsaSig, AES_256_CBC, Some(Sha1)),
    ecdhe(0xc027, "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256", RsaSig, AES_128_CBC, Some(Sha256)),
    ecdhe(0xc028, "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384", RsaSig, AES_256_CBC, Some(Sha384)).prf(Sha384),
    ecdhe(0xc02f, "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256", RsaSig, AES_128_GCM, None).prf(Sha256),
    ecdhe(0xc030, "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384", RsaSig, AES_256_GCM, None).prf(Sha384),
];
