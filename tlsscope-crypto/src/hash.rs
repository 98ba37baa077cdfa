//! Hash function interface.

/// Hash algorithms used by TLS 1.0 through 1.2.
///
/// MD5 and SHA-1 only appear in legacy MACs, the TLS 1.0/1.1 PRF and the
/// MD5||SHA1 handshake digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (16-byte output)
    Md5,
    /// SHA-1 (20-byte output)
    Sha1,
    /// SHA-256 (32-byte output)
    Sha256,
    /// SHA-384 (48-byte output)
    Sha384,
    /// SHA-512 (64-byte output)
    Sha512,
}

impl HashAlgorithm {
    /// Get the output size in bytes.
    pub const fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Get the internal block size in bytes.
    pub const fn block_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 | HashAlgorithm::Sha1 | HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 128,
        }
    }

    /// Conventional name, as it appears in cipher suite names.
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha1 => "SHA",
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
        }
    }
}

/// Incremental hash function.
///
/// # Example
///
/// ```rust,ignore
/// let mut hash = provider.hash(HashAlgorithm::Sha256)?;
/// hash.update(b"hello ");
/// hash.update(b"world");
/// let digest = hash.finalize();
/// ```
pub trait Hash: Send {
    /// Absorb more data.
    fn update(&mut self, data: &[u8]);

    /// Finish and return the digest. Consumes the state.
    fn finalize(self: Box<Self>) -> Vec<u8>;

    /// Output size in bytes.
    fn output_size(&self) -> usize {
        self.algorithm().output_size()
    }

    /// The algorithm this instance computes.
    fn algorithm(&self) -> HashAlgorithm;
}
