//! Stateful symmetric cipher interface for stream and CBC record protection.

use crate::Result;

/// Symmetric cipher algorithms found in TLS 1.0-1.2 cipher suites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    /// Identity transform used by `*_WITH_NULL_*` suites.
    Null,
    /// RC4 stream cipher.
    Rc4,
    /// RC2 in CBC mode. Export suites reduce the effective key strength.
    Rc2 {
        /// Effective key bits (RFC 2268)
        effective_key_bits: u16,
    },
    /// Single DES in CBC mode.
    Des,
    /// Triple DES (EDE3) in CBC mode.
    TripleDes,
    /// AES in CBC mode, 128 or 256 bit depending on the key.
    Aes,
}

impl CipherAlgorithm {
    /// Block size in bytes; zero for stream ciphers and the null cipher.
    pub const fn block_size(self) -> usize {
        match self {
            CipherAlgorithm::Null | CipherAlgorithm::Rc4 => 0,
            CipherAlgorithm::Rc2 { .. } | CipherAlgorithm::Des | CipherAlgorithm::TripleDes => 8,
            CipherAlgorithm::Aes => 16,
        }
    }

    /// Whether this is a stream cipher (including the null cipher).
    pub const fn is_stream(self) -> bool {
        self.block_size() == 0
    }

    /// Cipher family name.
    pub const fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::Null => "NULL",
            CipherAlgorithm::Rc4 => "RC4",
            CipherAlgorithm::Rc2 { .. } => "RC2",
            CipherAlgorithm::Des => "DES",
            CipherAlgorithm::TripleDes => "3DES",
            CipherAlgorithm::Aes => "AES",
        }
    }
}

/// A keyed cipher instance.
///
/// Instances keep their chaining state: the RC4 keystream position, or the
/// last ciphertext block for CBC. Encryption and decryption each have their
/// own state, so one instance can serve both halves of a record stream.
pub trait Cipher: Send {
    /// Encrypt `data` in place.
    ///
    /// # Errors
    ///
    /// `InvalidLength` if a block cipher receives a partial block.
    fn encrypt(&mut self, data: &mut [u8]) -> Result<()>;

    /// Decrypt `data` in place.
    ///
    /// # Errors
    ///
    /// `InvalidLength` if a block cipher receives a partial block.
    fn decrypt(&mut self, data: &mut [u8]) -> Result<()>;

    /// The algorithm this instance implements.
    fn algorithm(&self) -> CipherAlgorithm;

    /// Block size in bytes (zero for stream ciphers).
    fn block_size(&self) -> usize {
        self.algorithm().block_size()
    }
}
