//! Ephemeral Diffie-Hellman key exchange for TLS 1.0-1.2.

use crate::Result;
use zeroize::Zeroize;

/// Key exchange groups the provider can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyExchangeAlgorithm {
    /// secp256r1 (P-256, NIST curve)
    Secp256r1,
    /// secp384r1 (P-384, NIST curve)
    Secp384r1,
    /// Finite-field Diffie-Hellman over server-chosen (p, g).
    FiniteField,
}

impl KeyExchangeAlgorithm {
    /// Map an RFC 4492 named-curve id onto a supported curve.
    pub const fn from_named_curve(id: u16) -> Option<Self> {
        match id {
            0x0017 => Some(KeyExchangeAlgorithm::Secp256r1),
            0x0018 => Some(KeyExchangeAlgorithm::Secp384r1),
            _ => None,
        }
    }

    /// The RFC 4492 named-curve id, if this is a curve.
    pub const fn named_curve(self) -> Option<u16> {
        match self {
            KeyExchangeAlgorithm::Secp256r1 => Some(0x0017),
            KeyExchangeAlgorithm::Secp384r1 => Some(0x0018),
            KeyExchangeAlgorithm::FiniteField => None,
        }
    }

    /// Field element size in bytes for curves (one affine coordinate).
    pub const fn coordinate_size(self) -> Option<usize> {
        match self {
            KeyExchangeAlgorithm::Secp256r1 => Some(32),
            KeyExchangeAlgorithm::Secp384r1 => Some(48),
            KeyExchangeAlgorithm::FiniteField => None,
        }
    }

    /// Get the name of this group.
    pub const fn name(self) -> &'static str {
        match self {
            KeyExchangeAlgorithm::Secp256r1 => "secp256r1",
            KeyExchangeAlgorithm::Secp384r1 => "secp384r1",
            KeyExchangeAlgorithm::FiniteField => "ffdh",
        }
    }
}

/// Private key for key exchange.
///
/// Zeroized when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct PrivateKey {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl PrivateKey {
    /// Create a new private key from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the private key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Public key for key exchange.
///
/// Curves use the SEC1 uncompressed encoding (`0x04 || x || y`); finite-field
/// groups use the big-endian public value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Create a new public key from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the public key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert to owned bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Shared secret from key exchange.
///
/// Zeroized when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SharedSecret {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecret")
            .field("bytes", &"<redacted>")
            .finish()
    }
}

impl SharedSecret {
    /// Create a new shared secret from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get the shared secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Key exchange trait.
///
/// # Example (ECDHE)
///
/// ```rust,no_run
/// use tlsscope_crypto::KeyExchange;
///
/// fn key_exchange_example(kex: &dyn KeyExchange, server_point: &[u8]) {
///     let (private_key, public_key) = kex.generate_keypair().unwrap();
///     let premaster = kex.exchange(&private_key, server_point).unwrap();
/// }
/// ```
pub trait KeyExchange: Send + Sync {
    /// Generate an ephemeral key pair.
    fn generate_keypair(&self) -> Result<(PrivateKey, PublicKey)>;

    /// Rebuild the public half for a caller-supplied private key.
    ///
    /// # Errors
    ///
    /// `InvalidPrivateKey` if the scalar/exponent is out of range.
    fn public_key(&self, private_key: &PrivateKey) -> Result<PublicKey>;

    /// Perform key exchange.
    ///
    /// For curves the result is the affine x coordinate of the shared point.
    /// For finite-field groups it is `peer^private mod p` with leading zero
    /// bytes stripped (RFC 5246 §8.1.2).
    ///
    /// # Errors
    ///
    /// - `InvalidPublicKey` if peer's public key is invalid
    /// - `KeyExchangeFailed` for other errors
    fn exchange(&self, private_key: &PrivateKey, peer_public_key: &[u8]) -> Result<SharedSecret>;

    /// Get the algorithm this key exchange implements.
    fn algorithm(&self) -> KeyExchangeAlgorithm;
}
