//! Error types for the session layer.
//!
//! Every variant maps onto one [`ErrorKind`], which is what callers should
//! branch on when deciding whether a capture can keep being processed.

use thiserror::Error;

use crate::cipher_suites::CipherMode;

/// Result type for session-layer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unsupported suite or mode, mismatched key-exchange stores. The
    /// session's crypto is unusable.
    Configuration,
    /// Malformed input: bad lengths, bad point encodings.
    Validation,
    /// MAC, padding or AEAD tag verification failed.
    Integrity,
    /// A gap the caller can fill by supplying key material manually.
    UnsupportedFeature,
    /// An operation was requested before its inputs were derived.
    State,
}

/// Session-layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The cipher suite id has no registry entry.
    #[error("Unsupported cipher suite 0x{0:04x}")]
    UnsupportedCipherSuite(u16),

    /// No crypto engine handles this cipher mode, or an engine was handed a
    /// container for another mode.
    #[error("Unsupported cipher mode {mode:?}: {reason}")]
    UnsupportedCipherMode {
        /// The offending mode
        mode: CipherMode,
        /// What was attempted
        reason: String,
    },

    /// Client and server key-exchange stores are of different kinds.
    #[error("Key exchange mismatch: expected {expected} parameters, found {actual}")]
    KeyExchangeMismatch {
        /// Kind required by the operation
        expected: &'static str,
        /// Kind actually stored
        actual: &'static str,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A field has the wrong length.
    #[error("Invalid {field} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Name of the field
        field: &'static str,
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Malformed input.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Record MAC or CBC padding did not verify.
    #[error("Bad record MAC at sequence number {sequence}")]
    MacVerificationFailed {
        /// Sequence number the record was checked under
        sequence: u64,
    },

    /// AEAD tag did not verify.
    #[error("AEAD authentication failed at sequence number {sequence}")]
    AuthenticationFailed {
        /// Sequence number the record was checked under
        sequence: u64,
    },

    /// The RSA-encrypted premaster secret did not decrypt to 48 bytes.
    #[error("RSA premaster secret decryption failed")]
    PremasterDecryptionFailed,

    /// The named curve is not supported.
    #[error("Unknown elliptic curve id 0x{0:04x}")]
    UnknownCurve(u16),

    /// Feature gap the caller can work around.
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Operation requested before prerequisite derivation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Failure inside the crypto provider.
    #[error("Cryptographic error: {0}")]
    Crypto(#[from] tlsscope_crypto::Error),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use tlsscope_crypto::Error as CryptoError;

        match self {
            Error::UnsupportedCipherSuite(_)
            | Error::UnsupportedCipherMode { .. }
            | Error::KeyExchangeMismatch { .. }
            | Error::InvalidConfig(_) => ErrorKind::Configuration,
            Error::InvalidLength { .. } | Error::InvalidMessage(_) => ErrorKind::Validation,
            Error::MacVerificationFailed { .. }
            | Error::AuthenticationFailed { .. }
            | Error::PremasterDecryptionFailed => ErrorKind::Integrity,
            Error::UnknownCurve(_) | Error::UnsupportedFeature(_) => ErrorKind::UnsupportedFeature,
            Error::InvalidState(_) => ErrorKind::State,
            Error::Crypto(inner) => match inner {
                CryptoError::AuthenticationFailed | CryptoError::SignatureVerificationFailed => {
                    ErrorKind::Integrity
                },
                CryptoError::InvalidLength
                | CryptoError::InvalidPublicKey(_)
                | CryptoError::InvalidNonceSize { .. } => ErrorKind::Validation,
                CryptoError::UnsupportedAlgorithm(_) | CryptoError::KeyNotFound(_) => {
                    ErrorKind::UnsupportedFeature
                },
                _ => ErrorKind::Configuration,
            },
        }
    }

    /// Whether this is an integrity failure (bad MAC, padding or tag).
    pub fn is_integrity_failure(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }

    pub(crate) fn invalid_length(field: &'static str, expected: usize, actual: usize) -> Self {
        Error::InvalidLength {
            field,
            expected,
            actual,
        }
    }
}
