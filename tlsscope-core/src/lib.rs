//! # tlsscope core
//!
//! TLS 1.0 to 1.2 session cryptography for traffic analysis and testing.
//!
//! This crate follows a TLS handshake message by message, derives the
//! session's key material and protects or unprotects application records
//! in both directions:
//! - Cipher suite registry
//! - PRF and key schedule
//! - Key stores (RSA, DH, ECDH, symmetric)
//! - Record protection for stream, CBC and GCM suites
//! - Finished and CertificateVerify helpers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   handshake messages (parsed by caller) │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │       tlsscope-core (this crate)        │
//! │  ┌──────────────────────────────────┐   │
//! │  │   SessionContext state machine   │   │
//! │  ├──────────────────────────────────┤   │
//! │  │   PRF / SecurityParameters       │   │
//! │  ├──────────────────────────────────┤   │
//! │  │   DirectionContext + key stores  │   │
//! │  ├──────────────────────────────────┤   │
//! │  │   CryptoContext record engines   │   │
//! │  └──────────────────────────────────┘   │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │    tlsscope-crypto (trait interface)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use tlsscope_core::{cipher_suites, SessionConfig, SessionContext};
//!
//! let suite = cipher_suites::lookup(0x002f).unwrap();
//! assert_eq!(suite.name, "TLS_RSA_WITH_AES_128_CBC_SHA");
//!
//! let session = SessionContext::new(SessionConfig::default());
//! assert!(!session.is_crypto_usable());
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    unused_qualifications
)]
#![forbid(unsafe_code)]

// Re-export crypto interface
pub use tlsscope_crypto;

pub mod cipher_suites;
pub mod container;
pub mod crypto_context;
pub mod direction;
pub mod error;
pub mod keystore;
pub mod messages;
pub mod prf;
pub mod protocol;
pub mod security_params;
pub mod session;
pub mod transcript;

// Re-exports
pub use cipher_suites::{CipherMode, CipherSuiteDescriptor, KeyExchangeKind, SignatureKind};
pub use container::{CryptoContainer, CryptoData};
pub use crypto_context::{CryptoContext, RecordCounters};
pub use direction::{DirectionContext, Role};
pub use error::{Error, ErrorKind, Result};
pub use prf::Prf;
pub use protocol::{CompressionMethod, ContentType, HandshakeType, ProtocolVersion};
pub use security_params::SecurityParameters;
pub use session::{HandshakeState, NegotiatedSession, SessionContext};

/// What a server-side session does when the RSA-encrypted premaster secret
/// does not decrypt to 48 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RsaDecryptionFailure {
    /// Continue with `client_version || random(46)`, as a TLS server must
    #[default]
    RandomPremaster,
    /// Fail the ClientKeyExchange with `PremasterDecryptionFailed`
    Reject,
}

/// Session configuration.
///
/// # Example
///
/// ```rust
/// use tlsscope_core::{Role, SessionConfig};
///
/// let config = SessionConfig::builder()
///     .with_role(Role::Server)
///     .with_strict_cipher_suites(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.verify_data_length, 12);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Side whose Finished message [`SessionContext::verify_data`] computes
    pub role: Role,

    /// Return an error on unknown cipher suites instead of only marking the
    /// session's crypto unusable
    pub strict_cipher_suites: bool,

    /// RSA premaster decryption failure policy
    pub rsa_decryption_failure: RsaDecryptionFailure,

    /// Finished verify data length (default: 12)
    pub verify_data_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            role: Role::Client,
            strict_cipher_suites: false,
            rsa_decryption_failure: RsaDecryptionFailure::RandomPremaster,
            verify_data_length: 12,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Configuration builder for [`SessionConfig`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: SessionConfig,
}

impl ConfigBuilder {
    /// Set the role used for Finished labels.
    pub fn with_role(mut self, role: Role) -> Self {
        self.config.role = role;
        self
    }

    /// Fail hard on unknown cipher suites.
    pub fn with_strict_cipher_suites(mut self, strict: bool) -> Self {
        self.config.strict_cipher_suites = strict;
        self
    }

    /// Set the RSA premaster decryption failure policy.
    pub fn with_rsa_decryption_failure(mut self, policy: RsaDecryptionFailure) -> Self {
        self.config.rsa_decryption_failure = policy;
        self
    }

    /// Set the Finished verify data length.
    pub fn with_verify_data_length(mut self, length: usize) -> Self {
        self.config.verify_data_length = length;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<SessionConfig> {
        if self.config.verify_data_length == 0 {
            return Err(Error::InvalidConfig("verify data length must be non-zero".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.role, Role::Client);
        assert!(!config.strict_cipher_suites);
        assert_eq!(config.rsa_decryption_failure, RsaDecryptionFailure::RandomPremaster);
        assert_eq!(config.verify_data_length, 12);
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::builder()
            .with_role(Role::Server)
            .with_strict_cipher_suites(true)
            .with_rsa_decryption_failure(RsaDecryptionFailure::Reject)
            .with_verify_data_length(36)
            .build()
            .unwrap();

        assert_eq!(config.role, Role::Server);
        assert!(config.strict_cipher_suites);
        assert_eq!(config.rsa_decryption_failure, RsaDecryptionFailure::Reject);
        assert_eq!(config.verify_data_length, 36);
    }

    #[test]
    fn test_config_validation() {
        let result = SessionConfig::builder().with_verify_data_length(0).build();
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Configuration);
    }
}
