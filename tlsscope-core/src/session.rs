//! Session state machine.
//!
//! A [`SessionContext`] follows one connection's handshake as it is
//! observed or driven, message by message, and derives the key material
//! needed to protect and unprotect its records.
//!
//! ```text
//! Initial
//!   └─ ClientHello ──────────► ClientHelloSeen
//!        └─ ServerHello ─────► ServerHelloSeen ──(resumed)──► Established
//!             └─ Certificate ► CertificateSeen
//!                  └─ ServerKeyExchange ► ServerKeyExchangeSeen
//!                       └─ ClientKeyExchange ► ClientKeyExchangeSeen (keys derived)
//!                            └─ Finished ────► Established
//! ```
//!
//! Missing optional messages (Certificate, ServerKeyExchange) are skipped.
//! Messages that arrive out of order are processed anyway and logged; the
//! session is an observer, not an enforcer.
//!
//! Table lookups fail soft: an unknown cipher suite or version is logged,
//! recorded in [`SessionContext::crypto_error`] and leaves the session
//! without record keys, unless [`SessionConfig::strict_cipher_suites`] is
//! set.

use std::fmt;

use tlsscope_crypto::{CryptoProvider, HashAlgorithm, SignatureDigest};
use zeroize::Zeroizing;

use crate::cipher_suites::{self, BulkCipher, CipherSuiteDescriptor, KeyExchangeKind, SignatureKind};
use crate::crypto_context::CryptoContext;
use crate::direction::{DirectionContext, Role};
use crate::error::{Error, Result};
use crate::keystore::{AsymmetricKeystore, DhKeystore, EcdhKeystore, KexKeystore, KeySlot};
use crate::messages::{
    CertificateList, ClientHello, ClientKeyExchange, Handshake, HandshakeMessage, ServerHello,
    ServerKeyExchange,
};
use crate::prf::{labels, Prf, MASTER_SECRET_LENGTH};
use crate::protocol::{CompressionMethod, ProtocolVersion};
use crate::security_params::SecurityParameters;
use crate::transcript::HandshakeTranscript;
use crate::{RsaDecryptionFailure, SessionConfig};

/// Length of the RSA premaster secret.
pub const PREMASTER_SECRET_LENGTH: usize = 48;

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandshakeState {
    /// Nothing seen yet
    Initial,
    /// ClientHello processed
    ClientHelloSeen,
    /// ServerHello processed; negotiated parameters fixed
    ServerHelloSeen,
    /// Server Certificate processed
    CertificateSeen,
    /// ServerKeyExchange processed
    ServerKeyExchangeSeen,
    /// ClientKeyExchange processed; record keys derived
    ClientKeyExchangeSeen,
    /// Finished processed, or abbreviated handshake resumed
    Established,
}

impl HandshakeState {
    /// State name.
    pub const fn name(self) -> &'static str {
        match self {
            HandshakeState::Initial => "Initial",
            HandshakeState::ClientHelloSeen => "ClientHelloSeen",
            HandshakeState::ServerHelloSeen => "ServerHelloSeen",
            HandshakeState::CertificateSeen => "CertificateSeen",
            HandshakeState::ServerKeyExchangeSeen => "ServerKeyExchangeSeen",
            HandshakeState::ClientKeyExchangeSeen => "ClientKeyExchangeSeen",
            HandshakeState::Established => "Established",
        }
    }
}

/// Parameters fixed by the hellos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiatedSession {
    /// Protocol version
    pub version: Option<ProtocolVersion>,
    /// Cipher suite id as sent by the server
    pub cipher_suite: Option<u16>,
    /// Key exchange
    pub key_exchange: Option<KeyExchangeKind>,
    /// Server signature algorithm
    pub signature: Option<SignatureKind>,
    /// Bulk cipher
    pub encryption: Option<BulkCipher>,
    /// Record MAC digest
    pub mac: Option<HashAlgorithm>,
    /// Compression method
    pub compression: Option<CompressionMethod>,
    /// Whether an abbreviated handshake resumed a session
    pub resumption: bool,
}

impl NegotiatedSession {
    /// Name of the compression algorithm, if known.
    pub fn compression_algorithm(&self) -> Option<&'static str> {
        self.compression.and_then(CompressionMethod::name)
    }
}

impl fmt::Display for NegotiatedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.version.map_or("-", ProtocolVersion::name);
        let suite = match self.cipher_suite {
            Some(id) => match cipher_suites::lookup(id) {
                Some(suite) => suite.to_string(),
                None => format!("unknown (0x{:04x})", id),
            },
            None => "-".to_string(),
        };
        writeln!(f, "negotiated.version: {}", version)?;
        writeln!(f, "negotiated.cipher_suite: {}", suite)?;
        writeln!(
            f,
            "negotiated.key_exchange: {}",
            self.key_exchange.map_or("-", KeyExchangeKind::name)
        )?;
        writeln!(
            f,
            "negotiated.signature: {}",
            self.signature.map_or("-", SignatureKind::name)
        )?;
        match &self.encryption {
            Some(cipher) => writeln!(
                f,
                "negotiated.encryption: {} {} bytes {}",
                cipher.algorithm.name(),
                cipher.key_length,
                cipher.mode.name()
            )?,
            None => writeln!(f, "negotiated.encryption: -")?,
        }
        writeln!(f, "negotiated.mac: {}", self.mac.map_or("-", HashAlgorithm::name))?;
        match self.compression {
            Some(method) => writeln!(
                f,
                "negotiated.compression: {} (0x{:02x})",
                method.name().unwrap_or("unknown"),
                method.to_u8()
            )?,
            None => writeln!(f, "negotiated.compression: -")?,
        }
        write!(f, "negotiated.resumption: {}", self.resumption)
    }
}

/// Cryptographic state of one TLS connection.
#[derive(Debug)]
pub struct SessionContext {
    config: SessionConfig,
    state: HandshakeState,
    negotiated: NegotiatedSession,
    client: DirectionContext,
    server: DirectionContext,
    transcript: HandshakeTranscript,
    client_version: Option<u16>,
    prf: Option<Prf>,
    suite: Option<&'static CipherSuiteDescriptor>,
    premaster_secret: Option<Zeroizing<Vec<u8>>>,
    encrypted_premaster_secret: Option<Vec<u8>>,
    master_secret: Option<Zeroizing<Vec<u8>>>,
    resumption_secret: Option<Zeroizing<Vec<u8>>>,
    security_params: Option<SecurityParameters>,
    crypto_error: Option<Error>,
}

impl SessionContext {
    /// New session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: HandshakeState::Initial,
            negotiated: NegotiatedSession::default(),
            client: DirectionContext::new(Role::Client),
            server: DirectionContext::new(Role::Server),
            transcript: HandshakeTranscript::new(),
            client_version: None,
            prf: None,
            suite: None,
            premaster_secret: None,
            encrypted_premaster_secret: None,
            master_secret: None,
            resumption_secret: None,
            security_params: None,
            crypto_error: None,
        }
    }

    /// Feed the next handshake message.
    ///
    /// # Errors
    ///
    /// Errors are returned for malformed input and for conditions that make
    /// the session's keys unusable; the latter are also kept in
    /// [`SessionContext::crypto_error`]. Processing may continue with the
    /// next message either way.
    pub fn process(&mut self, provider: &dyn CryptoProvider, handshake: &Handshake) -> Result<()> {
        if !self.transcript.record(handshake)
            && !matches!(handshake.message, HandshakeMessage::HelloRequest)
        {
            tracing::warn!(
                handshake_type = ?handshake.message.handshake_type(),
                "Handshake message without encoding left out of the transcript"
            );
        }

        match &handshake.message {
            HandshakeMessage::ClientHello(hello) => self.handle_client_hello(provider, hello),
            HandshakeMessage::ServerHello(hello) => self.handle_server_hello(provider, hello),
            HandshakeMessage::Certificate(certificates) => {
                self.handle_certificate(provider, certificates)
            },
            HandshakeMessage::ServerKeyExchange(kex) => self.handle_server_key_exchange(kex),
            HandshakeMessage::ClientKeyExchange(kex) => {
                self.handle_client_key_exchange(provider, kex)
            },
            HandshakeMessage::Finished(_) => {
                if self.state < HandshakeState::ClientKeyExchangeSeen {
                    self.unexpected("Finished");
                }
                self.transition(HandshakeState::Established);
                Ok(())
            },
            HandshakeMessage::HelloRequest
            | HandshakeMessage::CertificateRequest
            | HandshakeMessage::ServerHelloDone
            | HandshakeMessage::CertificateVerify(_) => Ok(()),
        }
    }

    fn transition(&mut self, next: HandshakeState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "Handshake state");
        self.state = next;
    }

    fn unexpected(&self, handshake: &str) {
        tracing::warn!(handshake, state = self.state.name(), "Handshake message out of order");
    }

    fn mark_unusable(&mut self, error: Error) -> Error {
        self.crypto_error = Some(error.clone());
        error
    }

    fn handle_client_hello(
        &mut self,
        provider: &dyn CryptoProvider,
        hello: &ClientHello,
    ) -> Result<()> {
        if self.state != HandshakeState::Initial {
            self.unexpected("ClientHello");
        }
        self.client.random = Some(hello.random());
        self.client.session_id = hello.session_id.clone();
        self.client.hello = Some(HandshakeMessage::ClientHello(hello.clone()));
        self.client_version = Some(hello.version);
        // Placeholder until a real key exchange is processed.
        if self.premaster_secret.is_none() {
            self.premaster_secret = Some(random_premaster_secret(provider, hello.version)?);
        }
        self.transition(HandshakeState::ClientHelloSeen);
        Ok(())
    }

    fn handle_server_hello(
        &mut self,
        provider: &dyn CryptoProvider,
        hello: &ServerHello,
    ) -> Result<()> {
        if self.state != HandshakeState::ClientHelloSeen {
            self.unexpected("ServerHello");
        }
        self.server.random = Some(hello.random());
        self.server.session_id = hello.session_id.clone();
        self.server.hello = Some(HandshakeMessage::ServerHello(hello.clone()));
        self.transition(HandshakeState::ServerHelloSeen);

        let compression = CompressionMethod::from_u8(hello.compression_method);
        if compression.name().is_none() {
            tracing::warn!(
                method = hello.compression_method,
                "Compression method not supported, compression operations will fail"
            );
        }
        self.negotiated.compression = Some(compression);
        self.negotiated.cipher_suite = Some(hello.cipher_suite);

        let Some(version) = ProtocolVersion::from_u16(hello.version) else {
            tracing::warn!(
                version = format_args!("0x{:04x}", hello.version),
                "Protocol version not supported, crypto operations will fail"
            );
            self.negotiated.version = None;
            self.mark_unusable(Error::UnsupportedFeature(format!(
                "protocol version 0x{:04x}",
                hello.version
            )));
            return Ok(());
        };
        self.negotiated.version = Some(version);

        let Some(suite) = cipher_suites::lookup(hello.cipher_suite) else {
            let error = self.mark_unusable(Error::UnsupportedCipherSuite(hello.cipher_suite));
            if self.config.strict_cipher_suites {
                return Err(error);
            }
            tracing::warn!(
                cipher_suite = format_args!("0x{:04x}", hello.cipher_suite),
                "Cipher suite not supported, crypto operations will fail"
            );
            return Ok(());
        };
        tracing::debug!(
            suite = suite.name,
            mode = suite.cipher.mode.name(),
            key_length = suite.cipher.key_length,
            "Cipher suite negotiated"
        );
        self.suite = Some(suite);
        self.negotiated.key_exchange = Some(suite.key_exchange);
        self.negotiated.signature = suite.signature;
        self.negotiated.encryption = Some(suite.cipher);
        self.negotiated.mac = suite.mac;
        self.prf = Some(Prf::for_suite(version, suite));
        self.crypto_error = None;

        self.negotiated.resumption = false;
        if let Some(master_secret) = self.resumption_secret.take() {
            let offered = &self.client.session_id;
            if !offered.is_empty() && *offered == hello.session_id {
                self.negotiated.resumption = true;
                tracing::debug!("Resuming session");
                self.derive_from_master_secret(provider, &master_secret)?;
                self.transition(HandshakeState::Established);
                return Ok(());
            }
            tracing::warn!("Server did not resume the session, expecting a full handshake");
        }
        Ok(())
    }

    fn handle_certificate(
        &mut self,
        provider: &dyn CryptoProvider,
        certificates: &CertificateList,
    ) -> Result<()> {
        if self.state != HandshakeState::ServerHelloSeen {
            self.unexpected("Certificate");
        }
        self.transition(HandshakeState::CertificateSeen);

        let Some(suite) = self.suite else {
            return Ok(());
        };
        let Some(leaf) = certificates.leaf() else {
            tracing::warn!("Empty server certificate list");
            return Ok(());
        };

        if suite.key_exchange == KeyExchangeKind::Rsa || suite.signature == Some(SignatureKind::Rsa) {
            let slot = &mut self.server.asymmetric_keystore;
            if slot.is_provided() {
                if let Some(store) = slot.get_mut() {
                    store.attach_certificate(leaf);
                }
            } else {
                slot.derive(AsymmetricKeystore::from_certificate(provider, leaf)?);
            }
        } else if suite.signature == Some(SignatureKind::Dsa) {
            tracing::warn!("DSA certificate keys are not extracted, signatures cannot be checked");
        }
        Ok(())
    }

    fn handle_server_key_exchange(&mut self, kex: &ServerKeyExchange) -> Result<()> {
        if !matches!(
            self.state,
            HandshakeState::ServerHelloSeen | HandshakeState::CertificateSeen
        ) {
            self.unexpected("ServerKeyExchange");
        }
        self.transition(HandshakeState::ServerKeyExchangeSeen);

        if self.server.kex_keystore.is_set() {
            return Ok(());
        }
        match kex {
            ServerKeyExchange::Dh { p, g, public } => {
                self.server
                    .kex_keystore
                    .derive(KexKeystore::Dh(DhKeystore::new(p.clone(), g.clone(), public.clone())));
            },
            ServerKeyExchange::Ecdh { curve_id, point } => {
                let store = EcdhKeystore::from_point(*curve_id, point)?;
                if store.unknown_curve() {
                    tracing::warn!(
                        curve_id = format_args!("0x{:04x}", curve_id),
                        "Unknown elliptic curve, client key exchange must be completed manually"
                    );
                }
                self.server.kex_keystore.derive(KexKeystore::Ecdh(store));
            },
            ServerKeyExchange::Unknown(_) => {
                tracing::warn!("Unknown server key exchange");
            },
        }
        Ok(())
    }

    fn handle_client_key_exchange(
        &mut self,
        provider: &dyn CryptoProvider,
        kex: &ClientKeyExchange,
    ) -> Result<()> {
        if self.state >= HandshakeState::ClientKeyExchangeSeen
            || self.state < HandshakeState::ServerHelloSeen
        {
            self.unexpected("ClientKeyExchange");
        }

        match kex {
            ClientKeyExchange::Rsa {
                encrypted_premaster,
            } => {
                self.encrypted_premaster_secret = Some(encrypted_premaster.clone());
                self.decrypt_premaster_secret(provider, encrypted_premaster)?;
            },
            ClientKeyExchange::Dh { public } => {
                if !self.client.kex_keystore.is_set() {
                    let store = match self.server.kex_keystore.get() {
                        Some(KexKeystore::Dh(server)) => Ok(KexKeystore::Dh(DhKeystore::new(
                            server.prime.clone(),
                            server.generator.clone(),
                            public.clone(),
                        ))),
                        other => Err(kex_mismatch("DH", other)),
                    };
                    let store = store.map_err(|error| self.mark_unusable(error))?;
                    self.client.kex_keystore.derive(store);
                }
                self.compute_kex_premaster(provider)?;
            },
            ClientKeyExchange::Ecdh { point } => {
                if !self.client.kex_keystore.is_set() {
                    let store = match self.server.kex_keystore.get() {
                        Some(KexKeystore::Ecdh(server)) => {
                            EcdhKeystore::from_point(server.curve_id, point).map(KexKeystore::Ecdh)
                        },
                        other => Err(kex_mismatch("ECDH", other)),
                    };
                    let store = store.map_err(|error| self.mark_unusable(error))?;
                    self.client.kex_keystore.derive(store);
                }
                self.compute_kex_premaster(provider)?;
            },
        }
        self.transition(HandshakeState::ClientKeyExchangeSeen);

        if self.prf.is_none() {
            tracing::debug!("No usable cipher suite, record keys not derived");
            return Ok(());
        }
        let premaster = self
            .premaster_secret
            .clone()
            .ok_or_else(|| Error::InvalidState("no premaster secret; ClientHello missing".into()))?;
        self.derive_from_premaster_secret(provider, &premaster)
    }

    fn decrypt_premaster_secret(
        &mut self,
        provider: &dyn CryptoProvider,
        encrypted: &[u8],
    ) -> Result<()> {
        let Some(store) = self.server.asymmetric_keystore.get() else {
            return Ok(());
        };
        if !store.has_private_key() {
            return Ok(());
        }
        match store.key().decrypt(encrypted) {
            Ok(premaster) if premaster.len() == PREMASTER_SECRET_LENGTH => {
                self.premaster_secret = Some(Zeroizing::new(premaster));
                Ok(())
            },
            _ => match self.config.rsa_decryption_failure {
                RsaDecryptionFailure::RandomPremaster => {
                    tracing::warn!("RSA premaster secret did not decrypt, substituting a random one");
                    let version = self
                        .client_version
                        .or(self.negotiated.version.map(ProtocolVersion::to_u16))
                        .unwrap_or(ProtocolVersion::Tls12.to_u16());
                    self.premaster_secret = Some(random_premaster_secret(provider, version)?);
                    Ok(())
                },
                RsaDecryptionFailure::Reject => {
                    Err(self.mark_unusable(Error::PremasterDecryptionFailed))
                },
            },
        }
    }

    /// Compute the DH/ECDH premaster secret from whichever side's private
    /// value is known.
    fn compute_kex_premaster(&mut self, provider: &dyn CryptoProvider) -> Result<()> {
        let (Some(server), Some(client)) =
            (self.server.kex_keystore.get(), self.client.kex_keystore.get())
        else {
            return Ok(());
        };
        let secret = if server.has_private() {
            server.shared_secret(provider, client)
        } else if client.has_private() {
            client.shared_secret(provider, server)
        } else {
            tracing::warn!(
                kind = server.kind(),
                "No private key exchange value known, premaster secret must be supplied"
            );
            return Ok(());
        };
        match secret {
            Ok(secret) => {
                self.premaster_secret = Some(secret);
                Ok(())
            },
            Err(error) => Err(self.mark_unusable(error)),
        }
    }

    fn randoms(&self) -> Result<(&[u8], &[u8])> {
        match (&self.client.random, &self.server.random) {
            (Some(client), Some(server)) => Ok((&client[..], &server[..])),
            _ => Err(Error::InvalidState("hello randoms not seen".into())),
        }
    }

    fn negotiated_prf(&self) -> Result<(Prf, u16)> {
        match (self.prf, self.suite) {
            (Some(prf), Some(suite)) => Ok((prf, suite.id)),
            _ => Err(Error::InvalidState("no cipher suite negotiated".into())),
        }
    }

    fn derive_from_premaster_secret(
        &mut self,
        provider: &dyn CryptoProvider,
        premaster_secret: &[u8],
    ) -> Result<()> {
        let (prf, suite_id) = self.negotiated_prf()?;
        let (client_random, server_random) = self.randoms()?;
        let params = SecurityParameters::from_premaster_secret(
            provider,
            &prf,
            suite_id,
            premaster_secret,
            client_random,
            server_random,
        );
        self.install(provider, params)
    }

    fn derive_from_master_secret(
        &mut self,
        provider: &dyn CryptoProvider,
        master_secret: &[u8],
    ) -> Result<()> {
        let (prf, suite_id) = self.negotiated_prf()?;
        let (client_random, server_random) = self.randoms()?;
        let params = SecurityParameters::from_master_secret(
            provider,
            &prf,
            suite_id,
            master_secret,
            client_random,
            server_random,
        );
        self.install(provider, params)
    }

    /// Adopt freshly derived parameters: fill unset symmetric stores and
    /// build both record engines.
    fn install(
        &mut self,
        provider: &dyn CryptoProvider,
        params: Result<SecurityParameters>,
    ) -> Result<()> {
        let params = params.map_err(|error| self.mark_unusable(error))?;
        self.master_secret = Some(Zeroizing::new(params.master_secret().to_vec()));

        for (direction, derived) in [
            (&mut self.client, params.client_keystore()),
            (&mut self.server, params.server_keystore()),
        ] {
            direction.symmetric_keystore.derive(derived.clone());
            let keys = direction.symmetric_keystore.get().unwrap_or(derived);
            match CryptoContext::new(provider, &params, keys) {
                Ok(engine) => direction.crypto = Some(engine),
                Err(error) => {
                    direction.crypto = None;
                    self.crypto_error = Some(error.clone());
                    return Err(error);
                },
            }
        }
        tracing::debug!(suite = params.suite().name, "Record keys derived");
        self.security_params = Some(params);
        self.crypto_error = None;
        Ok(())
    }

    /// Reuse `master_secret` if the next ServerHello resumes the session.
    ///
    /// # Errors
    ///
    /// `InvalidLength` unless the secret is 48 bytes.
    pub fn resume_session(&mut self, master_secret: &[u8]) -> Result<()> {
        if master_secret.len() != MASTER_SECRET_LENGTH {
            return Err(Error::invalid_length(
                "master secret",
                MASTER_SECRET_LENGTH,
                master_secret.len(),
            ));
        }
        self.resumption_secret = Some(Zeroizing::new(master_secret.to_vec()));
        Ok(())
    }

    /// RSA-encrypt the premaster secret to the server's public key.
    ///
    /// `premaster_secret` replaces the session's premaster secret when
    /// given.
    ///
    /// # Errors
    ///
    /// `InvalidState` when no server key is known or no premaster secret
    /// exists yet.
    pub fn encrypted_premaster_secret(
        &mut self,
        provider: &dyn CryptoProvider,
        premaster_secret: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if let Some(premaster) = premaster_secret {
            self.premaster_secret = Some(Zeroizing::new(premaster.to_vec()));
        } else if self.premaster_secret.is_none() {
            let version = self.client_version.unwrap_or(ProtocolVersion::Tls12.to_u16());
            self.premaster_secret = Some(random_premaster_secret(provider, version)?);
        }
        let store = self.server.asymmetric_keystore.get().ok_or_else(|| {
            Error::InvalidState("no server certificate seen, cannot encrypt premaster secret".into())
        })?;
        let cleartext = self
            .premaster_secret
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no premaster secret".into()))?;
        let encrypted = store.key().encrypt(cleartext)?;
        self.encrypted_premaster_secret = Some(encrypted.clone());
        Ok(encrypted)
    }

    /// Generate the client's DH key pair in the server's group and compute
    /// the premaster secret. Returns the client public value.
    ///
    /// `private` fixes the client exponent instead of drawing a random one.
    pub fn client_dh_public_key(
        &mut self,
        provider: &dyn CryptoProvider,
        private: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let server = match self.server.kex_keystore.get() {
            Some(KexKeystore::Dh(server)) => server,
            other => return Err(kex_mismatch("DH", other)),
        };
        let client = DhKeystore::key_pair_for(provider, server, private)?;
        let premaster = client.shared_secret(provider, &server.public)?;
        let public = client.public.clone();
        self.premaster_secret = Some(premaster);
        self.client.kex_keystore = KeySlot::Derived(KexKeystore::Dh(client));
        Ok(public)
    }

    /// Generate the client's ECDH key pair on the server's curve and
    /// compute the premaster secret. Returns the encoded client point.
    ///
    /// # Errors
    ///
    /// `UnknownCurve` when the server's curve is not supported.
    pub fn client_ecdh_public_key(
        &mut self,
        provider: &dyn CryptoProvider,
        private: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let server = match self.server.kex_keystore.get() {
            Some(KexKeystore::Ecdh(server)) => server,
            other => return Err(kex_mismatch("ECDH", other)),
        };
        let client = EcdhKeystore::key_pair_for(provider, server, private)?;
        let premaster = client.shared_secret(provider, &server.encoded_point())?;
        let point = client.encoded_point();
        self.premaster_secret = Some(premaster);
        self.client.kex_keystore = KeySlot::Derived(KexKeystore::Ecdh(client));
        Ok(point)
    }

    /// ClientKeyExchange for the negotiated key exchange.
    ///
    /// `value` is the premaster secret for RSA and the private value for
    /// DHE/ECDHE.
    pub fn client_kex_data(
        &mut self,
        provider: &dyn CryptoProvider,
        value: Option<&[u8]>,
    ) -> Result<ClientKeyExchange> {
        match self.negotiated.key_exchange {
            Some(KeyExchangeKind::Rsa) => Ok(ClientKeyExchange::Rsa {
                encrypted_premaster: self.encrypted_premaster_secret(provider, value)?,
            }),
            Some(KeyExchangeKind::Dhe) => Ok(ClientKeyExchange::Dh {
                public: self.client_dh_public_key(provider, value)?,
            }),
            Some(KeyExchangeKind::Ecdhe) => Ok(ClientKeyExchange::Ecdh {
                point: self.client_ecdh_public_key(provider, value)?,
            }),
            Some(KeyExchangeKind::Null) | None => Err(Error::UnsupportedFeature(
                "key exchange unknown or not supported".into(),
            )),
        }
    }

    /// Finished verify data over every handshake message processed so far,
    /// for the configured role.
    pub fn verify_data(&self, provider: &dyn CryptoProvider) -> Result<Vec<u8>> {
        self.verify_data_over(provider, &self.transcript.concatenated())
    }

    /// Finished verify data over caller-supplied handshake messages.
    ///
    /// # Errors
    ///
    /// `InvalidState` before the master secret is known.
    pub fn verify_data_over(
        &self,
        provider: &dyn CryptoProvider,
        handshake_messages: &[u8],
    ) -> Result<Vec<u8>> {
        let prf = self
            .prf
            .ok_or_else(|| Error::InvalidState("no cipher suite negotiated".into()))?;
        let master_secret = self
            .master_secret
            .as_ref()
            .ok_or_else(|| Error::InvalidState("master secret not derived".into()))?;
        let label = match self.config.role {
            Role::Client => labels::CLIENT_FINISHED,
            Role::Server => labels::SERVER_FINISHED,
        };
        prf.verify_data(
            provider,
            master_secret,
            label,
            handshake_messages,
            self.config.verify_data_length,
        )
    }

    /// Digest of every handshake message except HelloRequest, in order.
    pub fn handshake_hash(
        &self,
        provider: &dyn CryptoProvider,
        algorithm: HashAlgorithm,
    ) -> Result<Vec<u8>> {
        self.transcript.hash(provider, algorithm)
    }

    /// CertificateVerify signature with the client's RSA key.
    ///
    /// TLS 1.2 signs `algorithm(handshake_messages)` wrapped in a
    /// DigestInfo. Earlier versions sign the bare 36-byte
    /// `MD5 || SHA-1` digest and ignore `algorithm`.
    ///
    /// # Errors
    ///
    /// `InvalidState` without a client private key.
    pub fn client_signed_handshake_hash(
        &self,
        provider: &dyn CryptoProvider,
        algorithm: HashAlgorithm,
    ) -> Result<Vec<u8>> {
        let store = self
            .client
            .asymmetric_keystore
            .get()
            .filter(|store| store.has_private_key())
            .ok_or_else(|| Error::InvalidState("missing client private key, cannot sign".into()))?;
        let version = self.negotiated.version.unwrap_or(ProtocolVersion::Tls12);
        let signature = if version.uses_single_digest_prf() {
            let digest = self.handshake_hash(provider, algorithm)?;
            store.key().sign(SignatureDigest::Prefixed(algorithm), &digest)?
        } else {
            let mut digest = self.handshake_hash(provider, HashAlgorithm::Md5)?;
            digest.extend(self.handshake_hash(provider, HashAlgorithm::Sha1)?);
            store.key().sign(SignatureDigest::Unprefixed, &digest)?
        };
        Ok(signature)
    }

    /// Change the role used for Finished labels.
    pub fn set_role(&mut self, role: Role) {
        self.config.role = role;
    }

    /// Role used for Finished labels.
    pub fn role(&self) -> Role {
        self.config.role
    }

    /// Configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Handshake progress.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Negotiated parameters.
    pub fn negotiated(&self) -> &NegotiatedSession {
        &self.negotiated
    }

    /// Negotiated suite, when known to the registry.
    pub fn cipher_suite(&self) -> Option<&'static CipherSuiteDescriptor> {
        self.suite
    }

    /// Negotiated PRF.
    pub fn prf(&self) -> Option<&Prf> {
        self.prf.as_ref()
    }

    /// Client side.
    pub fn client(&self) -> &DirectionContext {
        &self.client
    }

    /// Client side, mutable (key stores, record protection).
    pub fn client_mut(&mut self) -> &mut DirectionContext {
        &mut self.client
    }

    /// Server side.
    pub fn server(&self) -> &DirectionContext {
        &self.server
    }

    /// Server side, mutable (key stores, record protection).
    pub fn server_mut(&mut self) -> &mut DirectionContext {
        &mut self.server
    }

    /// Both sides, mutable.
    pub fn directions_mut(&mut self) -> (&mut DirectionContext, &mut DirectionContext) {
        (&mut self.client, &mut self.server)
    }

    /// Handshake messages recorded so far.
    pub fn transcript(&self) -> &HandshakeTranscript {
        &self.transcript
    }

    /// Current premaster secret (possibly the ClientHello placeholder).
    pub fn premaster_secret(&self) -> Option<&[u8]> {
        self.premaster_secret.as_ref().map(|s| s.as_slice())
    }

    /// Replace the premaster secret, e.g. with one recovered out of band.
    ///
    /// Takes effect at the next ClientKeyExchange.
    pub fn set_premaster_secret(&mut self, premaster_secret: &[u8]) {
        self.premaster_secret = Some(Zeroizing::new(premaster_secret.to_vec()));
    }

    /// Encrypted premaster secret, once seen or computed.
    pub fn encrypted_premaster(&self) -> Option<&[u8]> {
        self.encrypted_premaster_secret.as_deref()
    }

    /// Master secret, once derived.
    pub fn master_secret(&self) -> Option<&[u8]> {
        self.master_secret.as_ref().map(|s| s.as_slice())
    }

    /// Parameters of the last derivation.
    pub fn security_parameters(&self) -> Option<&SecurityParameters> {
        self.security_params.as_ref()
    }

    /// Why the session's crypto is unusable, if it is.
    pub fn crypto_error(&self) -> Option<&Error> {
        self.crypto_error.as_ref()
    }

    /// Whether both record engines exist and nothing marked them unusable.
    pub fn is_crypto_usable(&self) -> bool {
        self.crypto_error.is_none()
            && self.client.crypto.is_some()
            && self.server.crypto.is_some()
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// `client_version(2) || random(46)`
fn random_premaster_secret(provider: &dyn CryptoProvider, version: u16) -> Result<Zeroizing<Vec<u8>>> {
    let mut premaster = Zeroizing::new(vec![0u8; PREMASTER_SECRET_LENGTH]);
    premaster[..2].copy_from_slice(&version.to_be_bytes());
    provider.random().fill(&mut premaster[2..])?;
    Ok(premaster)
}

fn kex_mismatch(expected: &'static str, actual: Option<&KexKeystore>) -> Error {
    Error::KeyExchangeMismatch {
        expected,
        actual: actual.map_or("none", KexKeystore::kind),
    }
}

fn presence(value: Option<&[u8]>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("<{} bytes>", v.len()))
}

impl fmt::Display for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TLS session ({}, {})", self.config.role.name(), self.state.name())?;
        writeln!(f, "{}", self.negotiated)?;
        writeln!(
            f,
            "encrypted_premaster_secret: {}",
            presence(self.encrypted_premaster())
        )?;
        writeln!(f, "premaster_secret: {}", presence(self.premaster_secret()))?;
        writeln!(f, "master_secret: {}", presence(self.master_secret()))?;
        if let Some(error) = &self.crypto_error {
            writeln!(f, "crypto unusable: {}", error)?;
        }
        writeln!(f, "{}", self.client)?;
        write!(f, "{}", self.server)
    }
}
