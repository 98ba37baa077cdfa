//! Per-direction record encryption engines.
//!
//! One engine exists per direction and per negotiation. It owns the live
//! cipher state and the direction's counters:
//!
//! - **Stream**: the cipher is keyed once and runs across records.
//! - **CBC**: TLS 1.0 chains the IV across records. From TLS 1.1 on each
//!   record carries its own IV and the cipher is re-keyed per record.
//! - **GCM**: `nonce = salt(4) || explicit(8)`; the explicit part is a
//!   counter sent in front of each record.
//!
//! The sequence number advances once per record, including records whose
//! MAC or tag fails to verify.

use std::fmt;

use tlsscope_crypto::{AeadAlgorithm, Cipher, CipherAlgorithm, CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

use crate::cipher_suites::CipherMode;
use crate::container::{
    record_header, CbcContainer, CryptoContainer, CryptoData, GcmContainer, StreamContainer,
};
use crate::error::{Error, Result};
use crate::keystore::SymmetricKeystore;
use crate::protocol::{ContentType, ProtocolVersion};
use crate::security_params::{SecurityParameters, GCM_EXPLICIT_NONCE_LENGTH, GCM_SALT_LENGTH};

/// Record counters of one direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounters {
    sequence: u64,
    nonce: u64,
}

impl RecordCounters {
    /// Records processed so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Next GCM explicit nonce.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    fn advance(&mut self) {
        self.sequence = self.sequence.wrapping_add(1);
    }
}

/// Per-direction encryption engine.
#[derive(Debug)]
pub enum CryptoContext {
    /// Stream cipher engine
    Stream(StreamContext),
    /// CBC engine
    Cbc(CbcContext),
    /// AES-GCM engine
    Gcm(GcmContext),
}

impl CryptoContext {
    /// Build the engine for the negotiated mode from one direction's keys.
    pub fn new(
        provider: &dyn CryptoProvider,
        params: &SecurityParameters,
        keys: &SymmetricKeystore,
    ) -> Result<Self> {
        let mac = MacKey {
            algorithm: params.mac_algorithm(),
            key: keys.mac_key.clone(),
        };
        let version = params.version();
        let context = match params.cipher_mode() {
            CipherMode::Stream => CryptoContext::Stream(StreamContext {
                cipher: provider.cipher(params.cipher_algorithm(), &keys.key, &[])?,
                mac,
                version,
                counters: RecordCounters::default(),
            }),
            CipherMode::Cbc => CryptoContext::Cbc(CbcContext::new(provider, params, keys, mac)?),
            CipherMode::Gcm => CryptoContext::Gcm(GcmContext::new(params, keys)?),
        };
        tracing::debug!(
            mode = context.mode().name(),
            version = %version,
            "Crypto engine ready"
        );
        Ok(context)
    }

    /// Mode of this engine.
    pub fn mode(&self) -> CipherMode {
        match self {
            CryptoContext::Stream(_) => CipherMode::Stream,
            CryptoContext::Cbc(_) => CipherMode::Cbc,
            CryptoContext::Gcm(_) => CipherMode::Gcm,
        }
    }

    /// Current counters.
    pub fn counters(&self) -> RecordCounters {
        match self {
            CryptoContext::Stream(ctx) => ctx.counters,
            CryptoContext::Cbc(ctx) => ctx.counters,
            CryptoContext::Gcm(ctx) => ctx.counters,
        }
    }

    /// Sequence number the next record will use.
    pub fn sequence(&self) -> u64 {
        self.counters().sequence()
    }

    /// Frame `data` for the current sequence number.
    pub fn container(
        &self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        data: &[u8],
    ) -> Result<CryptoContainer> {
        match self {
            CryptoContext::Stream(ctx) => {
                let data = ctx.record(content_type, data)?;
                Ok(CryptoContainer::Stream(StreamContainer::new(
                    provider,
                    data,
                    ctx.mac.algorithm,
                    &ctx.mac.key,
                )?))
            },
            CryptoContext::Cbc(ctx) => {
                let data = ctx.record(content_type, data)?;
                Ok(CryptoContainer::Cbc(CbcContainer::new(
                    provider,
                    data,
                    ctx.mac.algorithm,
                    &ctx.mac.key,
                    ctx.block_size,
                )?))
            },
            CryptoContext::Gcm(ctx) => Ok(CryptoContainer::Gcm(GcmContainer::new(
                ctx.record(content_type, data)?,
            ))),
        }
    }

    /// Frame and encrypt `data` as the next record.
    pub fn encrypt_data(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        let container = self.container(provider, content_type, data)?;
        self.encrypt(provider, &container)
    }

    /// Encrypt a framed record.
    ///
    /// # Errors
    ///
    /// `UnsupportedCipherMode` if the container was framed for another mode.
    pub fn encrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        container: &CryptoContainer,
    ) -> Result<Vec<u8>> {
        match (self, container) {
            (CryptoContext::Stream(ctx), CryptoContainer::Stream(c)) => ctx.encrypt(c),
            (CryptoContext::Cbc(ctx), CryptoContainer::Cbc(c)) => ctx.encrypt(provider, c),
            (CryptoContext::Gcm(ctx), CryptoContainer::Gcm(c)) => ctx.encrypt(provider, c),
            (ctx, container) => Err(Error::UnsupportedCipherMode {
                mode: container.mode(),
                reason: format!("{} engine cannot encrypt it", ctx.mode().name()),
            }),
        }
    }

    /// Decrypt one record and return its content.
    ///
    /// # Errors
    ///
    /// - `MacVerificationFailed` for stream and CBC records whose MAC or
    ///   padding is wrong
    /// - `AuthenticationFailed` for GCM records whose tag is wrong
    pub fn decrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            CryptoContext::Stream(ctx) => ctx.decrypt(provider, content_type, ciphertext),
            CryptoContext::Cbc(ctx) => ctx.decrypt(provider, content_type, ciphertext),
            CryptoContext::Gcm(ctx) => ctx.decrypt(provider, content_type, ciphertext),
        }
    }
}

#[derive(Clone)]
struct MacKey {
    algorithm: Option<HashAlgorithm>,
    key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacKey")
            .field("algorithm", &self.algorithm)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Stream cipher engine.
pub struct StreamContext {
    cipher: Box<dyn Cipher>,
    mac: MacKey,
    version: ProtocolVersion,
    counters: RecordCounters,
}

impl fmt::Debug for StreamContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamContext")
            .field("cipher", &self.cipher.algorithm())
            .field("mac", &self.mac)
            .field("version", &self.version)
            .field("counters", &self.counters)
            .finish()
    }
}

impl StreamContext {
    fn record(&self, content_type: ContentType, data: &[u8]) -> Result<CryptoData> {
        CryptoData::new(
            data.to_vec(),
            self.counters.sequence,
            self.version,
            content_type,
        )
    }

    fn encrypt(&mut self, container: &StreamContainer) -> Result<Vec<u8>> {
        let mut out = container.to_bytes();
        self.cipher.encrypt(&mut out)?;
        self.counters.advance();
        Ok(out)
    }

    fn decrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let sequence = self.counters.sequence;
        let mut plaintext = ciphertext.to_vec();
        self.cipher.decrypt(&mut plaintext)?;
        self.counters.advance();
        let data = StreamContainer::open(
            provider,
            plaintext,
            self.mac.algorithm,
            &self.mac.key,
            sequence,
            self.version,
            content_type,
        )?;
        Ok(data.data)
    }
}

/// CBC engine.
pub struct CbcContext {
    algorithm: CipherAlgorithm,
    key: Zeroizing<Vec<u8>>,
    /// Chained cipher for TLS 1.0; `None` when every record has its own IV.
    chained: Option<Box<dyn Cipher>>,
    block_size: usize,
    mac: MacKey,
    version: ProtocolVersion,
    counters: RecordCounters,
}

impl fmt::Debug for CbcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CbcContext")
            .field("algorithm", &self.algorithm)
            .field("chained", &self.chained.is_some())
            .field("block_size", &self.block_size)
            .field("mac", &self.mac)
            .field("version", &self.version)
            .field("counters", &self.counters)
            .finish()
    }
}

impl CbcContext {
    fn new(
        provider: &dyn CryptoProvider,
        params: &SecurityParameters,
        keys: &SymmetricKeystore,
        mac: MacKey,
    ) -> Result<Self> {
        let algorithm = params.cipher_algorithm();
        let version = params.version();
        let chained = if version.explicit_iv() {
            None
        } else {
            Some(provider.cipher(algorithm, &keys.key, &keys.iv)?)
        };
        Ok(Self {
            algorithm,
            key: keys.key.clone(),
            chained,
            block_size: params.block_size(),
            mac,
            version,
            counters: RecordCounters::default(),
        })
    }

    fn record(&self, content_type: ContentType, data: &[u8]) -> Result<CryptoData> {
        CryptoData::new(
            data.to_vec(),
            self.counters.sequence,
            self.version,
            content_type,
        )
    }

    fn cipher_for_record<'a>(
        &'a mut self,
        provider: &dyn CryptoProvider,
        explicit_iv: &[u8],
        fresh: &'a mut Option<Box<dyn Cipher>>,
    ) -> Result<&'a mut Box<dyn Cipher>> {
        match self.chained.as_mut() {
            Some(cipher) => Ok(cipher),
            None => Ok(fresh.insert(provider.cipher(self.algorithm, &self.key, explicit_iv)?)),
        }
    }

    fn encrypt(&mut self, provider: &dyn CryptoProvider, container: &CbcContainer) -> Result<Vec<u8>> {
        let explicit_iv = container.explicit_iv();
        if self.version.explicit_iv() && explicit_iv.len() != self.block_size {
            return Err(Error::invalid_length(
                "CBC explicit IV",
                self.block_size,
                explicit_iv.len(),
            ));
        }
        let mut body = container.to_bytes();
        let mut fresh = None;
        self.cipher_for_record(provider, explicit_iv, &mut fresh)?
            .encrypt(&mut body)?;
        self.counters.advance();

        let mut out = Vec::with_capacity(explicit_iv.len() + body.len());
        out.extend_from_slice(explicit_iv);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let sequence = self.counters.sequence;
        let iv_length = if self.version.explicit_iv() {
            self.block_size
        } else {
            0
        };
        if ciphertext.len() < iv_length + self.block_size
            || (ciphertext.len() - iv_length) % self.block_size != 0
        {
            self.counters.advance();
            return Err(Error::MacVerificationFailed { sequence });
        }
        let (explicit_iv, body) = ciphertext.split_at(iv_length);
        let mut plaintext = body.to_vec();
        let mut fresh = None;
        self.cipher_for_record(provider, explicit_iv, &mut fresh)?
            .decrypt(&mut plaintext)?;
        self.counters.advance();

        let data = CbcContainer::open(
            provider,
            plaintext,
            self.mac.algorithm,
            &self.mac.key,
            self.block_size,
            sequence,
            self.version,
            content_type,
        )?;
        Ok(data.data)
    }
}

/// AES-GCM engine.
pub struct GcmContext {
    algorithm: AeadAlgorithm,
    key: Zeroizing<Vec<u8>>,
    salt: [u8; GCM_SALT_LENGTH],
    version: ProtocolVersion,
    counters: RecordCounters,
}

impl fmt::Debug for GcmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcmContext")
            .field("algorithm", &self.algorithm)
            .field("version", &self.version)
            .field("counters", &self.counters)
            .finish()
    }
}

impl GcmContext {
    fn new(params: &SecurityParameters, keys: &SymmetricKeystore) -> Result<Self> {
        let algorithm = AeadAlgorithm::gcm_for_key_size(keys.key.len()).ok_or_else(|| {
            Error::UnsupportedCipherMode {
                mode: CipherMode::Gcm,
                reason: format!("no AES-GCM variant with a {}-byte key", keys.key.len()),
            }
        })?;
        let salt: [u8; GCM_SALT_LENGTH] = keys
            .iv
            .as_slice()
            .try_into()
            .map_err(|_| Error::invalid_length("GCM salt", GCM_SALT_LENGTH, keys.iv.len()))?;
        Ok(Self {
            algorithm,
            key: keys.key.clone(),
            salt,
            version: params.version(),
            counters: RecordCounters::default(),
        })
    }

    fn record(&self, content_type: ContentType, data: &[u8]) -> Result<CryptoData> {
        CryptoData::new(
            data.to_vec(),
            self.counters.sequence,
            self.version,
            content_type,
        )
    }

    fn nonce(&self, explicit: &[u8]) -> Vec<u8> {
        let mut nonce = Vec::with_capacity(GCM_SALT_LENGTH + GCM_EXPLICIT_NONCE_LENGTH);
        nonce.extend_from_slice(&self.salt);
        nonce.extend_from_slice(explicit);
        nonce
    }

    fn encrypt(&mut self, provider: &dyn CryptoProvider, container: &GcmContainer) -> Result<Vec<u8>> {
        let explicit = self.counters.nonce.to_be_bytes();
        let aead = provider.aead(self.algorithm)?;
        let sealed = aead.seal(
            &self.key,
            &self.nonce(&explicit),
            &container.additional_data(),
            &container.to_bytes(),
        )?;
        self.counters.advance();
        self.counters.nonce = self.counters.nonce.wrapping_add(1);

        let mut out = Vec::with_capacity(explicit.len() + sealed.len());
        out.extend_from_slice(&explicit);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    fn decrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let sequence = self.counters.sequence;
        let tag_size = self.algorithm.tag_size();
        if ciphertext.len() < GCM_EXPLICIT_NONCE_LENGTH + tag_size {
            self.counters.advance();
            return Err(Error::AuthenticationFailed { sequence });
        }
        let (explicit, sealed) = ciphertext.split_at(GCM_EXPLICIT_NONCE_LENGTH);
        let additional_data = record_header(
            sequence,
            content_type,
            self.version,
            sealed.len() - tag_size,
        );
        let aead = provider.aead(self.algorithm)?;
        let opened = aead.open(&self.key, &self.nonce(explicit), &additional_data, sealed);
        self.counters.advance();
        let plaintext = opened.map_err(|err| match err {
            tlsscope_crypto::Error::AuthenticationFailed => {
                tracing::debug!(sequence, "GCM tag mismatch");
                Error::AuthenticationFailed { sequence }
            },
            other => Error::Crypto(other),
        })?;

        let mut wire_nonce = [0u8; GCM_EXPLICIT_NONCE_LENGTH];
        wire_nonce.copy_from_slice(explicit);
        self.counters.nonce = u64::from_be_bytes(wire_nonce);

        let data = CryptoData::new(plaintext, sequence, self.version, content_type)?;
        Ok(data.data)
    }
}
