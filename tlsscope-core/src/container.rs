//! Per-mode record framing.
//!
//! A container holds one record's plaintext together with everything the
//! mode adds around it before encryption:
//!
//! ```text
//! STREAM:  content || MAC
//! CBC:     [explicit IV] || content || MAC || padding || padding_length
//! GCM:     content, authenticated with
//!          seq_num(8) || type(1) || version(2) || length(2)
//! ```
//!
//! The MAC in the first two modes is
//! `HMAC(mac_key, seq_num(8) || type(1) || version(2) || length(2) || content)`.
//! The opening side of each mode lives here too, so that framing and
//! unframing stay next to each other.

use subtle::ConstantTimeEq;
use tlsscope_crypto::{CryptoProvider, HashAlgorithm};

use crate::cipher_suites::CipherMode;
use crate::error::{Error, Result};
use crate::protocol::{ContentType, ProtocolVersion, MAX_FRAGMENT_LENGTH};

/// Length of the MAC pseudo-header and of the GCM additional data.
pub const RECORD_HEADER_LENGTH: usize = 13;

/// One record's plaintext and the values it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoData {
    /// Record content
    pub data: Vec<u8>,
    /// Sequence number of the record in its direction
    pub sequence: u64,
    /// Record layer version
    pub version: ProtocolVersion,
    /// Record content type
    pub content_type: ContentType,
}

impl CryptoData {
    /// Bundle a record.
    ///
    /// # Errors
    ///
    /// `InvalidLength` when `data` exceeds 2^14 bytes.
    pub fn new(
        data: Vec<u8>,
        sequence: u64,
        version: ProtocolVersion,
        content_type: ContentType,
    ) -> Result<Self> {
        if data.len() > MAX_FRAGMENT_LENGTH {
            return Err(Error::invalid_length(
                "record fragment",
                MAX_FRAGMENT_LENGTH,
                data.len(),
            ));
        }
        Ok(Self {
            data,
            sequence,
            version,
            content_type,
        })
    }

    /// `seq_num || type || version || length`, over the plaintext length.
    pub fn header(&self) -> [u8; RECORD_HEADER_LENGTH] {
        record_header(self.sequence, self.content_type, self.version, self.data.len())
    }

    /// Record MAC; empty when the suite has no MAC.
    pub fn mac(
        &self,
        provider: &dyn CryptoProvider,
        algorithm: Option<HashAlgorithm>,
        key: &[u8],
    ) -> Result<Vec<u8>> {
        let Some(algorithm) = algorithm else {
            return Ok(Vec::new());
        };
        let mut hmac = provider.hmac(algorithm, key)?;
        hmac.update(&self.header());
        hmac.update(&self.data);
        Ok(hmac.finalize())
    }

    fn verify_mac(
        &self,
        provider: &dyn CryptoProvider,
        algorithm: Option<HashAlgorithm>,
        key: &[u8],
        received: &[u8],
    ) -> Result<()> {
        let expected = self.mac(provider, algorithm, key)?;
        if bool::from(expected.ct_eq(received)) {
            Ok(())
        } else {
            Err(Error::MacVerificationFailed {
                sequence: self.sequence,
            })
        }
    }
}

/// MAC pseudo-header and GCM additional data for a record of `length`
/// plaintext bytes.
pub fn record_header(
    sequence: u64,
    content_type: ContentType,
    version: ProtocolVersion,
    length: usize,
) -> [u8; RECORD_HEADER_LENGTH] {
    let mut header = [0u8; RECORD_HEADER_LENGTH];
    header[..8].copy_from_slice(&sequence.to_be_bytes());
    header[8] = content_type.to_u8();
    header[9..11].copy_from_slice(&version.to_u16().to_be_bytes());
    header[11..13].copy_from_slice(&(length as u16).to_be_bytes());
    header
}

/// Stream cipher framing: `content || MAC`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamContainer {
    data: CryptoData,
    mac: Vec<u8>,
}

impl StreamContainer {
    /// Frame a record, computing its MAC.
    pub fn new(
        provider: &dyn CryptoProvider,
        data: CryptoData,
        mac_algorithm: Option<HashAlgorithm>,
        mac_key: &[u8],
    ) -> Result<Self> {
        let mac = data.mac(provider, mac_algorithm, mac_key)?;
        Ok(Self { data, mac })
    }

    /// Split decrypted `content || MAC` and verify the MAC.
    ///
    /// # Errors
    ///
    /// `MacVerificationFailed` on a short record or a wrong MAC.
    pub fn open(
        provider: &dyn CryptoProvider,
        plaintext: Vec<u8>,
        mac_algorithm: Option<HashAlgorithm>,
        mac_key: &[u8],
        sequence: u64,
        version: ProtocolVersion,
        content_type: ContentType,
    ) -> Result<CryptoData> {
        let mac_length = mac_algorithm.map_or(0, HashAlgorithm::output_size);
        let mut content = plaintext;
        if content.len() < mac_length {
            return Err(Error::MacVerificationFailed { sequence });
        }
        let mac = content.split_off(content.len() - mac_length);
        let data = CryptoData::new(content, sequence, version, content_type)?;
        data.verify_mac(provider, mac_algorithm, mac_key, &mac)?;
        Ok(data)
    }

    /// The framed record.
    pub fn data(&self) -> &CryptoData {
        &self.data
    }

    /// Record MAC.
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// Bytes handed to the stream cipher.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.data.data);
        out.extend_from_slice(&self.mac);
        out
    }

    /// Framed length.
    pub fn len(&self) -> usize {
        self.data.data.len() + self.mac.len()
    }

    /// Whether the framed record is empty (no content, no MAC).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// CBC framing: `[explicit IV] || content || MAC || padding || padding_length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CbcContainer {
    data: CryptoData,
    mac: Vec<u8>,
    padding_length: u8,
    explicit_iv: Vec<u8>,
}

impl CbcContainer {
    /// Frame a record.
    ///
    /// Padding is the minimum that makes `content || MAC || padding ||
    /// padding_length` a multiple of `block_size`. From TLS 1.1 on a random
    /// block-sized explicit IV is drawn from the provider.
    pub fn new(
        provider: &dyn CryptoProvider,
        data: CryptoData,
        mac_algorithm: Option<HashAlgorithm>,
        mac_key: &[u8],
        block_size: usize,
    ) -> Result<Self> {
        if block_size == 0 || block_size > 256 {
            return Err(Error::InvalidConfig(format!(
                "CBC block size {} out of range",
                block_size
            )));
        }
        let mac = data.mac(provider, mac_algorithm, mac_key)?;
        let padding_length = padding_length(data.data.len() + mac.len(), block_size);
        let explicit_iv = if data.version.explicit_iv() {
            provider.random().generate(block_size)?
        } else {
            Vec::new()
        };
        Ok(Self {
            data,
            mac,
            padding_length,
            explicit_iv,
        })
    }

    /// Strip padding and MAC from a decrypted record and verify both.
    ///
    /// `plaintext` excludes the explicit IV.
    ///
    /// # Errors
    ///
    /// `MacVerificationFailed` for bad padding, a short record or a wrong
    /// MAC. The causes are not distinguished.
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        provider: &dyn CryptoProvider,
        plaintext: Vec<u8>,
        mac_algorithm: Option<HashAlgorithm>,
        mac_key: &[u8],
        block_size: usize,
        sequence: u64,
        version: ProtocolVersion,
        content_type: ContentType,
    ) -> Result<CryptoData> {
        let bad_record = Error::MacVerificationFailed { sequence };
        let mac_length = mac_algorithm.map_or(0, HashAlgorithm::output_size);
        if plaintext.is_empty() || block_size == 0 || plaintext.len() % block_size != 0 {
            return Err(bad_record);
        }
        let mut content = plaintext;
        let padding_length = usize::from(content[content.len() - 1]);
        if padding_length + 1 + mac_length > content.len() {
            return Err(bad_record);
        }
        let padding_start = content.len() - 1 - padding_length;
        let padding_ok = content[padding_start..]
            .iter()
            .fold(0u8, |acc, &byte| acc | (byte ^ padding_length as u8));
        if padding_ok != 0 {
            return Err(bad_record);
        }
        content.truncate(padding_start);
        let mac = content.split_off(content.len() - mac_length);
        let data = CryptoData::new(content, sequence, version, content_type)?;
        data.verify_mac(provider, mac_algorithm, mac_key, &mac)?;
        Ok(data)
    }

    /// The framed record.
    pub fn data(&self) -> &CryptoData {
        &self.data
    }

    /// Record MAC.
    pub fn mac(&self) -> &[u8] {
        &self.mac
    }

    /// Value of the padding length byte (and of every padding byte).
    pub fn padding_length(&self) -> u8 {
        self.padding_length
    }

    /// Explicit IV sent ahead of the ciphertext; empty for TLS 1.0.
    pub fn explicit_iv(&self) -> &[u8] {
        &self.explicit_iv
    }

    /// `content || MAC || padding || padding_length`, the bytes that are
    /// CBC-encrypted.
    pub fn to_bytes(&self) -> Vec<u8> {
        let pad = usize::from(self.padding_length);
        let mut out = Vec::with_capacity(self.data.data.len() + self.mac.len() + pad + 1);
        out.extend_from_slice(&self.data.data);
        out.extend_from_slice(&self.mac);
        out.resize(out.len() + pad + 1, self.padding_length);
        out
    }

    /// Length on the wire after encryption, explicit IV included.
    pub fn len(&self) -> usize {
        self.explicit_iv.len()
            + self.data.data.len()
            + self.mac.len()
            + usize::from(self.padding_length)
            + 1
    }

    /// Always false: the padding length byte is present even for empty
    /// content.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// `(B - (L + 1) mod B) mod B` for content-plus-MAC length `L`.
///
/// Block sizes are at most 256 so the result fits a byte.
pub fn padding_length(content_and_mac: usize, block_size: usize) -> u8 {
    ((block_size - (content_and_mac + 1) % block_size) % block_size) as u8
}

/// GCM framing: the content plus its additional data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcmContainer {
    data: CryptoData,
}

impl GcmContainer {
    /// Frame a record.
    pub fn new(data: CryptoData) -> Self {
        Self { data }
    }

    /// The framed record.
    pub fn data(&self) -> &CryptoData {
        &self.data
    }

    /// `seq_num || type || version || plaintext length`
    pub fn additional_data(&self) -> [u8; RECORD_HEADER_LENGTH] {
        self.data.header()
    }

    /// Plaintext handed to the AEAD.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.data.clone()
    }

    /// Plaintext length.
    pub fn len(&self) -> usize {
        self.data.data.len()
    }

    /// Whether the plaintext is empty.
    pub fn is_empty(&self) -> bool {
        self.data.data.is_empty()
    }
}

/// A framed record of any mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoContainer {
    /// Stream framing
    Stream(StreamContainer),
    /// CBC framing
    Cbc(CbcContainer),
    /// GCM framing
    Gcm(GcmContainer),
}

impl CryptoContainer {
    /// Mode of this container.
    pub fn mode(&self) -> CipherMode {
        match self {
            CryptoContainer::Stream(_) => CipherMode::Stream,
            CryptoContainer::Cbc(_) => CipherMode::Cbc,
            CryptoContainer::Gcm(_) => CipherMode::Gcm,
        }
    }

    /// The framed record.
    pub fn data(&self) -> &CryptoData {
        match self {
            CryptoContainer::Stream(c) => c.data(),
            CryptoContainer::Cbc(c) => c.data(),
            CryptoContainer::Gcm(c) => c.data(),
        }
    }

    /// Bytes handed to the cipher.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            CryptoContainer::Stream(c) => c.to_bytes(),
            CryptoContainer::Cbc(c) => c.to_bytes(),
            CryptoContainer::Gcm(c) => c.to_bytes(),
        }
    }

    /// Framed length.
    pub fn len(&self) -> usize {
        match self {
            CryptoContainer::Stream(c) => c.len(),
            CryptoContainer::Cbc(c) => c.len(),
            CryptoContainer::Gcm(c) => c.len(),
        }
    }

    /// Whether the framed record is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
