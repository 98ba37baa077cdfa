//! TLS protocol constants and types.

/// TLS protocol version.
///
/// Only the versions whose key schedule this crate implements are listed;
/// SSL 3.0 and TLS 1.3 are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ProtocolVersion {
    /// TLS 1.0 (RFC 2246)
    Tls10 = 0x0301,

    /// TLS 1.1 (RFC 4346)
    Tls11 = 0x0302,

    /// TLS 1.2 (RFC 5246)
    Tls12 = 0x0303,
}

impl ProtocolVersion {
    /// Create from wire format (u16 big-endian).
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0301 => Some(ProtocolVersion::Tls10),
            0x0302 => Some(ProtocolVersion::Tls11),
            0x0303 => Some(ProtocolVersion::Tls12),
            _ => None,
        }
    }

    /// Convert to wire format (u16 big-endian).
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Get the protocol name.
    pub const fn name(self) -> &'static str {
        match self {
            ProtocolVersion::Tls10 => "TLS 1.0",
            ProtocolVersion::Tls11 => "TLS 1.1",
            ProtocolVersion::Tls12 => "TLS 1.2",
        }
    }

    /// CBC records carry an explicit per-record IV from TLS 1.1 on.
    pub const fn explicit_iv(self) -> bool {
        !matches!(self, ProtocolVersion::Tls10)
    }

    /// TLS 1.2 replaced the MD5/SHA-1 PRF with a single-digest P_hash.
    pub const fn uses_single_digest_prf(self) -> bool {
        matches!(self, ProtocolVersion::Tls12)
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// TLS record content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    /// Change cipher spec (20)
    ChangeCipherSpec = 20,

    /// Alert (21)
    Alert = 21,

    /// Handshake (22)
    Handshake = 22,

    /// Application data (23)
    ApplicationData = 23,

    /// Heartbeat (24, RFC 6520)
    Heartbeat = 24,
}

impl ContentType {
    /// Create from wire format.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            20 => Some(ContentType::ChangeCipherSpec),
            21 => Some(ContentType::Alert),
            22 => Some(ContentType::Handshake),
            23 => Some(ContentType::ApplicationData),
            24 => Some(ContentType::Heartbeat),
            _ => None,
        }
    }

    /// Convert to wire format.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Handshake message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandshakeType {
    /// HelloRequest (0); never part of the handshake transcript
    HelloRequest = 0,
    /// ClientHello (1)
    ClientHello = 1,
    /// ServerHello (2)
    ServerHello = 2,
    /// Certificate (11)
    Certificate = 11,
    /// ServerKeyExchange (12)
    ServerKeyExchange = 12,
    /// CertificateRequest (13)
    CertificateRequest = 13,
    /// ServerHelloDone (14)
    ServerHelloDone = 14,
    /// CertificateVerify (15)
    CertificateVerify = 15,
    /// ClientKeyExchange (16)
    ClientKeyExchange = 16,
    /// Finished (20)
    Finished = 20,
}

impl HandshakeType {
    /// Convert to wire format.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Record compression method negotiated in the hellos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionMethod {
    /// No compression (0)
    Null,
    /// DEFLATE (1, RFC 3749)
    Deflate,
    /// A method this crate has no name for.
    Unknown(u8),
}

impl CompressionMethod {
    /// Create from wire format.
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => CompressionMethod::Null,
            1 => CompressionMethod::Deflate,
            other => CompressionMethod::Unknown(other),
        }
    }

    /// Convert to wire format.
    pub const fn to_u8(self) -> u8 {
        match self {
            CompressionMethod::Null => 0,
            CompressionMethod::Deflate => 1,
            CompressionMethod::Unknown(value) => value,
        }
    }

    /// Algorithm name, if known.
    pub const fn name(self) -> Option<&'static str> {
        match self {
            CompressionMethod::Null => Some("NULL"),
            CompressionMethod::Deflate => Some("DEFLATE"),
            CompressionMethod::Unknown(_) => None,
        }
    }
}

/// Largest TLSPlaintext fragment (2^14).
pub const MAX_FRAGMENT_LENGTH: usize = 16384;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_round_trip() {
        for version in [
            ProtocolVersion::Tls10,
            ProtocolVersion::Tls11,
            ProtocolVersion::Tls12,
        ] {
            assert_eq!(ProtocolVersion::from_u16(version.to_u16()), Some(version));
        }
        assert_eq!(ProtocolVersion::from_u16(0x0300), None);
        assert_eq!(ProtocolVersion::from_u16(0x0304), None);
    }

    #[test]
    fn test_version_features() {
        assert!(!ProtocolVersion::Tls10.explicit_iv());
        assert!(ProtocolVersion::Tls11.explicit_iv());
        assert!(!ProtocolVersion::Tls11.uses_single_digest_prf());
        assert!(ProtocolVersion::Tls12.uses_single_digest_prf());
        assert!(ProtocolVersion::Tls10 < ProtocolVersion::Tls12);
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(CompressionMethod::from_u8(0).name(), Some("NULL"));
        assert_eq!(CompressionMethod::from_u8(1).name(), Some("DEFLATE"));
        assert_eq!(CompressionMethod::from_u8(64), CompressionMethod::Unknown(64));
        assert_eq!(CompressionMethod::from_u8(64).name(), None);
        assert_eq!(CompressionMethod::Unknown(64).to_u8(), 64);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(ContentType::from_u8(23), Some(ContentType::ApplicationData));
        assert_eq!(ContentType::Handshake.to_u8(), 22);
        assert_eq!(ContentType::from_u8(99), None);
    }
}
