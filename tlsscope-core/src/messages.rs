//! Structured handshake messages as handed over by the dissection layer.
//!
//! Only the fields the session layer consumes are modelled. A [`Handshake`]
//! pairs the message with the bytes it was parsed from so that the
//! transcript hashes exactly what was on the wire.

use std::borrow::Cow;

use crate::prf::RANDOM_LENGTH;
use crate::protocol::HandshakeType;

/// Length of the random part after the timestamp.
pub const RANDOM_BYTES_LENGTH: usize = 28;

/// Handshake message header: type(1) || length(3).
pub const HANDSHAKE_HEADER_LENGTH: usize = 4;

fn hello_random(gmt_unix_time: u32, random_bytes: &[u8; RANDOM_BYTES_LENGTH]) -> [u8; RANDOM_LENGTH] {
    let mut random = [0u8; RANDOM_LENGTH];
    random[..4].copy_from_slice(&gmt_unix_time.to_be_bytes());
    random[4..].copy_from_slice(random_bytes);
    random
}

/// ClientHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    /// Highest version offered
    pub version: u16,
    /// First four bytes of the random
    pub gmt_unix_time: u32,
    /// Remaining 28 bytes of the random
    pub random_bytes: [u8; RANDOM_BYTES_LENGTH],
    /// Session id offered for resumption
    pub session_id: Vec<u8>,
}

impl ClientHello {
    /// `gmt_unix_time || random_bytes`
    pub fn random(&self) -> [u8; RANDOM_LENGTH] {
        hello_random(self.gmt_unix_time, &self.random_bytes)
    }
}

/// ServerHello.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    /// Negotiated version
    pub version: u16,
    /// First four bytes of the random
    pub gmt_unix_time: u32,
    /// Remaining 28 bytes of the random
    pub random_bytes: [u8; RANDOM_BYTES_LENGTH],
    /// Session id
    pub session_id: Vec<u8>,
    /// Negotiated cipher suite id
    pub cipher_suite: u16,
    /// Negotiated compression method
    pub compression_method: u8,
}

impl ServerHello {
    /// `gmt_unix_time || random_bytes`
    pub fn random(&self) -> [u8; RANDOM_LENGTH] {
        hello_random(self.gmt_unix_time, &self.random_bytes)
    }
}

/// Certificate: DER certificates, leaf first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateList {
    /// DER encoded certificates
    pub certificates: Vec<Vec<u8>>,
}

impl CertificateList {
    /// The server's own certificate.
    pub fn leaf(&self) -> Option<&[u8]> {
        self.certificates.first().map(Vec::as_slice)
    }
}

/// ServerKeyExchange parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerKeyExchange {
    /// Ephemeral finite-field DH
    Dh {
        /// Prime, big-endian
        p: Vec<u8>,
        /// Generator, big-endian
        g: Vec<u8>,
        /// Server public value `Ys`, big-endian
        public: Vec<u8>,
    },
    /// Ephemeral ECDH on a named curve
    Ecdh {
        /// RFC 4492 named curve id
        curve_id: u16,
        /// Encoded server point
        point: Vec<u8>,
    },
    /// Anything the dissector could not classify.
    Unknown(Vec<u8>),
}

/// ClientKeyExchange parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKeyExchange {
    /// RSA-encrypted premaster secret
    Rsa {
        /// PKCS#1 v1.5 ciphertext
        encrypted_premaster: Vec<u8>,
    },
    /// Client DH public value `Yc`
    Dh {
        /// Big-endian public value
        public: Vec<u8>,
    },
    /// Client ECDH point
    Ecdh {
        /// Encoded point
        point: Vec<u8>,
    },
}

impl ClientKeyExchange {
    /// Message body as sent on the wire (RFC 5246 §7.4.7, RFC 4492 §5.7).
    ///
    /// RSA and DH values carry a two-byte length, EC points a one-byte
    /// length.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (value, long_prefix) = match self {
            ClientKeyExchange::Rsa {
                encrypted_premaster,
            } => (encrypted_premaster, true),
            ClientKeyExchange::Dh { public } => (public, true),
            ClientKeyExchange::Ecdh { point } => (point, false),
        };
        let mut out = Vec::with_capacity(value.len() + 2);
        if long_prefix {
            out.extend_from_slice(&(value.len() as u16).to_be_bytes());
        } else {
            out.push(value.len() as u8);
        }
        out.extend_from_slice(value);
        out
    }
}

/// Finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    /// PRF output over the transcript
    pub verify_data: Vec<u8>,
}

/// A handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    /// HelloRequest
    HelloRequest,
    /// ClientHello
    ClientHello(ClientHello),
    /// ServerHello
    ServerHello(ServerHello),
    /// Certificate
    Certificate(CertificateList),
    /// ServerKeyExchange
    ServerKeyExchange(ServerKeyExchange),
    /// CertificateRequest
    CertificateRequest,
    /// ServerHelloDone
    ServerHelloDone,
    /// CertificateVerify with its signature
    CertificateVerify(Vec<u8>),
    /// ClientKeyExchange
    ClientKeyExchange(ClientKeyExchange),
    /// Finished
    Finished(Finished),
}

impl HandshakeMessage {
    /// Wire type of this message.
    pub fn handshake_type(&self) -> HandshakeType {
        match self {
            HandshakeMessage::HelloRequest => HandshakeType::HelloRequest,
            HandshakeMessage::ClientHello(_) => HandshakeType::ClientHello,
            HandshakeMessage::ServerHello(_) => HandshakeType::ServerHello,
            HandshakeMessage::Certificate(_) => HandshakeType::Certificate,
            HandshakeMessage::ServerKeyExchange(_) => HandshakeType::ServerKeyExchange,
            HandshakeMessage::CertificateRequest => HandshakeType::CertificateRequest,
            HandshakeMessage::ServerHelloDone => HandshakeType::ServerHelloDone,
            HandshakeMessage::CertificateVerify(_) => HandshakeType::CertificateVerify,
            HandshakeMessage::ClientKeyExchange(_) => HandshakeType::ClientKeyExchange,
            HandshakeMessage::Finished(_) => HandshakeType::Finished,
        }
    }
}

/// A handshake message and the bytes it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Parsed message
    pub message: HandshakeMessage,
    /// Full encoding including the 4-byte header, when known
    pub encoded: Option<Vec<u8>>,
}

impl Handshake {
    /// A message with its wire encoding.
    pub fn new(message: HandshakeMessage, encoded: Vec<u8>) -> Self {
        Self {
            message,
            encoded: Some(encoded),
        }
    }

    /// A message whose encoding is unknown, e.g. a Finished decrypted from
    /// an encrypted record.
    pub fn unencoded(message: HandshakeMessage) -> Self {
        Self {
            message,
            encoded: None,
        }
    }

    /// Bytes this message contributes to the handshake transcript.
    ///
    /// HelloRequest contributes nothing. A Finished without encoding is
    /// rebuilt as `type || length(3) || verify_data`. Other messages without
    /// encoding contribute nothing.
    pub fn transcript_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match (&self.message, &self.encoded) {
            (HandshakeMessage::HelloRequest, _) => None,
            (_, Some(encoded)) => Some(Cow::Borrowed(encoded.as_slice())),
            (HandshakeMessage::Finished(finished), None) => {
                Some(Cow::Owned(frame(HandshakeType::Finished, &finished.verify_data)))
            },
            (_, None) => None,
        }
    }
}

/// `type || length(3) || body`
pub fn frame(handshake_type: HandshakeType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LENGTH + body.len());
    out.push(handshake_type.to_u8());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_random_layout() {
        let hello = ClientHello {
            version: 0x0303,
            gmt_unix_time: 0x01020304,
            random_bytes: [0xab; 28],
            session_id: Vec::new(),
        };
        let random = hello.random();
        assert_eq!(&random[..4], &[1, 2, 3, 4]);
        assert_eq!(&random[4..], &[0xab; 28]);
    }

    #[test]
    fn test_finished_without_encoding() {
        let finished = Handshake::unencoded(HandshakeMessage::Finished(Finished {
            verify_data: vec![0x11; 12],
        }));
        let bytes = finished.transcript_bytes().unwrap();
        assert_eq!(&bytes[..4], &[20, 0, 0, 12]);
        assert_eq!(&bytes[4..], &[0x11; 12]);
    }

    #[test]
    fn test_transcript_bytes_selection() {
        let request = Handshake::new(HandshakeMessage::HelloRequest, vec![0, 0, 0, 0]);
        assert!(request.transcript_bytes().is_none());
        let done = Handshake::new(HandshakeMessage::ServerHelloDone, vec![14, 0, 0, 0]);
        assert_eq!(done.transcript_bytes().unwrap().as_ref(), &[14, 0, 0, 0]);
        assert!(Handshake::unencoded(HandshakeMessage::ServerHelloDone)
            .transcript_bytes()
            .is_none());
    }

    #[test]
    fn test_client_key_exchange_body() {
        let rsa = ClientKeyExchange::Rsa {
            encrypted_premaster: vec![0xee; 256],
        };
        let body = rsa.to_bytes();
        assert_eq!(&body[..2], &[0x01, 0x00]);
        assert_eq!(body.len(), 258);

        let ecdh = ClientKeyExchange::Ecdh {
            point: vec![0x04; 65],
        };
        assert_eq!(ecdh.to_bytes()[0], 65);
        assert_eq!(
            HandshakeMessage::ClientKeyExchange(ecdh).handshake_type(),
            HandshakeType::ClientKeyExchange
        );
    }
}
