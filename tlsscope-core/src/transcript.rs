//! Handshake transcript for TLS 1.0-1.2.
//!
//! Holds every handshake message except HelloRequest, in the order they
//! were processed. Finished verify data and CertificateVerify signatures
//! are computed over the concatenation.

use tlsscope_crypto::{CryptoProvider, HashAlgorithm};

use crate::error::Result;
use crate::messages::Handshake;

/// Ordered handshake messages of one connection.
#[derive(Debug, Clone, Default)]
pub struct HandshakeTranscript {
    messages: Vec<Vec<u8>>,
}

impl HandshakeTranscript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add raw handshake message bytes (header included).
    pub fn update(&mut self, message: &[u8]) {
        self.messages.push(message.to_vec());
    }

    /// Add a parsed message.
    ///
    /// Returns whether the message contributed bytes.
    pub fn record(&mut self, handshake: &Handshake) -> bool {
        match handshake.transcript_bytes() {
            Some(bytes) => {
                self.messages.push(bytes.into_owned());
                true
            },
            None => false,
        }
    }

    /// All messages concatenated.
    pub fn concatenated(&self) -> Vec<u8> {
        self.messages.concat()
    }

    /// Hash of all messages with `algorithm`.
    pub fn hash(&self, provider: &dyn CryptoProvider, algorithm: HashAlgorithm) -> Result<Vec<u8>> {
        let mut hasher = provider.hash(algorithm)?;
        for message in &self.messages {
            hasher.update(message);
        }
        Ok(hasher.finalize())
    }

    /// Forget all messages.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Number of messages recorded.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total size of all messages in bytes.
    pub fn total_size(&self) -> usize {
        self.messages.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Finished, HandshakeMessage};
    use sha2::{Digest, Sha256};
    use tlsscope_crypto_rustcrypto::RustCryptoProvider;

    #[test]
    fn test_hash_matches_concatenation() {
        let provider = RustCryptoProvider::new();
        let mut transcript = HandshakeTranscript::new();
        transcript.update(b"client hello");
        transcript.update(b"server hello");

        let expected = Sha256::digest(b"client helloserver hello");
        assert_eq!(
            transcript.hash(&provider, HashAlgorithm::Sha256).unwrap(),
            expected.to_vec()
        );
        assert_eq!(transcript.concatenated(), b"client helloserver hello");
        assert_eq!(transcript.total_size(), 24);
    }

    #[test]
    fn test_hello_request_skipped() {
        let mut transcript = HandshakeTranscript::new();
        assert!(!transcript.record(&Handshake::new(HandshakeMessage::HelloRequest, vec![0; 4])));
        assert!(transcript.record(&Handshake::unencoded(HandshakeMessage::Finished(Finished {
            verify_data: vec![1; 12],
        }))));
        assert_eq!(transcript.message_count(), 1);
        assert_eq!(transcript.total_size(), 16);
        transcript.reset();
        assert!(transcript.is_empty());
    }
}
