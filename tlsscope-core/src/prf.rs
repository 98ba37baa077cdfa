//! TLS pseudorandom function (RFC 2246 §5, RFC 5246 §5).
//!
//! TLS 1.2 expands with a single HMAC digest:
//!
//! ```text
//! PRF(secret, label, seed) = P_<hash>(secret, label + seed)
//!
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) +
//!                        HMAC_hash(secret, A(2) + seed) + ...
//! A(0) = seed
//! A(i) = HMAC_hash(secret, A(i-1))
//! ```
//!
//! TLS 1.0 and 1.1 split the secret into two halves (sharing the middle
//! byte when the length is odd) and XOR `P_MD5(S1, ...)` with
//! `P_SHA1(S2, ...)`.

use tlsscope_crypto::{CryptoProvider, HashAlgorithm};
use zeroize::Zeroizing;

use crate::cipher_suites::CipherSuiteDescriptor;
use crate::error::{Error, Result};
use crate::protocol::ProtocolVersion;

/// PRF labels.
pub mod labels {
    /// Master secret derivation.
    pub const MASTER_SECRET: &[u8] = b"master secret";
    /// Key block expansion.
    pub const KEY_EXPANSION: &[u8] = b"key expansion";
    /// Client Finished verify data.
    pub const CLIENT_FINISHED: &[u8] = b"client finished";
    /// Server Finished verify data.
    pub const SERVER_FINISHED: &[u8] = b"server finished";
    /// Export client write key (RFC 2246 §6.3).
    pub const CLIENT_WRITE_KEY: &[u8] = b"client write key";
    /// Export server write key (RFC 2246 §6.3).
    pub const SERVER_WRITE_KEY: &[u8] = b"server write key";
    /// Export IV block (RFC 2246 §6.3).
    pub const IV_BLOCK: &[u8] = b"IV block";
}

/// Length of the master secret.
pub const MASTER_SECRET_LENGTH: usize = 48;

/// Length of a hello random.
pub const RANDOM_LENGTH: usize = 32;

/// A version-bound PRF.
///
/// Holds no key material; the provider is passed to each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prf {
    version: ProtocolVersion,
    digest: HashAlgorithm,
}

impl Prf {
    /// Create the PRF for a negotiated version.
    ///
    /// `digest` selects the TLS 1.2 P_hash digest (SHA-256 when `None`).
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if a digest is given for TLS 1.0/1.1, whose PRF is
    /// fixed to MD5/SHA-1.
    pub fn new(version: ProtocolVersion, digest: Option<HashAlgorithm>) -> Result<Self> {
        if !version.uses_single_digest_prf() {
            if let Some(digest) = digest {
                return Err(Error::InvalidConfig(format!(
                    "{} PRF is fixed to MD5/SHA-1, cannot select {:?}",
                    version, digest
                )));
            }
        }
        Ok(Self {
            version,
            digest: digest.unwrap_or(HashAlgorithm::Sha256),
        })
    }

    /// The PRF a suite negotiated at `version` uses.
    ///
    /// The suite's digest only takes effect from TLS 1.2 on.
    pub fn for_suite(version: ProtocolVersion, suite: &CipherSuiteDescriptor) -> Self {
        let digest = if version.uses_single_digest_prf() {
            suite.prf_digest.unwrap_or(HashAlgorithm::Sha256)
        } else {
            HashAlgorithm::Sha256
        };
        Self { version, digest }
    }

    /// Negotiated version.
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// P_hash digest for TLS 1.2; `None` for the MD5/SHA-1 PRF.
    pub fn digest(&self) -> Option<HashAlgorithm> {
        self.version.uses_single_digest_prf().then_some(self.digest)
    }

    /// Expand `secret` into exactly `length` bytes.
    pub fn compute(
        &self,
        provider: &dyn CryptoProvider,
        secret: &[u8],
        label: &[u8],
        seed: &[u8],
        length: usize,
    ) -> Result<Vec<u8>> {
        let mut label_seed = Vec::with_capacity(label.len() + seed.len());
        label_seed.extend_from_slice(label);
        label_seed.extend_from_slice(seed);

        if self.version.uses_single_digest_prf() {
            return p_hash(provider, self.digest, secret, &label_seed, length);
        }

        let half = (secret.len() + 1) / 2;
        let s1 = &secret[..half];
        let s2 = &secret[secret.len() - half..];
        let mut output = p_hash(provider, HashAlgorithm::Md5, s1, &label_seed, length)?;
        let sha = p_hash(provider, HashAlgorithm::Sha1, s2, &label_seed, length)?;
        for (out, byte) in output.iter_mut().zip(sha.iter()) {
            *out ^= byte;
        }
        Ok(output)
    }

    /// `PRF(pre_master_secret, "master secret", client_random + server_random)[0..47]`
    pub fn master_secret(
        &self,
        provider: &dyn CryptoProvider,
        premaster_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let seed = concat_randoms(client_random, server_random)?;
        self.compute(
            provider,
            premaster_secret,
            labels::MASTER_SECRET,
            &seed,
            MASTER_SECRET_LENGTH,
        )
        .map(Zeroizing::new)
    }

    /// `PRF(master_secret, "key expansion", server_random + client_random)`
    ///
    /// The randoms are in the opposite order to [`Prf::master_secret`].
    pub fn key_block(
        &self,
        provider: &dyn CryptoProvider,
        master_secret: &[u8],
        client_random: &[u8],
        server_random: &[u8],
        length: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        if master_secret.len() != MASTER_SECRET_LENGTH {
            return Err(Error::invalid_length(
                "master secret",
                MASTER_SECRET_LENGTH,
                master_secret.len(),
            ));
        }
        let seed = concat_randoms(server_random, client_random)?;
        self.compute(provider, master_secret, labels::KEY_EXPANSION, &seed, length)
            .map(Zeroizing::new)
    }

    /// Finished verify data over the concatenated handshake messages.
    ///
    /// The seed is `Hash(messages)` with the PRF digest for TLS 1.2 and
    /// `MD5(messages) + SHA1(messages)` before that.
    pub fn verify_data(
        &self,
        provider: &dyn CryptoProvider,
        master_secret: &[u8],
        label: &[u8],
        handshake_messages: &[u8],
        length: usize,
    ) -> Result<Vec<u8>> {
        let seed = self.handshake_digest(provider, handshake_messages)?;
        self.compute(provider, master_secret, label, &seed, length)
    }

    /// Digest of the handshake messages as used for Finished.
    pub fn handshake_digest(
        &self,
        provider: &dyn CryptoProvider,
        handshake_messages: &[u8],
    ) -> Result<Vec<u8>> {
        if self.version.uses_single_digest_prf() {
            return digest(provider, self.digest, handshake_messages);
        }
        let mut seed = digest(provider, HashAlgorithm::Md5, handshake_messages)?;
        seed.extend(digest(provider, HashAlgorithm::Sha1, handshake_messages)?);
        Ok(seed)
    }
}

fn concat_randoms(first: &[u8], second: &[u8]) -> Result<Vec<u8>> {
    if first.len() != RANDOM_LENGTH {
        return Err(Error::invalid_length("random", RANDOM_LENGTH, first.len()));
    }
    if second.len() != RANDOM_LENGTH {
        return Err(Error::invalid_length("random", RANDOM_LENGTH, second.len()));
    }
    let mut seed = Vec::with_capacity(2 * RANDOM_LENGTH);
    seed.extend_from_slice(first);
    seed.extend_from_slice(second);
    Ok(seed)
}

pub(crate) fn digest(
    provider: &dyn CryptoProvider,
    algorithm: HashAlgorithm,
    data: &[u8],
) -> Result<Vec<u8>> {
    let mut hash = provider.hash(algorithm)?;
    hash.update(data);
    Ok(hash.finalize())
}

/// `P_hash(secret, seed)` truncated to `length` bytes.
pub fn p_hash(
    provider: &dyn CryptoProvider,
    algorithm: HashAlgorithm,
    secret: &[u8],
    seed: &[u8],
    length: usize,
) -> Result<Vec<u8>> {
    let hmac = |data: &[u8]| -> Result<Vec<u8>> {
        let mut mac = provider.hmac(algorithm, secret)?;
        mac.update(data);
        Ok(mac.finalize())
    };

    let mut output = Vec::with_capacity(length + algorithm.output_size());
    let mut a = seed.to_vec();
    while output.len() < length {
        a = hmac(&a)?;
        let mut a_seed = Vec::with_capacity(a.len() + seed.len());
        a_seed.extend_from_slice(&a);
        a_seed.extend_from_slice(seed);
        output.extend(hmac(&a_seed)?);
    }
    output.truncate(length);
    Ok(output)
}
