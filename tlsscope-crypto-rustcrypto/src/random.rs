//! Cryptographically secure random number generation backed by the OS.

use rand::rngs::OsRng;
use rand::RngCore;
use tlsscope_crypto::{Error, Random, Result};

/// Random number generator reading from the OS entropy source.
#[derive(Debug, Clone, Copy)]
pub struct OsRandom;

impl Random for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::CryptoError(format!("RNG error: {}", e)))
    }
}
