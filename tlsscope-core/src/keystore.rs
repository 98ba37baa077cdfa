//! Key material holders.
//!
//! Each direction of a session owns one store per kind of material:
//! symmetric record keys, an RSA key, and ephemeral key-exchange values.
//! Stores start out [`KeySlot::Unset`]. A caller can supply material up
//! front ([`KeySlot::provide`]); the session only fills slots the caller
//! left empty ([`KeySlot::derive`]).

use std::fmt;

use tlsscope_crypto::{AsymmetricKey, CryptoProvider, KeyExchangeAlgorithm, PrivateKey, PublicKey};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// SEC1 uncompressed point marker.
const UNCOMPRESSED_POINT: u8 = 0x04;

/// Where the content of a key slot came from.
#[derive(Debug, Clone, Default)]
pub enum KeySlot<T> {
    /// Nothing stored yet.
    #[default]
    Unset,
    /// Supplied by the caller. Never replaced by derivation.
    Provided(T),
    /// Derived by the session from handshake traffic.
    Derived(T),
}

impl<T> KeySlot<T> {
    /// Store caller-supplied material.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the session already derived material for this slot.
    pub fn provide(&mut self, value: T) -> Result<()> {
        if let KeySlot::Derived(_) = self {
            return Err(Error::InvalidState(
                "key material already derived from handshake traffic".into(),
            ));
        }
        *self = KeySlot::Provided(value);
        Ok(())
    }

    /// Store derived material unless the caller supplied some.
    ///
    /// Returns whether the value was stored.
    pub fn derive(&mut self, value: T) -> bool {
        if let KeySlot::Provided(_) = self {
            return false;
        }
        *self = KeySlot::Derived(value);
        true
    }

    /// Stored material, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            KeySlot::Unset => None,
            KeySlot::Provided(value) | KeySlot::Derived(value) => Some(value),
        }
    }

    /// Mutable access to stored material.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            KeySlot::Unset => None,
            KeySlot::Provided(value) | KeySlot::Derived(value) => Some(value),
        }
    }

    /// Whether the slot holds material.
    pub fn is_set(&self) -> bool {
        !matches!(self, KeySlot::Unset)
    }

    /// Whether the material came from the caller.
    pub fn is_provided(&self) -> bool {
        matches!(self, KeySlot::Provided(_))
    }

    /// Drop derived material, keeping caller-supplied material.
    pub fn clear_derived(&mut self) {
        if let KeySlot::Derived(_) = self {
            *self = KeySlot::Unset;
        }
    }
}

/// Record keys for one direction.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKeystore {
    /// Bulk cipher key
    pub key: Zeroizing<Vec<u8>>,
    /// MAC key (empty for AEAD suites)
    pub mac_key: Zeroizing<Vec<u8>>,
    /// CBC IV, GCM salt, or empty
    pub iv: Zeroizing<Vec<u8>>,
}

impl SymmetricKeystore {
    /// Bundle record keys.
    pub fn new(key: Vec<u8>, mac_key: Vec<u8>, iv: Vec<u8>) -> Self {
        Self {
            key: Zeroizing::new(key),
            mac_key: Zeroizing::new(mac_key),
            iv: Zeroizing::new(iv),
        }
    }
}

impl fmt::Debug for SymmetricKeystore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKeystore")
            .field("key_len", &self.key.len())
            .field("mac_key_len", &self.mac_key.len())
            .field("iv_len", &self.iv.len())
            .finish()
    }
}

/// An RSA key with the certificate it came from, if any.
#[derive(Debug)]
pub struct AsymmetricKeystore {
    key: Box<dyn AsymmetricKey>,
    certificate: Option<Vec<u8>>,
}

impl AsymmetricKeystore {
    /// Wrap a loaded key.
    pub fn new(key: Box<dyn AsymmetricKey>) -> Self {
        Self {
            key,
            certificate: None,
        }
    }

    /// Extract the public key from a DER certificate and keep the certificate.
    pub fn from_certificate(provider: &dyn CryptoProvider, der: &[u8]) -> Result<Self> {
        let key = provider.rsa_public_key_from_certificate(der)?;
        Ok(Self {
            key,
            certificate: Some(der.to_vec()),
        })
    }

    /// Record the certificate seen on the wire without touching the key.
    pub fn attach_certificate(&mut self, der: &[u8]) {
        self.certificate = Some(der.to_vec());
    }

    /// The key.
    pub fn key(&self) -> &dyn AsymmetricKey {
        self.key.as_ref()
    }

    /// DER certificate, if one was seen.
    pub fn certificate(&self) -> Option<&[u8]> {
        self.certificate.as_deref()
    }

    /// Whether private operations are possible.
    pub fn has_private_key(&self) -> bool {
        self.key.has_private_key()
    }
}

/// Finite-field Diffie-Hellman values of one party.
#[derive(Debug, Clone)]
pub struct DhKeystore {
    /// Group prime, big-endian
    pub prime: Vec<u8>,
    /// Group generator, big-endian
    pub generator: Vec<u8>,
    /// This party's public value, big-endian
    pub public: Vec<u8>,
    /// This party's private exponent, when known
    pub private: Option<PrivateKey>,
}

impl DhKeystore {
    /// Values as announced by a peer (no private half).
    pub fn new(prime: Vec<u8>, generator: Vec<u8>, public: Vec<u8>) -> Self {
        Self {
            prime,
            generator,
            public,
            private: None,
        }
    }

    /// Create a key pair in the same group as `peer`.
    ///
    /// When `private` is given it is used as the exponent instead of a fresh
    /// random one.
    pub fn key_pair_for(
        provider: &dyn CryptoProvider,
        peer: &DhKeystore,
        private: Option<&[u8]>,
    ) -> Result<Self> {
        let dh = provider.dh(&peer.prime, &peer.generator)?;
        let (private, public) = match private {
            Some(bytes) => {
                let private = PrivateKey::from_bytes(bytes.to_vec());
                let public = dh.public_key(&private)?;
                (private, public)
            },
            None => dh.generate_keypair()?,
        };
        Ok(Self {
            prime: peer.prime.clone(),
            generator: peer.generator.clone(),
            public: public.into_bytes(),
            private: Some(private),
        })
    }

    /// `peer_public ^ private mod p`, leading zero bytes stripped.
    ///
    /// # Errors
    ///
    /// `InvalidState` when this store has no private exponent.
    pub fn shared_secret(
        &self,
        provider: &dyn CryptoProvider,
        peer_public: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let private = self
            .private
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no DH private value".into()))?;
        let dh = provider.dh(&self.prime, &self.generator)?;
        let secret = dh.exchange(private, peer_public)?;
        Ok(Zeroizing::new(secret.as_bytes().to_vec()))
    }
}

/// Elliptic-curve Diffie-Hellman values of one party.
#[derive(Debug, Clone)]
pub struct EcdhKeystore {
    /// RFC 4492 named curve id
    pub curve_id: u16,
    /// Resolved curve; `None` when the id is not supported
    pub curve: Option<KeyExchangeAlgorithm>,
    /// Affine x coordinate, big-endian
    pub x: Vec<u8>,
    /// Affine y coordinate, big-endian
    pub y: Vec<u8>,
    /// This party's private scalar, when known
    pub private: Option<PrivateKey>,
}

impl EcdhKeystore {
    /// Decode an uncompressed point announced for `curve_id`.
    ///
    /// Unknown curves are accepted; the raw coordinates are kept and
    /// [`EcdhKeystore::unknown_curve`] reports true.
    ///
    /// # Errors
    ///
    /// `InvalidMessage` if the point is not in uncompressed form.
    pub fn from_point(curve_id: u16, point: &[u8]) -> Result<Self> {
        let (x, y) = decode_uncompressed_point(point)?;
        let curve = KeyExchangeAlgorithm::from_named_curve(curve_id);
        if let Some(size) = curve.and_then(KeyExchangeAlgorithm::coordinate_size) {
            if x.len() != size {
                return Err(Error::InvalidMessage(format!(
                    "curve 0x{:04x} point coordinates must be {} bytes, got {}",
                    curve_id,
                    size,
                    x.len()
                )));
            }
        }
        Ok(Self {
            curve_id,
            curve,
            x,
            y,
            private: None,
        })
    }

    /// Create a key pair on the same curve as `peer`.
    ///
    /// # Errors
    ///
    /// `UnknownCurve` when the peer's curve is not supported.
    pub fn key_pair_for(
        provider: &dyn CryptoProvider,
        peer: &EcdhKeystore,
        private: Option<&[u8]>,
    ) -> Result<Self> {
        let curve = peer.curve.ok_or(Error::UnknownCurve(peer.curve_id))?;
        let kex = provider.key_exchange(curve)?;
        let (private, public): (PrivateKey, PublicKey) = match private {
            Some(bytes) => {
                let private = PrivateKey::from_bytes(bytes.to_vec());
                let public = kex.public_key(&private)?;
                (private, public)
            },
            None => kex.generate_keypair()?,
        };
        let mut store = Self::from_point(peer.curve_id, public.as_bytes())?;
        store.private = Some(private);
        Ok(store)
    }

    /// Whether the curve is outside the supported set.
    pub fn unknown_curve(&self) -> bool {
        self.curve.is_none()
    }

    /// `0x04 || x || y`
    pub fn encoded_point(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(1 + self.x.len() + self.y.len());
        point.push(UNCOMPRESSED_POINT);
        point.extend_from_slice(&self.x);
        point.extend_from_slice(&self.y);
        point
    }

    /// x coordinate of `private * peer_point`.
    ///
    /// # Errors
    ///
    /// - `UnknownCurve` for unsupported curves
    /// - `InvalidState` when this store has no private scalar
    pub fn shared_secret(
        &self,
        provider: &dyn CryptoProvider,
        peer_point: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let curve = self.curve.ok_or(Error::UnknownCurve(self.curve_id))?;
        let private = self
            .private
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no ECDH private scalar".into()))?;
        let kex = provider.key_exchange(curve)?;
        let secret = kex.exchange(private, peer_point)?;
        Ok(Zeroizing::new(secret.as_bytes().to_vec()))
    }
}

/// Ephemeral key-exchange values of one party.
#[derive(Debug, Clone)]
pub enum KexKeystore {
    /// Finite-field DH
    Dh(DhKeystore),
    /// Elliptic-curve DH
    Ecdh(EcdhKeystore),
}

impl KexKeystore {
    /// Short name of the exchange kind.
    pub fn kind(&self) -> &'static str {
        match self {
            KexKeystore::Dh(_) => "DH",
            KexKeystore::Ecdh(_) => "ECDH",
        }
    }

    /// Public value as sent in a key exchange message.
    pub fn public_value(&self) -> Vec<u8> {
        match self {
            KexKeystore::Dh(dh) => dh.public.clone(),
            KexKeystore::Ecdh(ecdh) => ecdh.encoded_point(),
        }
    }

    /// Whether the private half is known.
    pub fn has_private(&self) -> bool {
        match self {
            KexKeystore::Dh(dh) => dh.private.is_some(),
            KexKeystore::Ecdh(ecdh) => ecdh.private.is_some(),
        }
    }

    /// Shared secret between this store's private half and `peer`'s
    /// public value.
    ///
    /// # Errors
    ///
    /// `KeyExchangeMismatch` if `peer` is of another kind.
    pub fn shared_secret(
        &self,
        provider: &dyn CryptoProvider,
        peer: &KexKeystore,
    ) -> Result<Zeroizing<Vec<u8>>> {
        match (self, peer) {
            (KexKeystore::Dh(own), KexKeystore::Dh(peer)) => {
                own.shared_secret(provider, &peer.public)
            },
            (KexKeystore::Ecdh(own), KexKeystore::Ecdh(peer)) => {
                own.shared_secret(provider, &peer.encoded_point())
            },
            _ => Err(Error::KeyExchangeMismatch {
                expected: self.kind(),
                actual: peer.kind(),
            }),
        }
    }
}

/// Split `0x04 || x || y` into its coordinates.
///
/// # Errors
///
/// `InvalidMessage` for compressed, hybrid or truncated encodings.
pub fn decode_uncompressed_point(point: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    match point.split_first() {
        Some((&UNCOMPRESSED_POINT, coordinates))
            if !coordinates.is_empty() && coordinates.len() % 2 == 0 =>
        {
            let (x, y) = coordinates.split_at(coordinates.len() / 2);
            Ok((x.to_vec(), y.to_vec()))
        },
        Some((&UNCOMPRESSED_POINT, coordinates)) => Err(Error::InvalidMessage(format!(
            "uncompressed point has odd coordinate length {}",
            coordinates.len()
        ))),
        Some((&marker, _)) => Err(Error::InvalidMessage(format!(
            "only uncompressed points are supported, got form 0x{:02x}",
            marker
        ))),
        None => Err(Error::InvalidMessage("empty EC point".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tlsscope_crypto_rustcrypto::RustCryptoProvider;

    #[test]
    fn test_key_slot_transitions() {
        let mut slot = KeySlot::Unset;
        assert!(!slot.is_set());
        assert!(slot.derive(1));
        assert_eq!(slot.get(), Some(&1));
        assert!(slot.derive(2));
        assert_eq!(slot.get(), Some(&2));
        assert!(slot.provide(3).is_err());

        let mut slot = KeySlot::Unset;
        slot.provide(7).unwrap();
        assert!(!slot.derive(8));
        assert_eq!(slot.get(), Some(&7));
        assert!(slot.is_provided());
        slot.clear_derived();
        assert!(slot.is_set());
    }

    #[test]
    fn test_symmetric_debug_redacts() {
        let store = SymmetricKeystore::new(vec![0xaa; 16], vec![0xbb; 20], vec![0xcc; 16]);
        let debug = format!("{:?}", store);
        assert!(!debug.contains("aa"));
        assert!(!debug.contains("170"));
        assert!(debug.contains("key_len: 16"));
    }

    #[test]
    fn test_decode_point() {
        let (x, y) = decode_uncompressed_point(&[0x04, 1, 2, 3, 4]).unwrap();
        assert_eq!(x, vec![1, 2]);
        assert_eq!(y, vec![3, 4]);

        assert!(decode_uncompressed_point(&[0x02, 1, 2]).is_err());
        assert!(decode_uncompressed_point(&[0x04, 1, 2, 3]).is_err());
        assert!(decode_uncompressed_point(&[0x04]).is_err());
        assert!(decode_uncompressed_point(&[]).is_err());
    }

    #[test]
    fn test_unknown_curve_keeps_coordinates() {
        let point = [0x04, 9, 9, 9, 8, 8, 8];
        let store = EcdhKeystore::from_point(0x001d, &point).unwrap();
        assert!(store.unknown_curve());
        assert_eq!(store.encoded_point(), point.to_vec());

        let provider = RustCryptoProvider::new();
        assert_eq!(
            EcdhKeystore::key_pair_for(&provider, &store, None).unwrap_err(),
            Error::UnknownCurve(0x001d)
        );
    }

    #[test]
    fn test_ecdh_both_sides_agree() {
        let provider = RustCryptoProvider::new();
        let server_kex = provider
            .key_exchange(KeyExchangeAlgorithm::Secp256r1)
            .unwrap();
        let (server_private, server_public) = server_kex.generate_keypair().unwrap();
        let mut server = EcdhKeystore::from_point(0x0017, server_public.as_bytes()).unwrap();
        assert_eq!(server.curve, Some(KeyExchangeAlgorithm::Secp256r1));
        server.private = Some(server_private);

        let client = EcdhKeystore::key_pair_for(&provider, &server, None).unwrap();
        let server = KexKeystore::Ecdh(server);
        let client = KexKeystore::Ecdh(client);
        let a = client.shared_secret(&provider, &server).unwrap();
        let b = server.shared_secret(&provider, &client).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_dh_small_group() {
        let provider = RustCryptoProvider::new();
        let server = DhKeystore::key_pair_for(
            &provider,
            &DhKeystore::new(vec![23], vec![5], Vec::new()),
            Some(&[6]),
        )
        .unwrap();
        assert_eq!(server.public, vec![8]);
        let client = DhKeystore::key_pair_for(&provider, &server, Some(&[15])).unwrap();
        assert_eq!(client.public, vec![19]);
        assert_eq!(*client.shared_secret(&provider, &server.public).unwrap(), vec![2]);
        assert_eq!(*server.shared_secret(&provider, &client.public).unwrap(), vec![2]);
    }

    #[test]
    fn test_kind_mismatch() {
        let provider = RustCryptoProvider::new();
        let dh = KexKeystore::Dh(DhKeystore::new(vec![23], vec![5], vec![8]));
        let ecdh = KexKeystore::Ecdh(EcdhKeystore::from_point(0x001d, &[4, 1, 1]).unwrap());
        assert_eq!(
            dh.shared_secret(&provider, &ecdh).unwrap_err(),
            Error::KeyExchangeMismatch {
                expected: "DH",
                actual: "ECDH"
            }
        );
    }
}
