//! State of one direction (client or server) of a session.

use std::fmt;

use tlsscope_crypto::CryptoProvider;

use crate::container::CryptoContainer;
use crate::crypto_context::{CryptoContext, RecordCounters};
use crate::error::{Error, Result};
use crate::keystore::{AsymmetricKeystore, KexKeystore, KeySlot, SymmetricKeystore};
use crate::messages::HandshakeMessage;
use crate::prf::RANDOM_LENGTH;
use crate::protocol::ContentType;

/// A side of the connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// The client
    #[default]
    Client,
    /// The server
    Server,
}

impl Role {
    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }
}

/// Randoms, key stores and the record engine of one side.
///
/// Key stores may be pre-populated by the caller (e.g. a server private key
/// loaded from disk). The session only fills stores the caller left empty.
#[derive(Debug)]
pub struct DirectionContext {
    role: Role,
    pub(crate) random: Option<[u8; RANDOM_LENGTH]>,
    pub(crate) session_id: Vec<u8>,
    pub(crate) hello: Option<HandshakeMessage>,
    pub(crate) asymmetric_keystore: KeySlot<AsymmetricKeystore>,
    pub(crate) kex_keystore: KeySlot<KexKeystore>,
    pub(crate) symmetric_keystore: KeySlot<SymmetricKeystore>,
    pub(crate) crypto: Option<CryptoContext>,
}

impl DirectionContext {
    /// Empty context for `role`.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            random: None,
            session_id: Vec::new(),
            hello: None,
            asymmetric_keystore: KeySlot::Unset,
            kex_keystore: KeySlot::Unset,
            symmetric_keystore: KeySlot::Unset,
            crypto: None,
        }
    }

    /// Side this context belongs to.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Hello random, once seen.
    pub fn random(&self) -> Option<&[u8; RANDOM_LENGTH]> {
        self.random.as_ref()
    }

    /// Hello session id.
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    /// The hello message this side sent.
    pub fn hello(&self) -> Option<&HandshakeMessage> {
        self.hello.as_ref()
    }

    /// RSA key store.
    pub fn asymmetric_keystore(&self) -> Option<&AsymmetricKeystore> {
        self.asymmetric_keystore.get()
    }

    /// Supply an RSA key for this side.
    ///
    /// A certificate seen later on the wire is attached to this store
    /// instead of replacing it.
    pub fn set_asymmetric_keystore(&mut self, keystore: AsymmetricKeystore) -> Result<()> {
        self.asymmetric_keystore.provide(keystore)
    }

    /// Load an RSA private key from PEM or DER.
    ///
    /// With `private_only`, PEM input is restricted to `*PRIVATE KEY*`
    /// blocks.
    ///
    /// # Errors
    ///
    /// `Crypto(KeyNotFound)` when the input holds no private key.
    pub fn load_private_key(
        &mut self,
        provider: &dyn CryptoProvider,
        data: &[u8],
        private_only: bool,
    ) -> Result<()> {
        let key = provider.rsa_private_key(data, private_only)?;
        tracing::debug!(
            role = self.role.name(),
            modulus_bits = key.modulus_size() * 8,
            "Loaded RSA private key"
        );
        self.set_asymmetric_keystore(AsymmetricKeystore::new(key))
    }

    /// Ephemeral key-exchange store.
    pub fn kex_keystore(&self) -> Option<&KexKeystore> {
        self.kex_keystore.get()
    }

    /// Supply ephemeral key-exchange values (typically with the private half).
    pub fn set_kex_keystore(&mut self, keystore: KexKeystore) -> Result<()> {
        self.kex_keystore.provide(keystore)
    }

    /// Record keys.
    pub fn symmetric_keystore(&self) -> Option<&SymmetricKeystore> {
        self.symmetric_keystore.get()
    }

    /// Supply record keys; derivation will not overwrite them.
    pub fn set_symmetric_keystore(&mut self, keystore: SymmetricKeystore) -> Result<()> {
        self.symmetric_keystore.provide(keystore)
    }

    /// Record engine, once keys are derived.
    pub fn crypto_context(&self) -> Option<&CryptoContext> {
        self.crypto.as_ref()
    }

    /// Record counters; zero before keys are derived.
    pub fn counters(&self) -> RecordCounters {
        self.crypto
            .as_ref()
            .map(CryptoContext::counters)
            .unwrap_or_default()
    }

    /// Sequence number of the next record.
    pub fn sequence(&self) -> u64 {
        self.counters().sequence()
    }

    fn engine(&self) -> Result<&CryptoContext> {
        self.crypto.as_ref().ok_or_else(|| no_keys(self.role))
    }

    fn engine_mut(&mut self) -> Result<&mut CryptoContext> {
        let role = self.role;
        self.crypto.as_mut().ok_or_else(|| no_keys(role))
    }

    /// Frame `data` for the next record of this side.
    pub fn container(
        &self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        data: &[u8],
    ) -> Result<CryptoContainer> {
        self.engine()?.container(provider, content_type, data)
    }

    /// Encrypt a framed record.
    pub fn encrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        container: &CryptoContainer,
    ) -> Result<Vec<u8>> {
        self.engine_mut()?.encrypt(provider, container)
    }

    /// Frame and encrypt `data` as the next record of this side.
    ///
    /// # Errors
    ///
    /// `InvalidState` before keys are derived.
    pub fn encrypt_data(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        self.engine_mut()?.encrypt_data(provider, content_type, data)
    }

    /// Decrypt a record sent by this side.
    ///
    /// # Errors
    ///
    /// `InvalidState` before keys are derived; integrity errors as
    /// [`CryptoContext::decrypt`].
    pub fn decrypt(
        &mut self,
        provider: &dyn CryptoProvider,
        content_type: ContentType,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        self.engine_mut()?.decrypt(provider, content_type, ciphertext)
    }
}

fn no_keys(role: Role) -> Error {
    Error::InvalidState(format!("{} record keys have not been derived", role.name()))
}

impl fmt::Display for DirectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} context:", self.role.name())?;
        match &self.random {
            Some(random) => writeln!(f, "  random: {}", hex::encode(random))?,
            None => writeln!(f, "  random: -")?,
        }
        writeln!(f, "  session_id: {}", hex::encode(&self.session_id))?;
        writeln!(
            f,
            "  asymmetric key: {}",
            match self.asymmetric_keystore() {
                Some(store) if store.has_private_key() => "private",
                Some(_) => "public",
                None => "-",
            }
        )?;
        writeln!(
            f,
            "  key exchange: {}",
            self.kex_keystore().map_or("-", KexKeystore::kind)
        )?;
        write!(
            f,
            "  record engine: {} (sequence {})",
            self.crypto.as_ref().map_or("-", |ctx| ctx.mode().name()),
            self.sequence()
        )
    }
}
