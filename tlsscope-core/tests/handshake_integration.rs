//! Handshake Integration Tests
//!
//! Drives a client-side and a server-side session through the same
//! TLS 1.2 handshake and checks that both derive identical key material.
//!
//! Tests verify:
//! - RSA key transport with the server private key loaded from PEM
//! - DHE and ECDHE agreement from either side's private value
//! - Abbreviated handshake (session resumption)
//! - Finished verify data and CertificateVerify signatures

use tlsscope_core::keystore::{DhKeystore, EcdhKeystore, KexKeystore};
use tlsscope_core::messages::{
    frame, CertificateList, ClientHello, ClientKeyExchange, Finished, Handshake,
    HandshakeMessage, ServerHello, ServerKeyExchange,
};
use tlsscope_core::tlsscope_crypto::{
    CryptoProvider, HashAlgorithm, KeyExchangeAlgorithm, SignatureDigest,
};
use tlsscope_core::{
    ContentType, ErrorKind, HandshakeState, HandshakeType, Role, RsaDecryptionFailure,
    SessionConfig, SessionContext,
};
use tlsscope_crypto_rustcrypto::RustCryptoProvider;

const SERVER_CERT: &[u8] = include_bytes!("data/server.der");
const SERVER_KEY: &[u8] = include_bytes!("data/server.key.pem");
const CLIENT_KEY: &[u8] = include_bytes!("data/client.key.pem");

/// RFC 2409 second Oakley group (1024-bit MODP), generator 2.
const MODP_1024: &str = "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
                         020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
                         4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
                         EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381FFFFFFFFFFFFFFFF";

fn encoded(handshake_type: HandshakeType, message: HandshakeMessage) -> Handshake {
    // The body content is irrelevant to key derivation; only the transcript
    // needs to be identical on both sides.
    let body = format!("{:?}", message).into_bytes();
    Handshake::new(message, frame(handshake_type, &body))
}

fn client_hello(session_id: &[u8]) -> Handshake {
    encoded(
        HandshakeType::ClientHello,
        HandshakeMessage::ClientHello(ClientHello {
            version: 0x0303,
            gmt_unix_time: 0x5f00_0000,
            random_bytes: [0xc1; 28],
            session_id: session_id.to_vec(),
        }),
    )
}

fn server_hello(cipher_suite: u16, session_id: &[u8]) -> Handshake {
    encoded(
        HandshakeType::ServerHello,
        HandshakeMessage::ServerHello(ServerHello {
            version: 0x0303,
            gmt_unix_time: 0x5f00_0001,
            random_bytes: [0x5e; 28],
            session_id: session_id.to_vec(),
            cipher_suite,
            compression_method: 0,
        }),
    )
}

fn certificate() -> Handshake {
    encoded(
        HandshakeType::Certificate,
        HandshakeMessage::Certificate(CertificateList {
            certificates: vec![SERVER_CERT.to_vec()],
        }),
    )
}

fn server_hello_done() -> Handshake {
    Handshake::new(
        HandshakeMessage::ServerHelloDone,
        frame(HandshakeType::ServerHelloDone, &[]),
    )
}

fn client_key_exchange(kex: ClientKeyExchange) -> Handshake {
    let body = kex.to_bytes();
    Handshake::new(
        HandshakeMessage::ClientKeyExchange(kex),
        frame(HandshakeType::ClientKeyExchange, &body),
    )
}

fn finished(verify_data: Vec<u8>) -> Handshake {
    Handshake::unencoded(HandshakeMessage::Finished(Finished { verify_data }))
}

fn feed(provider: &dyn CryptoProvider, sessions: [&mut SessionContext; 2], handshake: &Handshake) {
    for session in sessions {
        session.process(provider, handshake).expect("handshake message rejected");
    }
}

fn server_session() -> SessionContext {
    SessionContext::new(SessionConfig::builder().with_role(Role::Server).build().unwrap())
}

/// Application data flows both ways between the two sessions.
fn assert_records_interoperate(
    provider: &dyn CryptoProvider,
    client: &mut SessionContext,
    server: &mut SessionContext,
) {
    let payloads: [&[u8]; 3] = [b"GET / HTTP/1.1\r\n\r\n", &[0u8; 300], b""];
    for (i, payload) in payloads.into_iter().enumerate() {
        let record = client
            .client_mut()
            .encrypt_data(provider, ContentType::ApplicationData, payload)
            .unwrap();
        let plaintext = server
            .client_mut()
            .decrypt(provider, ContentType::ApplicationData, &record)
            .unwrap();
        assert_eq!(plaintext, payload, "client record {}", i);

        let record = server
            .server_mut()
            .encrypt_data(provider, ContentType::ApplicationData, payload)
            .unwrap();
        let plaintext = client
            .server_mut()
            .decrypt(provider, ContentType::ApplicationData, &record)
            .unwrap();
        assert_eq!(plaintext, payload, "server record {}", i);
    }
    assert_eq!(client.client().sequence(), 3);
    assert_eq!(server.client().sequence(), 3);
}

/// Test full RSA handshake with AES-128-CBC-SHA
#[test]
fn test_rsa_handshake_both_sides_agree() {
    let provider = RustCryptoProvider::new();
    let mut client = SessionContext::default();
    let mut server = server_session();
    server
        .server_mut()
        .load_private_key(&provider, SERVER_KEY, true)
        .expect("Failed to load server key");

    println!("\n=== TLS 1.2 RSA handshake ===\n");

    for message in [client_hello(&[]), server_hello(0x002f, &[]), certificate(), server_hello_done()] {
        feed(&provider, [&mut client, &mut server], &message);
    }
    assert_eq!(client.state(), HandshakeState::CertificateSeen);
    assert!(client.server().asymmetric_keystore().is_some());
    assert_eq!(
        server.server().asymmetric_keystore().unwrap().certificate(),
        Some(SERVER_CERT)
    );
    println!("  ✓ Hellos and certificate processed");

    let kex = client.client_kex_data(&provider, None).unwrap();
    let ClientKeyExchange::Rsa { encrypted_premaster } = &kex else {
        panic!("expected RSA key exchange, got {:?}", kex);
    };
    assert_eq!(encrypted_premaster.len(), 256);
    feed(&provider, [&mut client, &mut server], &client_key_exchange(kex.clone()));
    println!("  ✓ ClientKeyExchange processed");

    assert_eq!(client.premaster_secret(), server.premaster_secret());
    assert_eq!(&client.premaster_secret().unwrap()[..2], &[0x03, 0x03]);
    assert_eq!(client.master_secret().unwrap().len(), 48);
    assert_eq!(client.master_secret(), server.master_secret());
    assert_eq!(
        client.client().symmetric_keystore(),
        server.client().symmetric_keystore()
    );
    assert_eq!(
        client.server().symmetric_keystore(),
        server.server().symmetric_keystore()
    );
    assert!(client.is_crypto_usable());
    assert!(server.is_crypto_usable());
    println!("  ✓ Key material identical on both sides");

    let client_finished = client.verify_data(&provider).unwrap();
    assert_eq!(client_finished.len(), 12);
    feed(&provider, [&mut client, &mut server], &finished(client_finished));
    let server_finished = server.verify_data(&provider).unwrap();
    feed(&provider, [&mut client, &mut server], &finished(server_finished));
    assert_eq!(client.state(), HandshakeState::Established);
    assert_eq!(server.state(), HandshakeState::Established);

    assert_records_interoperate(&provider, &mut client, &mut server);
    println!("  ✓ Application data round trips\n");
}

/// A caller-supplied premaster secret is the one the server recovers.
#[test]
fn test_rsa_caller_premaster_secret() {
    let provider = RustCryptoProvider::new();
    let mut client = SessionContext::default();
    let mut server = server_session();
    server.server_mut().load_private_key(&provider, SERVER_KEY, true).unwrap();

    for message in [client_hello(&[]), server_hello(0x0035, &[]), certificate()] {
        feed(&provider, [&mut client, &mut server], &message);
    }
    let mut premaster = vec![0x03, 0x03];
    premaster.extend_from_slice(&[0x42; 46]);
    let kex = client.client_kex_data(&provider, Some(&premaster)).unwrap();
    feed(&provider, [&mut client, &mut server], &client_key_exchange(kex));

    assert_eq!(server.premaster_secret(), Some(&premaster[..]));
    assert_eq!(client.master_secret(), server.master_secret());
}

#[test]
fn test_rsa_undecryptable_premaster() {
    let provider = RustCryptoProvider::new();

    // Default policy substitutes a random premaster secret.
    let mut server = server_session();
    server.server_mut().load_private_key(&provider, SERVER_KEY, true).unwrap();
    for message in [client_hello(&[]), server_hello(0x002f, &[]), certificate()] {
        server.process(&provider, &message).unwrap();
    }
    let garbage = client_key_exchange(ClientKeyExchange::Rsa {
        encrypted_premaster: vec![0x01; 256],
    });
    server.process(&provider, &garbage).unwrap();
    let premaster = server.premaster_secret().unwrap();
    assert_eq!(premaster.len(), 48);
    assert_eq!(&premaster[..2], &[0x03, 0x03]);
    assert!(server.is_crypto_usable());

    // Reject policy fails the message and marks the session.
    let config = SessionConfig::builder()
        .with_role(Role::Server)
        .with_rsa_decryption_failure(RsaDecryptionFailure::Reject)
        .build()
        .unwrap();
    let mut server = SessionContext::new(config);
    server.server_mut().load_private_key(&provider, SERVER_KEY, true).unwrap();
    for message in [client_hello(&[]), server_hello(0x002f, &[]), certificate()] {
        server.process(&provider, &message).unwrap();
    }
    let err = server.process(&provider, &garbage).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(server.crypto_error().is_some());
    assert!(!server.is_crypto_usable());
}

/// Test DHE handshake where only the server's exponent is known to the
/// server-side session and only the client's to the client-side one.
#[test]
fn test_dhe_handshake_both_sides_agree() {
    let provider = RustCryptoProvider::new();
    let prime = hex::decode(MODP_1024).unwrap();
    let group = DhKeystore::new(prime.clone(), vec![2], Vec::new());
    let server_keys = DhKeystore::key_pair_for(&provider, &group, None).unwrap();

    let mut client = SessionContext::default();
    let mut server = server_session();
    server
        .server_mut()
        .set_kex_keystore(KexKeystore::Dh(server_keys.clone()))
        .unwrap();

    let server_kex = encoded(
        HandshakeType::ServerKeyExchange,
        HandshakeMessage::ServerKeyExchange(ServerKeyExchange::Dh {
            p: prime,
            g: vec![2],
            public: server_keys.public.clone(),
        }),
    );
    for message in [client_hello(&[]), server_hello(0x0033, &[]), certificate(), server_kex] {
        feed(&provider, [&mut client, &mut server], &message);
    }
    assert_eq!(client.state(), HandshakeState::ServerKeyExchangeSeen);
    assert!(!client.server().kex_keystore().unwrap().has_private());
    assert!(server.server().kex_keystore().unwrap().has_private());

    let kex = client.client_kex_data(&provider, None).unwrap();
    assert!(matches!(kex, ClientKeyExchange::Dh { .. }));
    feed(&provider, [&mut client, &mut server], &client_key_exchange(kex));

    assert!(client.premaster_secret().is_some());
    assert_eq!(client.premaster_secret(), server.premaster_secret());
    assert_ne!(client.premaster_secret().unwrap()[0], 0);
    assert_eq!(client.master_secret(), server.master_secret());
    assert_records_interoperate(&provider, &mut client, &mut server);
}

/// Test ECDHE handshake with AES-128-GCM.
#[test]
fn test_ecdhe_handshake_both_sides_agree() {
    let provider = RustCryptoProvider::new();
    let (private, public) = provider
        .key_exchange(KeyExchangeAlgorithm::Secp256r1)
        .unwrap()
        .generate_keypair()
        .unwrap();
    let mut server_keys = EcdhKeystore::from_point(0x0017, public.as_bytes()).unwrap();
    server_keys.private = Some(private);

    let mut client = SessionContext::default();
    let mut server = server_session();
    server
        .server_mut()
        .set_kex_keystore(KexKeystore::Ecdh(server_keys))
        .unwrap();

    let server_kex = encoded(
        HandshakeType::ServerKeyExchange,
        HandshakeMessage::ServerKeyExchange(ServerKeyExchange::Ecdh {
            curve_id: 0x0017,
            point: public.as_bytes().to_vec(),
        }),
    );
    for message in [client_hello(&[]), server_hello(0xc02f, &[]), certificate(), server_kex] {
        feed(&provider, [&mut client, &mut server], &message);
    }

    let kex = client.client_kex_data(&provider, None).unwrap();
    let ClientKeyExchange::Ecdh { point } = &kex else {
        panic!("expected ECDH key exchange, got {:?}", kex);
    };
    assert_eq!(point.len(), 65);
    assert_eq!(point[0], 0x04);
    feed(&provider, [&mut client, &mut server], &client_key_exchange(kex.clone()));

    assert_eq!(client.premaster_secret().unwrap().len(), 32);
    assert_eq!(client.premaster_secret(), server.premaster_secret());
    assert_eq!(client.master_secret(), server.master_secret());
    assert_records_interoperate(&provider, &mut client, &mut server);
}

/// A fixed client scalar makes the client key exchange reproducible.
#[test]
fn test_ecdhe_fixed_client_private() {
    let provider = RustCryptoProvider::new();
    let (_, server_public) = provider
        .key_exchange(KeyExchangeAlgorithm::Secp384r1)
        .unwrap()
        .generate_keypair()
        .unwrap();
    let server_kex = encoded(
        HandshakeType::ServerKeyExchange,
        HandshakeMessage::ServerKeyExchange(ServerKeyExchange::Ecdh {
            curve_id: 0x0018,
            point: server_public.as_bytes().to_vec(),
        }),
    );
    let scalar = [0x17u8; 48];

    let mut points = Vec::new();
    let mut premasters = Vec::new();
    for _ in 0..2 {
        let mut client = SessionContext::default();
        for message in [
            client_hello(&[]),
            server_hello(0xc030, &[]),
            certificate(),
            server_kex.clone(),
        ] {
            client.process(&provider, &message).unwrap();
        }
        points.push(client.client_ecdh_public_key(&provider, Some(&scalar)).unwrap());
        premasters.push(client.premaster_secret().unwrap().to_vec());
    }
    assert_eq!(points[0], points[1]);
    assert_eq!(premasters[0], premasters[1]);
    assert_eq!(points[0].len(), 97);
}

#[test]
fn test_session_resumption() {
    let provider = RustCryptoProvider::new();
    let session_id = [0x99; 32];

    // Full handshake first
    let mut client = SessionContext::default();
    let mut server = server_session();
    server.server_mut().load_private_key(&provider, SERVER_KEY, true).unwrap();
    for message in [client_hello(&session_id), server_hello(0x009c, &session_id), certificate()] {
        feed(&provider, [&mut client, &mut server], &message);
    }
    let kex = client.client_kex_data(&provider, None).unwrap();
    feed(&provider, [&mut client, &mut server], &client_key_exchange(kex));
    let master_secret = client.master_secret().unwrap().to_vec();
    assert!(!client.negotiated().resumption);

    // Abbreviated handshake with the cached master secret
    let mut resumed_client = SessionContext::default();
    let mut resumed_server = server_session();
    resumed_client.resume_session(&master_secret).unwrap();
    resumed_server.resume_session(&master_secret).unwrap();
    for message in [client_hello(&session_id), server_hello(0x009c, &session_id)] {
        feed(&provider, [&mut resumed_client, &mut resumed_server], &message);
    }
    assert!(resumed_client.negotiated().resumption);
    assert_eq!(resumed_client.state(), HandshakeState::Established);
    assert_eq!(resumed_client.master_secret(), Some(&master_secret[..]));
    assert_eq!(
        resumed_client.client().symmetric_keystore(),
        client.client().symmetric_keystore()
    );
    assert_records_interoperate(&provider, &mut resumed_client, &mut resumed_server);
}

#[test]
fn test_verify_data_labels_and_length() {
    let provider = RustCryptoProvider::new();
    let mut client = SessionContext::default();
    let mut server = SessionContext::new(
        SessionConfig::builder()
            .with_role(Role::Server)
            .with_verify_data_length(32)
            .build()
            .unwrap(),
    );
    server.server_mut().load_private_key(&provider, SERVER_KEY, true).unwrap();
    for message in [client_hello(&[]), server_hello(0x003c, &[]), certificate()] {
        feed(&provider, [&mut client, &mut server], &message);
    }
    let kex = client.client_kex_data(&provider, None).unwrap();
    feed(&provider, [&mut client, &mut server], &client_key_exchange(kex));

    let client_verify = client.verify_data(&provider).unwrap();
    let server_verify = server.verify_data(&provider).unwrap();
    assert_eq!(client_verify.len(), 12);
    assert_eq!(server_verify.len(), 32);
    assert_ne!(&client_verify[..], &server_verify[..12]);

    // Same label, same transcript
    server.set_role(Role::Client);
    let messages = client.transcript().concatenated();
    assert_eq!(
        &server.verify_data_over(&provider, &messages).unwrap()[..12],
        &client_verify[..]
    );
}

#[test]
fn test_client_certificate_verify_signature() {
    let provider = RustCryptoProvider::new();
    let client_key = provider.rsa_private_key(CLIENT_KEY, true).unwrap();

    let mut client = SessionContext::default();
    assert_eq!(
        client
            .client_signed_handshake_hash(&provider, HashAlgorithm::Sha256)
            .unwrap_err()
            .kind(),
        ErrorKind::State
    );
    client.client_mut().load_private_key(&provider, CLIENT_KEY, true).unwrap();
    for message in [client_hello(&[]), server_hello(0x002f, &[]), certificate()] {
        client.process(&provider, &message).unwrap();
    }

    let signature = client
        .client_signed_handshake_hash(&provider, HashAlgorithm::Sha256)
        .unwrap();
    let digest = client.handshake_hash(&provider, HashAlgorithm::Sha256).unwrap();
    client_key
        .verify(SignatureDigest::Prefixed(HashAlgorithm::Sha256), &digest, &signature)
        .expect("signature over the handshake hash must verify");
}

#[test]
fn test_client_certificate_verify_signature_tls10() {
    let provider = RustCryptoProvider::new();
    let client_key = provider.rsa_private_key(CLIENT_KEY, true).unwrap();

    let mut client = SessionContext::default();
    client.client_mut().load_private_key(&provider, CLIENT_KEY, true).unwrap();
    let mut hello = server_hello(0x002f, &[]);
    if let HandshakeMessage::ServerHello(inner) = &mut hello.message {
        inner.version = 0x0301;
    }
    for message in [client_hello(&[]), hello] {
        client.process(&provider, &message).unwrap();
    }

    let signature = client
        .client_signed_handshake_hash(&provider, HashAlgorithm::Sha256)
        .unwrap();
    let mut digest = client.handshake_hash(&provider, HashAlgorithm::Md5).unwrap();
    digest.extend(client.handshake_hash(&provider, HashAlgorithm::Sha1).unwrap());
    assert_eq!(digest.len(), 36);
    client_key
        .verify(SignatureDigest::Unprefixed, &digest, &signature)
        .unwrap();
}
