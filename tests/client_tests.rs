//! End-to-end client tests against a mock engine.
//!
//! The mock plays the real protocol: it owns an x25519 keypair, answers the
//! key exchange, and serves properly encrypted bodies under the shared key
//! it derives from the client's exchange public key.

use std::sync::{Arc, Mutex};

use mockito::Matcher;
use url::Url;
use x25519_dalek::{PublicKey, StaticSecret};

use keelback_client::api::{ENCRYPTED_CONTENT_TYPE, PAYLOAD_HASH_HEADER};
use keelback_client::crypto::{self, CryptoError, payload};
use keelback_client::{ApiClient, ClientConfig, Error, MessageSink, Outcome};
use keelback_client::api::SourceSelection;

/// The engine's side of the key exchange.
struct Engine {
    secret: StaticSecret,
    public_b64: String,
}

impl Engine {
    fn new() -> Self {
        let secret = StaticSecret::random_from_rng(rand_core::OsRng);
        let public = PublicKey::from(&secret);
        let public_b64 = crypto::encode_b64(public.as_bytes());
        Engine { secret, public_b64 }
    }

    fn auth_body(&self) -> String {
        format!(r#"{{"publicKey":"{}"}}"#, self.public_b64)
    }

    fn auth_body_with_salt(&self, key_salt: &str) -> String {
        format!(
            r#"{{"publicKey":"{}","keySalt":"{}"}}"#,
            self.public_b64, key_salt
        )
    }

    /// Derive the same shared key the client will arrive at.
    fn shared_key(&self, client: &ApiClient) -> [u8; 32] {
        let bytes = crypto::decode_b64url_nopad(client.exchange_public_key()).unwrap();
        let client_public: [u8; 32] = bytes.try_into().unwrap();
        let client_public = PublicKey::from(client_public);
        *self.secret.diffie_hellman(&client_public).as_bytes()
    }
}

/// Collects user-visible messages for assertions.
#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl MessageSink for RecordingSink {
    fn show_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn client_for(server: &mockito::ServerGuard) -> (ApiClient, Arc<RecordingSink>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let sink = Arc::new(RecordingSink::default());
    let config = ClientConfig::new(Url::parse(&format!("{}/api/", server.url())).unwrap());
    let client = ApiClient::with_message_sink(config, sink.clone()).unwrap();
    (client, sink)
}

#[tokio::test]
async fn exchange_without_key_salt_needs_no_password() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    let auth = server
        .mock("POST", "/api/auth")
        .with_header("content-type", "application/json")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    client.connect().await.unwrap();

    assert_eq!(
        client.need_private_key_password(true).await.unwrap(),
        Some(false)
    );
    assert!(sink.messages.lock().unwrap().is_empty());
    auth.assert_async().await;
}

#[tokio::test]
async fn encrypted_response_roundtrip() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, _sink) = client_for(&server);
    client.connect().await.unwrap();

    let key = engine.shared_key(&client);
    let encrypted = payload::encrypt(br#"{"sets":[]}"#, &key).unwrap();
    let configuration = server
        .mock("GET", "/api/configuration")
        .match_header("x-keyexchange", Matcher::Any)
        .with_header("content-type", ENCRYPTED_CONTENT_TYPE)
        .with_header(PAYLOAD_HASH_HEADER, &encrypted.hash)
        .with_body(encrypted.data)
        .create_async()
        .await;

    match client.configuration().await {
        Outcome::Ok(configuration) => {
            assert!(configuration.sets.is_empty());
            assert!(configuration.destinations.is_empty());
        }
        other => panic!("expected configuration, got {other:?}"),
    }
    configuration.assert_async().await;
}

#[tokio::test]
async fn tampered_response_hash_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    client.connect().await.unwrap();

    let key = engine.shared_key(&client);
    let encrypted = payload::encrypt(br#"{"sets":[]}"#, &key).unwrap();
    server
        .mock("GET", "/api/configuration")
        .with_header("content-type", ENCRYPTED_CONTENT_TYPE)
        .with_header(PAYLOAD_HASH_HEADER, &payload::payload_hash(b"tampered"))
        .with_body(encrypted.data)
        .create_async()
        .await;

    let outcome: Outcome<keelback_client::api::Configuration> = client.configuration().await;
    assert!(matches!(
        outcome,
        Outcome::Failed(Error::Crypto(CryptoError::PayloadHashMismatch))
    ));

    // The failure is reported to the user like any other generic error
    assert!(!sink.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unauthorized_clears_key_and_reruns_exchange() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    let auth = server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .expect(2)
        .create_async()
        .await;
    server
        .mock("GET", "/api/configuration")
        .with_status(401)
        .create_async()
        .await;

    let (client, _sink) = client_for(&server);
    client.connect().await.unwrap();

    let outcome: Outcome<keelback_client::api::Configuration> = client.configuration().await;
    assert!(matches!(outcome, Outcome::Unauthorized));
    auth.assert_async().await;
}

#[tokio::test]
async fn concurrent_calls_share_one_exchange() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    let auth = server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/configuration")
        .with_status(404)
        .expect(2)
        .create_async()
        .await;

    let (client, _sink) = client_for(&server);

    let (a, b) = tokio::join!(client.configuration(), client.configuration());
    assert!(matches!(a, Outcome::NotFound));
    assert!(matches!(b, Outcome::NotFound));
    auth.assert_async().await;
}

#[tokio::test]
async fn poll_does_not_wait_for_handshake() {
    let server = mockito::Server::new_async().await;
    let (client, sink) = client_for(&server);

    // No exchange has run; the poll must bail out instead of blocking
    let outcome = client.activity().await;
    assert!(matches!(outcome, Outcome::AuthPending));
    assert!(sink.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn password_flow_and_invalid_password_report() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    let key_salt = crypto::encode_base32(b"engine-key-salt!");
    let auth = server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body_with_salt(&key_salt))
        .expect(2)
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    client.connect().await.unwrap();

    assert_eq!(
        client.need_private_key_password(true).await.unwrap(),
        Some(true)
    );

    client
        .submit_private_key_password("correct-password")
        .await
        .unwrap();
    assert_eq!(
        client.need_private_key_password(true).await.unwrap(),
        Some(false)
    );

    // The engine rejects the derived key: 401 before any successful call
    server
        .mock("GET", "/api/configuration")
        .with_status(401)
        .create_async()
        .await;
    let outcome: Outcome<keelback_client::api::Configuration> = client.configuration().await;
    assert!(matches!(outcome, Outcome::Unauthorized));
    assert!(
        sink.messages
            .lock()
            .unwrap()
            .iter()
            .any(|message| message == "Invalid password")
    );

    // The re-exchange restored the salt and dropped the derived key
    assert_eq!(
        client.need_private_key_password(true).await.unwrap(),
        Some(true)
    );
    auth.assert_async().await;
}

#[tokio::test]
async fn auth_not_found_is_silent() {
    let mut server = mockito::Server::new_async().await;
    let auth = server
        .mock("POST", "/api/auth")
        .with_status(404)
        .expect(2)
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    let result = client.connect().await;

    assert!(matches!(result, Err(Error::KeyExchange(_))));
    assert!(sink.messages.lock().unwrap().is_empty());
    auth.assert_async().await;
}

#[tokio::test]
async fn auth_failure_reports_engine_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/auth")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"engine unavailable"}"#)
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    let result = client.connect().await;

    assert!(result.is_err());
    assert!(
        sink.messages
            .lock()
            .unwrap()
            .iter()
            .any(|message| message == "engine unavailable")
    );
}

#[tokio::test]
async fn encrypted_request_body_and_plain_message_reply() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, _sink) = client_for(&server);
    client.connect().await.unwrap();

    let update = server
        .mock("POST", "/api/configuration")
        .match_header("content-type", ENCRYPTED_CONTENT_TYPE)
        .match_header(PAYLOAD_HASH_HEADER, Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"saved"}"#)
        .create_async()
        .await;

    let configuration = keelback_client::api::Configuration::default();
    match client.update_configuration(&configuration).await {
        Outcome::Ok(info) => assert_eq!(info.message, "saved"),
        other => panic!("expected info message, got {other:?}"),
    }
    update.assert_async().await;
}

#[tokio::test]
async fn plain_response_with_unexpected_shape_is_a_protocol_error() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    client.connect().await.unwrap();

    server
        .mock("GET", "/api/configuration")
        .with_header("content-type", "application/json")
        .with_body(r#"{"sets":[]}"#)
        .create_async()
        .await;

    let outcome: Outcome<keelback_client::api::Configuration> = client.configuration().await;
    match outcome {
        Outcome::Failed(Error::Protocol(message)) => {
            assert_eq!(message, "Expected encrypted payload");
        }
        other => panic!("expected protocol error, got {other:?}"),
    }
    assert!(
        sink.messages
            .lock()
            .unwrap()
            .iter()
            .any(|message| message == "Expected encrypted payload")
    );
}

#[tokio::test]
async fn source_selection_maps_406_to_needs_destination() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    client.connect().await.unwrap();

    server
        .mock("POST", "/api/sources/select?path=%2Fdata")
        .with_status(406)
        .create_async()
        .await;

    match client.select_source("/data").await {
        Outcome::Ok(SourceSelection::NeedsDestination) => {}
        other => panic!("expected NeedsDestination, got {other:?}"),
    }

    // A semantic 406 is state, not an error to display
    assert!(sink.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_call_reports_engine_message() {
    let mut server = mockito::Server::new_async().await;
    let engine = Engine::new();
    server
        .mock("POST", "/api/auth")
        .with_body(engine.auth_body())
        .create_async()
        .await;

    let (client, sink) = client_for(&server);
    client.connect().await.unwrap();

    server
        .mock("GET", "/api/configuration")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"database locked"}"#)
        .create_async()
        .await;

    let outcome: Outcome<keelback_client::api::Configuration> = client.configuration().await;
    match outcome {
        Outcome::Rejected { status, message } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(message, "database locked");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(
        sink.messages
            .lock()
            .unwrap()
            .iter()
            .any(|message| message == "database locked")
    );
}
