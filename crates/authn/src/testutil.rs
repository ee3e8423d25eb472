//! Shared test utilities for access token validation.
//!
//! This module provides helpers for generating Ed25519 key pairs, building
//! key chains and registrations around them, signing tokens, crafting raw
//! (unsigned or attack) tokens, and asserting on validation outcomes. It is
//! feature-gated behind `testutil` to stay out of production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! lti-core-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use lti_core_authn::testutil::{TestKeyPair, sign_claims};
//! ```

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::Utc;
use ed25519_dalek::SigningKey;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use lti_core_registration::{Key, KeyAlgorithm, KeyChain, Registration};
use rand_core::OsRng;
use serde_json::{Value, json};
use zeroize::Zeroizing;

/// DER prefix of an Ed25519 `SubjectPublicKeyInfo`, followed by the 32 key bytes.
const ED25519_SPKI_PREFIX: [u8; 12] =
    [0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00];

/// DER prefix of an Ed25519 PKCS#8 v1 private key, followed by the 32 seed bytes.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER version 0
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
];

/// A freshly generated Ed25519 key pair.
pub struct TestKeyPair {
    kid: String,
    pkcs8_der: Zeroizing<Vec<u8>>,
    public_key_bytes: [u8; 32],
}

impl TestKeyPair {
    /// Generates a new random key pair with a random `kid`.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key_bytes = signing_key.verifying_key().to_bytes();

        let private_bytes: Zeroizing<[u8; 32]> = Zeroizing::new(signing_key.to_bytes());
        let mut pkcs8_der = Zeroizing::new(ED25519_PKCS8_PREFIX.to_vec());
        pkcs8_der.extend_from_slice(&*private_bytes);

        let kid = format!("kid-{}", &URL_SAFE_NO_PAD.encode(public_key_bytes)[..12]);
        Self { kid, pkcs8_der, public_key_bytes }
    }

    /// Key identifier placed in token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Private key in PKCS#8 DER form.
    #[must_use]
    pub fn pkcs8_der(&self) -> &[u8] {
        &self.pkcs8_der
    }

    /// Public key as raw base64url.
    #[must_use]
    pub fn public_key(&self) -> Key {
        Key::new(KeyAlgorithm::EdDSA, URL_SAFE_NO_PAD.encode(self.public_key_bytes))
    }

    /// Public key as a `PUBLIC KEY` PEM document.
    #[must_use]
    pub fn public_key_pem(&self) -> Key {
        let mut der = ED25519_SPKI_PREFIX.to_vec();
        der.extend_from_slice(&self.public_key_bytes);
        Key::new(KeyAlgorithm::EdDSA, pem("PUBLIC KEY", &der))
    }

    /// Private key as a `PRIVATE KEY` PEM document.
    #[must_use]
    pub fn private_key_pem(&self) -> Key {
        Key::new(KeyAlgorithm::EdDSA, pem("PRIVATE KEY", &self.pkcs8_der))
    }

    /// Key chain holding both halves of this pair.
    #[must_use]
    pub fn key_chain(&self, key_set_name: &str) -> KeyChain {
        KeyChain::builder()
            .id(self.kid.as_str())
            .key_set_name(key_set_name)
            .public_key(self.public_key())
            .private_key(self.private_key_pem())
            .build()
    }

    /// Registration for `client_id` whose platform key chain is this pair.
    #[must_use]
    pub fn registration(&self, id: &str, client_id: &str) -> Registration {
        Registration::builder()
            .id(id)
            .client_id(client_id)
            .deployment_ids(vec![format!("{id}-deployment")])
            .platform_key_chain(self.key_chain("platformSet"))
            .build()
    }
}

fn pem(label: &str, der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut out = format!("-----BEGIN {label}-----\n");
    for line in body.as_bytes().chunks(64) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}

/// Signs arbitrary claims with an EdDSA header carrying the pair's `kid`.
///
/// # Panics
///
/// Panics if JWT encoding fails (should not happen with valid inputs).
#[allow(clippy::expect_used)]
pub fn sign_claims(pair: &TestKeyPair, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(pair.kid().to_owned());

    let encoding_key = EncodingKey::from_ed_der(pair.pkcs8_der());
    jsonwebtoken::encode(&header, claims, &encoding_key).expect("Failed to encode test JWT")
}

/// Signs a well-formed access token for `client_id` granting `scopes`.
///
/// The token expires in 1 hour from the current time.
pub fn create_access_token(pair: &TestKeyPair, client_id: &str, scopes: &[&str]) -> String {
    let now = Utc::now().timestamp();
    sign_claims(
        pair,
        &json!({
            "iss": "https://platform.example.com",
            "sub": client_id,
            "aud": [client_id],
            "exp": now + 3600,
            "iat": now,
            "jti": format!("jti-{now}-{client_id}"),
            "scopes": scopes,
        }),
    )
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The result has an empty signature: `{header_b64}.{payload_b64}.`
///
/// # Panics
///
/// Panics if JSON serialization fails.
#[allow(clippy::expect_used)]
pub fn craft_raw_jwt(header_json: &Value, payload_json: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Builds a request carrying `Authorization: Bearer <token>`.
///
/// # Panics
///
/// Panics if the token is not a valid header value.
#[allow(clippy::expect_used)]
pub fn bearer_request(token: &str) -> http::Request<()> {
    http::Request::builder()
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(())
        .expect("valid request")
}

/// Asserts that a [`ValidationResult`](crate::ValidationResult) failed with
/// the given [`ValidationFailureKind`](crate::ValidationFailureKind) variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use lti_core_authn::assert_validation_failure;
/// # fn result() -> lti_core_authn::ValidationResult { unimplemented!() }
///
/// let result = result();
/// assert_validation_failure!(result, MissingAuthorizationHeader);
/// ```
#[macro_export]
macro_rules! assert_validation_failure {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!(
                $result.failure_kind(),
                Some($crate::error::ValidationFailureKind::$variant)
            ),
            "expected ValidationFailureKind::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!(
                $result.failure_kind(),
                Some($crate::error::ValidationFailureKind::$variant)
            ),
            "{}: expected ValidationFailureKind::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
