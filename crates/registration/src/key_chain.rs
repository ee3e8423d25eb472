//! Key chain value objects.
//!
//! A [`KeyChain`] bundles the key material a registration uses to verify
//! inbound tokens (and, for tool chains, to sign outbound ones). Chains are
//! built once at configuration time and never mutated afterwards.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// PEM documents start with this marker.
const PEM_MARKER: &str = "-----BEGIN ";

/// Asymmetric signature algorithm carried by a [`Key`].
///
/// Symmetric algorithms are deliberately not representable: a registration
/// never shares a secret with the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    RS256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    RS384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    RS512,
    /// ECDSA using P-256 and SHA-256.
    ES256,
    /// ECDSA using P-384 and SHA-384.
    ES384,
    /// Ed25519.
    EdDSA,
}

impl KeyAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [KeyAlgorithm; 6] =
        [Self::RS256, Self::RS384, Self::RS512, Self::ES256, Self::ES384, Self::EdDSA];

    /// Returns the JOSE `alg` name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| format!("unsupported key algorithm '{s}'"))
    }
}

/// A single piece of key material.
///
/// `content` is either a PEM document or, for [`KeyAlgorithm::EdDSA`], the raw
/// 32-byte public key encoded base64url without padding. How the content was
/// obtained (file, environment, secret manager) is up to the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Key {
    algorithm: KeyAlgorithm,
    content: Zeroizing<String>,
}

impl Key {
    /// Creates a key from its algorithm and encoded content.
    #[must_use]
    pub fn new(algorithm: KeyAlgorithm, content: impl Into<String>) -> Self {
        Self { algorithm, content: Zeroizing::new(content.into()) }
    }

    /// Signature algorithm this key is used with.
    #[must_use]
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Encoded key material.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the content is a PEM document.
    #[must_use]
    pub fn is_pem(&self) -> bool {
        self.content.trim_start().starts_with(PEM_MARKER)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("algorithm", &self.algorithm)
            .field("pem", &self.is_pem())
            .finish_non_exhaustive()
    }
}

/// Named bundle of key material owned by a registration.
///
/// The public key is always present; it is what inbound tokens are verified
/// against. The private key and its passphrase are only needed when the chain
/// signs outbound tokens.
///
/// # Example
///
/// ```
/// use lti_core_registration::{Key, KeyAlgorithm, KeyChain};
///
/// let chain = KeyChain::builder()
///     .id("platform-kid-1")
///     .key_set_name("platformSet")
///     .public_key(Key::new(KeyAlgorithm::EdDSA, "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"))
///     .build();
///
/// assert_eq!(chain.id(), "platform-kid-1");
/// assert!(chain.private_key().is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct KeyChain {
    /// Identifier, unique within a registration set. Usually the JWK `kid`.
    #[builder(into)]
    id: String,

    /// Groups chains for key set discovery.
    #[builder(into)]
    key_set_name: String,

    /// Verification key.
    public_key: Key,

    /// Signing key.
    #[serde(default)]
    private_key: Option<Key>,

    /// Passphrase protecting the private key, if encrypted.
    #[serde(default)]
    #[builder(into)]
    private_key_passphrase: Option<Zeroizing<String>>,
}

impl KeyChain {
    /// Chain identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the key set this chain belongs to.
    #[must_use]
    pub fn key_set_name(&self) -> &str {
        &self.key_set_name
    }

    /// Verification key.
    #[must_use]
    pub fn public_key(&self) -> &Key {
        &self.public_key
    }

    /// Signing key, if this chain can sign.
    #[must_use]
    pub fn private_key(&self) -> Option<&Key> {
        self.private_key.as_ref()
    }

    /// Passphrase for the private key, if any.
    #[must_use]
    pub fn private_key_passphrase(&self) -> Option<&str> {
        self.private_key_passphrase.as_deref().map(String::as_str)
    }
}

impl fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |present: bool| present.then_some("<redacted>");

        f.debug_struct("KeyChain")
            .field("id", &self.id)
            .field("key_set_name", &self.key_set_name)
            .field("public_key", &self.public_key)
            .field("private_key", &redacted(self.private_key.is_some()))
            .field("private_key_passphrase", &redacted(self.private_key_passphrase.is_some()))
            .finish()
    }
}
