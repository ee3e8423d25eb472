//! Validation configuration builder.
//!
//! [`Configuration::build`] is a pure factory producing the three pieces a
//! token check needs:
//!
//! - a [`Parser`], which decodes a compact JWT without verifying it
//! - a [`Verifier`], bound to one key and its algorithm (absent when no key was given)
//! - an ordered list of [`Constraint`]s the verifier enforces in conjunction
//!
//! ```text
//! build(None)      → { parser, verifier: None, constraints: [] }
//! build(Some(key)) → { parser, verifier: Some(key), constraints: [SignedWith, HasClaim(exp),
//!                                                                 ValidAt, MaxAge?, IssuedBy?] }
//! ```
//!
//! A key-less configuration is only ever used to peek at claims (for
//! instance, to learn which registration to verify against). Claims read
//! that way must not drive any authorization decision until the token has
//! passed a keyed configuration.

use std::{fmt, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use ed25519_dalek::{PUBLIC_KEY_LENGTH, VerifyingKey};
use jsonwebtoken::DecodingKey;
use lti_core_registration::{Key, KeyAlgorithm};
use zeroize::Zeroizing;

use crate::{
    config::ValidatorConfig,
    error::{AuthError, Result},
    token::{CLAIM_EXPIRES_AT, CLAIM_ISSUED_AT, CLAIM_NOT_BEFORE, Token},
    validation::{jwt_algorithm, validate_algorithm_for_key},
};

/// A single claim or signature requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Header `alg` equals the key algorithm and the signature verifies.
    SignedWith {
        /// Algorithm the verification key is bound to.
        algorithm: KeyAlgorithm,
    },
    /// The named claim is present.
    HasClaim(String),
    /// `exp`, `nbf` and `iat` (when present) are consistent with the current time.
    ValidAt {
        /// Tolerated clock skew.
        leeway: Duration,
    },
    /// `iat` is present and no older than the given age.
    MaxAge(Duration),
    /// `iss` equals the given issuer.
    IssuedBy(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedWith { algorithm } => write!(f, "signed_with({algorithm})"),
            Self::HasClaim(claim) => write!(f, "has_claim({claim})"),
            Self::ValidAt { leeway } => write!(f, "valid_at(leeway={}s)", leeway.as_secs()),
            Self::MaxAge(age) => write!(f, "max_age({}s)", age.as_secs()),
            Self::IssuedBy(issuer) => write!(f, "issued_by({issuer})"),
        }
    }
}

/// Decodes compact JWTs into [`Token`]s without verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parser;

impl Parser {
    /// Parses a compact JWT.
    ///
    /// # Errors
    ///
    /// See [`Token::parse`].
    pub fn parse(&self, compact: &str) -> Result<Token> {
        Token::parse(compact)
    }
}

/// Verifies tokens against one key.
#[derive(Clone)]
pub struct Verifier {
    key: DecodingKey,
    algorithm: KeyAlgorithm,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier").field("algorithm", &self.algorithm).finish_non_exhaustive()
    }
}

impl Verifier {
    /// Builds a verifier for the given key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPublicKey`] if the key material cannot be
    /// decoded for its algorithm.
    pub fn new(key: &Key) -> Result<Self> {
        Ok(Self { key: to_decoding_key(key)?, algorithm: key.algorithm() })
    }

    /// Algorithm the key is bound to.
    #[must_use]
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Checks every constraint in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing constraint.
    pub fn validate(&self, token: &Token, constraints: &[Constraint]) -> Result<()> {
        constraints.iter().try_for_each(|constraint| self.check(token, constraint))
    }

    /// Whether every constraint holds.
    #[must_use]
    pub fn is_valid(&self, token: &Token, constraints: &[Constraint]) -> bool {
        self.validate(token, constraints).is_ok()
    }

    fn check(&self, token: &Token, constraint: &Constraint) -> Result<()> {
        let now = Utc::now().timestamp();

        match constraint {
            Constraint::SignedWith { algorithm } => self.check_signature(token, *algorithm),
            Constraint::HasClaim(claim) => {
                if token.has(claim) {
                    Ok(())
                } else {
                    Err(AuthError::missing_claim(claim.as_str()))
                }
            },
            Constraint::ValidAt { leeway } => check_valid_at(token, now, secs(*leeway)),
            Constraint::MaxAge(max_age) => {
                let iat = numeric_claim(token, CLAIM_ISSUED_AT)?
                    .ok_or_else(|| AuthError::missing_claim(CLAIM_ISSUED_AT))?;
                if now.saturating_sub(iat) > secs(*max_age) {
                    return Err(AuthError::token_too_old());
                }
                Ok(())
            },
            Constraint::IssuedBy(expected) => match token.issuer() {
                Some(issuer) if issuer == expected => Ok(()),
                actual => Err(AuthError::invalid_issuer(format!(
                    "expected '{expected}', got '{}'",
                    actual.unwrap_or_default()
                ))),
            },
        }
    }

    fn check_signature(&self, token: &Token, algorithm: KeyAlgorithm) -> Result<()> {
        if algorithm != self.algorithm {
            return Err(AuthError::unsupported_algorithm(format!(
                "constraint requires '{algorithm}' but key is '{}'",
                self.algorithm
            )));
        }

        let header_alg = format!("{:?}", token.header().alg);
        validate_algorithm_for_key(&header_alg, self.algorithm)?;

        let (message, signature) = token
            .signing_parts()
            .ok_or_else(|| AuthError::invalid_token_format("JWT has no signature part"))?;

        let verified = jsonwebtoken::crypto::verify(
            signature,
            message.as_bytes(),
            &self.key,
            jwt_algorithm(self.algorithm),
        )?;

        if verified { Ok(()) } else { Err(AuthError::invalid_signature()) }
    }
}

/// Parser, verifier and constraints for one key.
#[derive(Debug, Clone)]
pub struct Configuration {
    parser: Parser,
    verifier: Option<Verifier>,
    constraints: Vec<Constraint>,
}

impl Configuration {
    /// Builds a configuration for `key`.
    ///
    /// Without a key, the configuration can only parse. With a key, the
    /// constraints are, in order: `SignedWith`, `HasClaim("exp")` (when
    /// expiry is required), `ValidAt`, `MaxAge` (when configured) and
    /// `IssuedBy` (when configured).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPublicKey`] if the key cannot be decoded.
    pub fn build(key: Option<&Key>, config: &ValidatorConfig) -> Result<Self> {
        let Some(key) = key else {
            return Ok(Self::parse_only());
        };

        let verifier = Verifier::new(key)?;

        let mut constraints = vec![Constraint::SignedWith { algorithm: key.algorithm() }];
        if config.require_expiration() {
            constraints.push(Constraint::HasClaim(CLAIM_EXPIRES_AT.to_owned()));
        }
        constraints.push(Constraint::ValidAt { leeway: config.leeway() });
        if let Some(max_age) = config.max_token_age() {
            constraints.push(Constraint::MaxAge(max_age));
        }
        if let Some(issuer) = config.issuer() {
            constraints.push(Constraint::IssuedBy(issuer.to_owned()));
        }

        Ok(Self { parser: Parser, verifier: Some(verifier), constraints })
    }

    /// A configuration that can only parse.
    #[must_use]
    pub fn parse_only() -> Self {
        Self { parser: Parser, verifier: None, constraints: Vec::new() }
    }

    /// Token parser.
    #[must_use]
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Verifier, when built with a key.
    #[must_use]
    pub fn verifier(&self) -> Option<&Verifier> {
        self.verifier.as_ref()
    }

    /// Constraints, in evaluation order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Validates `token` against every constraint.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingVerificationKey`] for a key-less
    /// configuration, otherwise the first failing constraint's error.
    pub fn validate(&self, token: &Token) -> Result<()> {
        let verifier = self.verifier.as_ref().ok_or(AuthError::MissingVerificationKey)?;
        verifier.validate(token, &self.constraints)
    }
}

fn secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Reads a timestamp claim, failing if it is present but not numeric.
fn numeric_claim(token: &Token, name: &str) -> Result<Option<i64>> {
    if !token.has(name) {
        return Ok(None);
    }
    token
        .seconds(name)
        .map(Some)
        .ok_or_else(|| AuthError::invalid_token_format(format!("{name} claim is not a number")))
}

fn check_valid_at(token: &Token, now: i64, leeway: i64) -> Result<()> {
    if let Some(exp) = numeric_claim(token, CLAIM_EXPIRES_AT)?
        && exp <= now.saturating_sub(leeway)
    {
        return Err(AuthError::token_expired());
    }

    if let Some(nbf) = numeric_claim(token, CLAIM_NOT_BEFORE)?
        && nbf > now.saturating_add(leeway)
    {
        return Err(AuthError::token_not_yet_valid());
    }

    if let Some(iat) = numeric_claim(token, CLAIM_ISSUED_AT)?
        && iat > now.saturating_add(leeway)
    {
        return Err(AuthError::invalid_token_format("iat claim is in the future"));
    }

    Ok(())
}

/// Converts key material into a `jsonwebtoken` decoding key.
fn to_decoding_key(key: &Key) -> Result<DecodingKey> {
    let invalid = |e: jsonwebtoken::errors::Error| AuthError::invalid_public_key(e.to_string());

    if key.is_pem() {
        let pem = key.content().as_bytes();
        return match key.algorithm() {
            KeyAlgorithm::RS256 | KeyAlgorithm::RS384 | KeyAlgorithm::RS512 => {
                DecodingKey::from_rsa_pem(pem).map_err(invalid)
            },
            KeyAlgorithm::ES256 | KeyAlgorithm::ES384 => {
                DecodingKey::from_ec_pem(pem).map_err(invalid)
            },
            KeyAlgorithm::EdDSA => DecodingKey::from_ed_pem(pem).map_err(invalid),
        };
    }

    if key.algorithm() != KeyAlgorithm::EdDSA {
        return Err(AuthError::invalid_public_key(format!(
            "{} keys must be PEM encoded",
            key.algorithm()
        )));
    }

    // Raw Ed25519: base64url without padding, 32 bytes, on the curve.
    let public_key_bytes: Zeroizing<Vec<u8>> = Zeroizing::new(
        URL_SAFE_NO_PAD
            .decode(key.content().trim())
            .map_err(|e| AuthError::invalid_public_key(format!("base64 decode: {e}")))?,
    );

    let key_bytes: Zeroizing<[u8; PUBLIC_KEY_LENGTH]> =
        Zeroizing::new(public_key_bytes.as_slice().try_into().map_err(|_| {
            AuthError::invalid_public_key(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                public_key_bytes.len()
            ))
        })?);

    VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| AuthError::invalid_public_key(format!("invalid Ed25519 key: {e}")))?;

    DecodingKey::from_ed_components(key.content().trim()).map_err(invalid)
}
