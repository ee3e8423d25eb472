//! Parsed JWT access tokens.
//!
//! A [`Token`] is the decoded form of a compact JWT: its JOSE header and its
//! claim set. Parsing never verifies anything; verification is the job of a
//! [`Verifier`](crate::configuration::Verifier) built for a specific key.
//!
//! # Example
//!
//! ```
//! use lti_core_authn::Token;
//!
//! // {"alg":"RS256","typ":"JWT"} . {"aud":["client-1"],"scopes":["read","write"]}
//! let compact = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.\
//!                eyJhdWQiOlsiY2xpZW50LTEiXSwic2NvcGVzIjpbInJlYWQiLCJ3cml0ZSJdfQ.\
//!                c2lnbmF0dXJl";
//! let token = Token::parse(compact).unwrap();
//!
//! assert_eq!(token.client_id().as_deref(), Some("client-1"));
//! assert_eq!(token.scopes(), ["read", "write"]);
//! assert!(!token.has("exp"));
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Header, decode_header};
use serde_json::{Map, Value};

use crate::error::{AuthError, Result};

/// Audience claim.
pub const CLAIM_AUDIENCE: &str = "aud";
/// Expiration time claim.
pub const CLAIM_EXPIRES_AT: &str = "exp";
/// Not-before claim.
pub const CLAIM_NOT_BEFORE: &str = "nbf";
/// Issued-at claim.
pub const CLAIM_ISSUED_AT: &str = "iat";
/// Issuer claim.
pub const CLAIM_ISSUER: &str = "iss";
/// Subject claim.
pub const CLAIM_SUBJECT: &str = "sub";
/// JWT ID claim.
pub const CLAIM_JWT_ID: &str = "jti";
/// List of granted scopes.
pub const CLAIM_SCOPES: &str = "scopes";
/// OAuth2 space-separated scope string, read when [`CLAIM_SCOPES`] is absent.
pub const CLAIM_SCOPE: &str = "scope";

/// A decoded, unverified JWT.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    compact: String,
    header: Header,
    claims: Map<String, Value>,
}

impl Token {
    /// Decodes a compact JWT without verifying it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTokenFormat`] if:
    /// - The token does not have exactly 3 dot-separated parts
    /// - The header cannot be decoded or names an unknown algorithm
    /// - The payload is not base64url-encoded JSON
    /// - The payload is not a JSON object
    pub fn parse(compact: &str) -> Result<Self> {
        let parts: Vec<&str> = compact.split('.').collect();
        if parts.len() != 3 {
            return Err(AuthError::invalid_token_format("JWT must have 3 parts separated by dots"));
        }

        let header = decode_header(compact).map_err(|e| {
            AuthError::invalid_token_format(format!("Failed to decode JWT header: {e}"))
        })?;

        let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|e| {
            AuthError::invalid_token_format(format!("Failed to decode JWT payload: {e}"))
        })?;

        let claims = match serde_json::from_slice::<Value>(&payload_bytes) {
            Ok(Value::Object(claims)) => claims,
            Ok(_) => {
                return Err(AuthError::invalid_token_format("JWT payload is not a JSON object"));
            },
            Err(e) => {
                return Err(AuthError::invalid_token_format(format!(
                    "Failed to parse JWT claims: {e}"
                )));
            },
        };

        Ok(Self { compact: compact.to_owned(), header, claims })
    }

    /// The compact serialization this token was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.compact
    }

    /// JOSE header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Full claim set.
    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Whether the claim is present.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.claims.contains_key(name)
    }

    /// Claim value, if present.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Claim value, or `default` when absent.
    #[must_use]
    pub fn get(&self, name: &str, default: Value) -> Value {
        self.claims.get(name).cloned().unwrap_or(default)
    }

    /// Audience entries. A string audience yields one entry.
    #[must_use]
    pub fn audience(&self) -> Vec<String> {
        match self.claim(CLAIM_AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.clone()],
            Some(Value::Array(entries)) => string_entries(entries),
            _ => Vec::new(),
        }
    }

    /// Client id claimed by the token: the first audience entry.
    ///
    /// Only `aud[0]` is considered. If it is not a non-empty string the token
    /// claims no client id, even when later entries are strings.
    #[must_use]
    pub fn client_id(&self) -> Option<String> {
        let first = match self.claim(CLAIM_AUDIENCE)? {
            Value::String(aud) => aud.as_str(),
            Value::Array(entries) => entries.first()?.as_str()?,
            _ => return None,
        };
        (!first.is_empty()).then(|| first.to_owned())
    }

    /// Scopes granted by the token.
    ///
    /// Reads the `scopes` list, falling back to the space-separated OAuth2
    /// `scope` string. Defaults to no scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        let value = self.claim(CLAIM_SCOPES).or_else(|| self.claim(CLAIM_SCOPE));
        match value {
            Some(Value::Array(entries)) => string_entries(entries),
            Some(Value::String(scope)) => scope.split_whitespace().map(str::to_owned).collect(),
            _ => Vec::new(),
        }
    }

    /// Issuer, if present.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.claim(CLAIM_ISSUER).and_then(Value::as_str)
    }

    /// Subject, if present.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claim(CLAIM_SUBJECT).and_then(Value::as_str)
    }

    /// JWT ID, if present.
    #[must_use]
    pub fn jti(&self) -> Option<&str> {
        self.claim(CLAIM_JWT_ID).and_then(Value::as_str)
    }

    /// Expiration time, if present and numeric.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CLAIM_EXPIRES_AT)
    }

    /// Not-before time, if present and numeric.
    #[must_use]
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CLAIM_NOT_BEFORE)
    }

    /// Issued-at time, if present and numeric.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp(CLAIM_ISSUED_AT)
    }

    /// Seconds-since-epoch claim, accepting integer or fractional JSON numbers.
    pub(crate) fn seconds(&self, name: &str) -> Option<i64> {
        let value = self.claim(name)?;
        value.as_i64().or_else(|| value.as_f64().map(|secs| secs as i64))
    }

    fn timestamp(&self, name: &str) -> Option<DateTime<Utc>> {
        self.seconds(name).and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// The signed portion (`header.payload`) and the encoded signature.
    pub(crate) fn signing_parts(&self) -> Option<(&str, &str)> {
        self.compact.rsplit_once('.')
    }
}

fn string_entries(entries: &[Value]) -> Vec<String> {
    entries.iter().filter_map(Value::as_str).map(str::to_owned).collect()
}
