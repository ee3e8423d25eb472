//! Authentication error types.
//!
//! Two layers of errors live here:
//!
//! - [`AuthError`]: failures of the token primitives (parsing, key decoding, signature and claim
//!   constraints).
//! - [`ValidationError`]: failures of an access token validation stage. Each variant corresponds
//!   to exactly one stage of [`AccessTokenRequestValidator`], and its display string is the
//!   message reported in [`ValidationResult::error`].
//!
//! [`AccessTokenRequestValidator`]: crate::AccessTokenRequestValidator
//! [`ValidationResult::error`]: crate::ValidationResult::error

use lti_core_registration::RegistryError;
use thiserror::Error;

/// Token parsing and verification errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. Downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Malformed JWT - cannot be decoded.
    #[error("Invalid token format: {message}")]
    InvalidTokenFormat {
        /// What was wrong with the token.
        message: String,
    },

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token not yet valid (nbf claim in future).
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// Token issued too long ago.
    #[error("Token too old")]
    TokenTooOld,

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Unknown or invalid issuer.
    #[error("Invalid issuer: {message}")]
    InvalidIssuer {
        /// Details of the mismatch.
        message: String,
    },

    /// Required claim is missing.
    #[error("Missing claim: {claim}")]
    MissingClaim {
        /// Name of the missing claim.
        claim: String,
    },

    /// Algorithm not in allowed list, or not the one the key is bound to.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// Why the algorithm was refused.
        message: String,
    },

    /// Invalid public key format.
    #[error("Invalid public key: {message}")]
    InvalidPublicKey {
        /// Why the key could not be used.
        message: String,
    },

    /// Verification was requested from a configuration built without a key.
    #[error("No verification key configured")]
    MissingVerificationKey,
}

impl AuthError {
    /// Creates an `InvalidTokenFormat` error.
    #[must_use]
    pub fn invalid_token_format(message: impl Into<String>) -> Self {
        Self::InvalidTokenFormat { message: message.into() }
    }

    /// Creates a `TokenExpired` error.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    /// Creates a `TokenNotYetValid` error.
    #[must_use]
    pub fn token_not_yet_valid() -> Self {
        Self::TokenNotYetValid
    }

    /// Creates a `TokenTooOld` error.
    #[must_use]
    pub fn token_too_old() -> Self {
        Self::TokenTooOld
    }

    /// Creates an `InvalidSignature` error.
    #[must_use]
    pub fn invalid_signature() -> Self {
        Self::InvalidSignature
    }

    /// Creates an `InvalidIssuer` error.
    #[must_use]
    pub fn invalid_issuer(message: impl Into<String>) -> Self {
        Self::InvalidIssuer { message: message.into() }
    }

    /// Creates a `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim { claim: claim.into() }
    }

    /// Creates an `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { message: message.into() }
    }

    /// Creates an `InvalidPublicKey` error.
    #[must_use]
    pub fn invalid_public_key(message: impl Into<String>) -> Self {
        Self::InvalidPublicKey { message: message.into() }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => AuthError::invalid_token_format("Invalid JWT structure"),
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidIssuer => AuthError::invalid_issuer("Issuer validation failed"),
            ErrorKind::InvalidAlgorithm => {
                AuthError::unsupported_algorithm("Algorithm not supported")
            },
            ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidAlgorithmName => AuthError::invalid_public_key(err.to_string()),
            _ => AuthError::invalid_token_format(format!("JWT error: {err}")),
        }
    }
}

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure of one access token validation stage.
///
/// The display string of each variant is the message carried by a failed
/// [`ValidationResult`](crate::ValidationResult).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The request carries no `Authorization` header.
    #[error("Missing Authorization header")]
    MissingAuthorizationHeader,

    /// The header is not a bearer credential or the token cannot be parsed.
    #[error("Malformed access token: {reason}")]
    MalformedToken {
        /// Why parsing failed.
        reason: String,
    },

    /// The token carries no usable `aud` claim.
    #[error("Missing or invalid aud claim in access token")]
    InvalidAudienceClaim,

    /// No registration is known for the claimed client id.
    #[error("No registration found for client_id: {client_id}")]
    UnknownClientId {
        /// Client id taken from the `aud` claim.
        client_id: String,
    },

    /// The registration lookup itself failed.
    #[error("Registration lookup failed for client_id {client_id}: {source}")]
    RegistrationLookupFailed {
        /// Client id taken from the `aud` claim.
        client_id: String,
        /// Underlying repository failure.
        #[source]
        source: RegistryError,
    },

    /// The registration has no platform key chain to verify with.
    #[error("Missing platform key chain for registration: {registration_id}")]
    MissingPlatformKeyChain {
        /// Identifier of the registration.
        registration_id: String,
    },

    /// Signature or claim constraints rejected the token.
    #[error("JWT access token is invalid: {source}")]
    TokenValidationFailed {
        /// The constraint failure.
        #[source]
        source: AuthError,
    },

    /// None of the token scopes is allowed for this call.
    #[error("JWT access token scopes are invalid")]
    InsufficientScope,
}

impl ValidationError {
    /// Creates a `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(reason: impl Into<String>) -> Self {
        Self::MalformedToken { reason: reason.into() }
    }

    /// Structured kind of this failure.
    #[must_use]
    pub fn kind(&self) -> ValidationFailureKind {
        match self {
            Self::MissingAuthorizationHeader => ValidationFailureKind::MissingAuthorizationHeader,
            Self::MalformedToken { .. } => ValidationFailureKind::MalformedToken,
            Self::InvalidAudienceClaim => ValidationFailureKind::InvalidAudienceClaim,
            Self::UnknownClientId { .. } => ValidationFailureKind::UnknownClientId,
            Self::RegistrationLookupFailed { .. } => ValidationFailureKind::RegistrationLookupFailed,
            Self::MissingPlatformKeyChain { .. } => ValidationFailureKind::MissingPlatformKeyChain,
            Self::TokenValidationFailed { .. } => ValidationFailureKind::TokenValidationFailed,
            Self::InsufficientScope => ValidationFailureKind::InsufficientScope,
        }
    }
}

/// Kind of a validation failure, for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ValidationFailureKind {
    /// See [`ValidationError::MissingAuthorizationHeader`].
    MissingAuthorizationHeader,
    /// See [`ValidationError::MalformedToken`].
    MalformedToken,
    /// See [`ValidationError::InvalidAudienceClaim`].
    InvalidAudienceClaim,
    /// See [`ValidationError::UnknownClientId`].
    UnknownClientId,
    /// See [`ValidationError::RegistrationLookupFailed`].
    RegistrationLookupFailed,
    /// See [`ValidationError::MissingPlatformKeyChain`].
    MissingPlatformKeyChain,
    /// See [`ValidationError::TokenValidationFailed`].
    TokenValidationFailed,
    /// See [`ValidationError::InsufficientScope`].
    InsufficientScope,
}
