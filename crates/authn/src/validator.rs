//! Access token request validation pipeline.
//!
//! [`AccessTokenRequestValidator`] decides whether an inbound service call
//! carrying `Authorization: Bearer <JWT>` comes from a known platform, is
//! signed by that platform's key, is within its validity window, and grants
//! at least one of the scopes the caller accepts.
//!
//! # Pipeline
//!
//! ```text
//! request ─► header present ─► parse (no key) ─► aud → client_id
//!         ─► registration lookup        [marker 1]
//!         ─► platform key chain         [marker 2]
//!         ─► signature + claim checks   [marker 3]
//!         ─► scope intersection         [marker 4] ─► ValidationResult
//! ```
//!
//! Each stage either appends one success marker or ends the run. The first
//! failure is reported to the [`ValidationLogger`] and converted into a
//! failed [`ValidationResult`] that keeps the markers gathered so far;
//! nothing is raised to the caller.
//!
//! Claims are read from the unverified token only to find the registration
//! whose key verifies it. They are trusted for authorization only once the
//! keyed checks have passed.

use std::{collections::HashSet, sync::Arc};

use fail::fail_point;
use http::{HeaderMap, Request, header::AUTHORIZATION};
use lti_core_registration::{Registration, RegistrationRepository};

use crate::{
    config::ValidatorConfig,
    configuration::Configuration,
    error::ValidationError,
    logger::{TracingValidationLogger, ValidationLogger},
    result::ValidationResult,
    token::Token,
};

/// Marker appended once the access token passed signature and claim checks.
pub const TOKEN_VALID_MARKER: &str = "JWT access token is valid";

/// Marker appended once the token scopes intersect the allowed scopes.
pub const SCOPES_VALID_MARKER: &str = "JWT access token scopes are valid";

/// Validates bearer access tokens on inbound service requests.
///
/// The validator holds no per-call state: one instance can serve concurrent
/// requests from many threads, and every call builds its own audit trail.
///
/// # Example
///
/// ```
/// use std::{collections::HashSet, sync::Arc};
///
/// use lti_core_authn::AccessTokenRequestValidator;
/// use lti_core_registration::MemoryRegistrationRepository;
///
/// let validator =
///     AccessTokenRequestValidator::new(Arc::new(MemoryRegistrationRepository::new()));
///
/// let request = http::Request::builder().body(()).unwrap();
/// let result = validator.validate(&request, &HashSet::from(["score".to_owned()]));
///
/// assert!(!result.succeeded());
/// assert_eq!(result.error(), Some("Missing Authorization header"));
/// assert!(result.successes().is_empty());
/// ```
#[derive(Clone, bon::Builder)]
pub struct AccessTokenRequestValidator {
    /// Resolves client ids to registrations.
    repository: Arc<dyn RegistrationRepository>,

    /// Receives one message per failed validation.
    #[builder(default = Arc::new(TracingValidationLogger) as Arc<dyn ValidationLogger>)]
    logger: Arc<dyn ValidationLogger>,

    /// Claim constraint settings.
    #[builder(default)]
    config: ValidatorConfig,
}

impl std::fmt::Debug for AccessTokenRequestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenRequestValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Success markers of a single run, in check order.
#[derive(Debug, Default)]
struct AuditTrail {
    successes: Vec<String>,
}

impl AuditTrail {
    fn record(&mut self, marker: impl Into<String>) {
        let marker = marker.into();
        tracing::debug!(stage = self.successes.len() + 1, marker = %marker, "validation stage passed");
        self.successes.push(marker);
    }

    fn into_successes(self) -> Vec<String> {
        self.successes
    }
}

impl AccessTokenRequestValidator {
    /// Creates a validator with the tracing logger and default configuration.
    #[must_use]
    pub fn new(repository: Arc<dyn RegistrationRepository>) -> Self {
        Self::builder().repository(repository).build()
    }

    /// Claim constraint settings.
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validates the bearer token of `request` against `allowed_scopes`.
    ///
    /// An empty `allowed_scopes` set can never intersect the token scopes, so
    /// such a call always fails at the scope stage.
    pub fn validate<B>(
        &self,
        request: &Request<B>,
        allowed_scopes: &HashSet<String>,
    ) -> ValidationResult {
        self.validate_headers(request.headers(), allowed_scopes)
    }

    /// Validates the bearer token found in `headers` against `allowed_scopes`.
    #[tracing::instrument(skip_all, fields(client_id = tracing::field::Empty))]
    pub fn validate_headers(
        &self,
        headers: &HeaderMap,
        allowed_scopes: &HashSet<String>,
    ) -> ValidationResult {
        let mut trail = AuditTrail::default();

        match self.run(headers, allowed_scopes, &mut trail) {
            Ok((registration, token)) => {
                tracing::debug!(registration_id = registration.id(), "access token accepted");
                ValidationResult::success(trail.into_successes(), registration, token)
            },
            Err(error) => {
                self.logger.error(&error.to_string());
                ValidationResult::failure(trail.into_successes(), &error)
            },
        }
    }

    fn run(
        &self,
        headers: &HeaderMap,
        allowed_scopes: &HashSet<String>,
        trail: &mut AuditTrail,
    ) -> Result<(Registration, Token), ValidationError> {
        let compact = extract_bearer_token(headers)?;

        let token = Configuration::build(None, &self.config)
            .and_then(|configuration| configuration.parser().parse(compact))
            .map_err(|e| ValidationError::malformed_token(e.to_string()))?;

        let client_id = token.client_id().ok_or(ValidationError::InvalidAudienceClaim)?;
        tracing::Span::current().record("client_id", client_id.as_str());

        let registration = self.find_registration(&client_id)?;
        trail.record(format!("Registration found for client_id: {client_id}"));

        let key_chain = registration.platform_key_chain().ok_or_else(|| {
            ValidationError::MissingPlatformKeyChain { registration_id: registration.id().to_owned() }
        })?;
        trail.record(format!("Platform key chain found for registration: {}", registration.id()));

        Configuration::build(Some(key_chain.public_key()), &self.config)
            .and_then(|configuration| configuration.validate(&token))
            .map_err(|source| ValidationError::TokenValidationFailed { source })?;
        trail.record(TOKEN_VALID_MARKER);

        let granted = intersect_scopes(&token.scopes(), allowed_scopes);
        if granted.is_empty() {
            return Err(ValidationError::InsufficientScope);
        }
        tracing::debug!(granted = ?granted, "scopes granted");
        trail.record(SCOPES_VALID_MARKER);

        Ok((registration, token))
    }

    fn find_registration(&self, client_id: &str) -> Result<Registration, ValidationError> {
        fail_point!("validator-before-registration-lookup", |_| {
            Err(ValidationError::RegistrationLookupFailed {
                client_id: client_id.to_owned(),
                source: lti_core_registration::RegistryError::internal(
                    "injected failure before registration lookup",
                ),
            })
        });

        match self.repository.find_by_client_id(client_id) {
            Ok(Some(registration)) => Ok(registration),
            Ok(None) => Err(ValidationError::UnknownClientId { client_id: client_id.to_owned() }),
            Err(source) => {
                tracing::warn!(client_id, error = %source, "registration lookup failed");
                Err(ValidationError::RegistrationLookupFailed {
                    client_id: client_id.to_owned(),
                    source,
                })
            },
        }
    }
}

/// Extracts the compact token from an `Authorization: Bearer` header.
///
/// # Errors
///
/// Returns [`ValidationError::MissingAuthorizationHeader`] if the header is
/// absent, and [`ValidationError::MalformedToken`] if it is not valid
/// visible ASCII, does not use the Bearer scheme, or carries an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ValidationError> {
    let header =
        headers.get(AUTHORIZATION).ok_or(ValidationError::MissingAuthorizationHeader)?;

    let value = header
        .to_str()
        .map_err(|_| ValidationError::malformed_token("Invalid Authorization header encoding"))?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or_else(|| {
            ValidationError::malformed_token("Authorization header must use Bearer scheme")
        })?
        .trim();

    if token.is_empty() {
        return Err(ValidationError::malformed_token("Bearer token is empty"));
    }

    Ok(token)
}

/// Token scopes that are also allowed, in token order.
#[must_use]
pub fn intersect_scopes(token_scopes: &[String], allowed_scopes: &HashSet<String>) -> Vec<String> {
    token_scopes.iter().filter(|scope| allowed_scopes.contains(*scope)).cloned().collect()
}
