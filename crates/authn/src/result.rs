//! Outcome of an access token validation.

use lti_core_registration::Registration;

use crate::{
    error::{ValidationError, ValidationFailureKind},
    token::Token,
};

/// Immutable record of one validation run.
///
/// `successes` lists, in check order, every stage that passed before the run
/// ended; it is kept on failure so operators can see how far a request got.
/// The registration and token are only populated on success. The presence of
/// an error is the sole success/failure discriminator.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    successes: Vec<String>,
    registration: Option<Registration>,
    token: Option<Token>,
    error: Option<String>,
    failure: Option<ValidationFailureKind>,
}

impl ValidationResult {
    /// Builds a successful result.
    pub(crate) fn success(
        successes: Vec<String>,
        registration: Registration,
        token: Token,
    ) -> Self {
        Self {
            successes,
            registration: Some(registration),
            token: Some(token),
            error: None,
            failure: None,
        }
    }

    /// Builds a failed result keeping the markers collected so far.
    pub(crate) fn failure(successes: Vec<String>, error: &ValidationError) -> Self {
        Self {
            successes,
            registration: None,
            token: None,
            error: Some(error.to_string()),
            failure: Some(error.kind()),
        }
    }

    /// Success markers, in check order.
    #[must_use]
    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    /// Resolved registration (success only).
    #[must_use]
    pub fn registration(&self) -> Option<&Registration> {
        self.registration.as_ref()
    }

    /// Verified token (success only).
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Failure message, if the run failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether the run failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether every check passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Structured kind of the failure, if the run failed.
    #[must_use]
    pub fn failure_kind(&self) -> Option<ValidationFailureKind> {
        self.failure
    }
}
