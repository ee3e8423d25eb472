//! # LTI Core Authentication
//!
//! Bearer access token validation for LTI Advantage service calls.
//!
//! This crate provides:
//! - **Request validation**: the [`AccessTokenRequestValidator`] pipeline and
//!   its [`ValidationResult`] audit trail
//! - **Tokens**: unverified parsing and claim access via [`Token`]
//! - **Configuration**: parser, verifier and claim constraints built from a
//!   platform key
//! - **Algorithm validation**: only asymmetric algorithms are accepted
//!
//! ## Features
//!
//! - Symmetric algorithms (HS256, etc.) and `none` are explicitly rejected
//! - Registration lookup goes through a pluggable
//!   [`RegistrationRepository`](lti_core_registration::RegistrationRepository)
//! - Failures are reported once to a [`ValidationLogger`] and never raised
//!
//! ## Example
//!
//! ```no_run
//! use std::{collections::HashSet, sync::Arc};
//!
//! use lti_core_authn::AccessTokenRequestValidator;
//! use lti_core_registration::MemoryRegistrationRepository;
//!
//! # fn example(request: http::Request<()>) {
//! let repository = Arc::new(MemoryRegistrationRepository::new());
//! let validator = AccessTokenRequestValidator::new(repository);
//!
//! let allowed = HashSet::from(["https://purl.imsglobal.org/spec/lti-ags/scope/score".to_owned()]);
//! let result = validator.validate(&request, &allowed);
//!
//! if let Some(error) = result.error() {
//!     println!("rejected: {error}");
//! } else {
//!     println!("accepted after: {:?}", result.successes());
//! }
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Validator settings.
pub mod config;
/// Parser, verifier and claim constraints.
pub mod configuration;
/// Authentication and validation error types.
pub mod error;
/// Failure reporting.
pub mod logger;
/// Validation outcome.
pub mod result;
/// Unverified JWT access tokens.
pub mod token;
/// Algorithm validation.
pub mod validation;
/// Request validation pipeline.
pub mod validator;

/// Test helpers: key pairs, token signing, request building.
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

// Re-export key types for convenience
pub use config::{ConfigError, ValidatorConfig};
pub use configuration::{Configuration, Constraint, Parser, Verifier};
pub use error::{AuthError, Result, ValidationError, ValidationFailureKind};
pub use logger::{NoopValidationLogger, TracingValidationLogger, ValidationLogger};
pub use result::ValidationResult;
pub use token::Token;
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
pub use validator::{AccessTokenRequestValidator, extract_bearer_token, intersect_scopes};
