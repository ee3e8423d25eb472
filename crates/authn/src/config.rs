//! Validator configuration.
//!
//! [`ValidatorConfig`] controls which claim constraints the configuration
//! builder attaches next to the signature check. It can be built in code or
//! deserialized from a service configuration file.
//!
//! ```
//! use std::time::Duration;
//! use lti_core_authn::ValidatorConfig;
//!
//! let config = ValidatorConfig::builder()
//!     .leeway(Duration::from_secs(30))
//!     .issuer("https://platform.example.com")
//!     .build()?;
//! assert!(config.require_expiration());
//! # Ok::<(), lti_core_authn::ConfigError>(())
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default clock skew tolerance (none).
pub const DEFAULT_LEEWAY: Duration = Duration::ZERO;

/// Largest accepted clock skew tolerance (5 minutes).
pub const MAX_LEEWAY: Duration = Duration::from_secs(300);

/// Invalid validator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid validator configuration: {0}")]
pub struct ConfigError(String);

/// Settings for access token claim constraints.
///
/// Deserialization goes through [`ValidatorConfig::validate`], so a config
/// file cannot carry values the builder would reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ValidatorConfigFile")]
pub struct ValidatorConfig {
    /// Clock skew tolerated on `exp`, `nbf` and `iat`.
    #[serde(with = "humantime_serde", default = "default_leeway")]
    pub(crate) leeway: Duration,

    /// Reject tokens without an `exp` claim.
    #[serde(default = "default_require_expiration")]
    pub(crate) require_expiration: bool,

    /// Reject tokens issued longer ago than this.
    #[serde(with = "humantime_serde", default)]
    pub(crate) max_token_age: Option<Duration>,

    /// Required `iss` claim value.
    #[serde(default)]
    pub(crate) issuer: Option<String>,
}

/// Unvalidated on-disk form of [`ValidatorConfig`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ValidatorConfigFile {
    #[serde(with = "humantime_serde", default = "default_leeway")]
    leeway: Duration,
    #[serde(default = "default_require_expiration")]
    require_expiration: bool,
    #[serde(with = "humantime_serde", default)]
    max_token_age: Option<Duration>,
    #[serde(default)]
    issuer: Option<String>,
}

impl TryFrom<ValidatorConfigFile> for ValidatorConfig {
    type Error = ConfigError;

    fn try_from(file: ValidatorConfigFile) -> Result<Self, Self::Error> {
        let config = Self {
            leeway: file.leeway,
            require_expiration: file.require_expiration,
            max_token_age: file.max_token_age,
            issuer: file.issuer,
        };
        config.validate()?;
        Ok(config)
    }
}

fn default_leeway() -> Duration {
    DEFAULT_LEEWAY
}

fn default_require_expiration() -> bool {
    true
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            leeway: DEFAULT_LEEWAY,
            require_expiration: default_require_expiration(),
            max_token_age: None,
            issuer: None,
        }
    }
}

#[bon::bon]
impl ValidatorConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Optional Fields
    ///
    /// * `leeway` - Clock skew tolerance (default: none, at most [`MAX_LEEWAY`]).
    /// * `require_expiration` - Reject tokens without `exp` (default: true).
    /// * `max_token_age` - Maximum `iat` age (default: unbounded).
    /// * `issuer` - Required `iss` value (default: any).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `leeway` exceeds [`MAX_LEEWAY`]
    /// - `max_token_age` is zero
    /// - `issuer` is empty
    #[builder]
    pub fn new(
        #[builder(default = DEFAULT_LEEWAY)] leeway: Duration,
        #[builder(default = true)] require_expiration: bool,
        max_token_age: Option<Duration>,
        #[builder(into)] issuer: Option<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self { leeway, require_expiration, max_token_age, issuer };
        config.validate()?;
        Ok(config)
    }

    /// Checks invariants.
    ///
    /// # Errors
    ///
    /// See [`ValidatorConfig::new`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leeway > MAX_LEEWAY {
            return Err(ConfigError(format!(
                "leeway {:?} exceeds maximum of {:?}",
                self.leeway, MAX_LEEWAY
            )));
        }

        if self.max_token_age.is_some_and(|age| age.is_zero()) {
            return Err(ConfigError("max_token_age cannot be zero".into()));
        }

        if self.issuer.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError("issuer cannot be empty".into()));
        }

        Ok(())
    }

    /// Clock skew tolerance.
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Whether `exp` is mandatory.
    #[must_use]
    pub fn require_expiration(&self) -> bool {
        self.require_expiration
    }

    /// Maximum token age, if bounded.
    #[must_use]
    pub fn max_token_age(&self) -> Option<Duration> {
        self.max_token_age
    }

    /// Required issuer, if any.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }
}
