//! JWT algorithm validation.
//!
//! Ensures only asymmetric algorithms a [`Key`](lti_core_registration::Key)
//! can carry are ever accepted, and that a token's header names the same
//! algorithm as the key it is verified with.
//!
//! # Security
//!
//! - Symmetric algorithms and "none" are always rejected
//! - The header algorithm must equal the key algorithm, preventing algorithm substitution

use lti_core_registration::KeyAlgorithm;

use crate::error::{AuthError, Result};

/// Forbidden JWT algorithms that are never accepted.
///
/// - `none`: no signature at all
/// - `HS256`, `HS384`, `HS512`: symmetric, would turn a public key into a shared secret
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms, one per [`KeyAlgorithm`] variant.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256", "RS384", "RS512", "ES256", "ES384", "EdDSA"];

/// Validate a JWT algorithm name against security policies.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is forbidden
/// or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use lti_core_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("EdDSA").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<()> {
    if FORBIDDEN_ALGORITHMS.iter().any(|forbidden| forbidden.eq_ignore_ascii_case(alg)) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list"
        )));
    }

    Ok(())
}

/// Validate that a token header algorithm matches the verification key.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if `alg` fails
/// [`validate_algorithm`] or differs from `expected`.
pub fn validate_algorithm_for_key(alg: &str, expected: KeyAlgorithm) -> Result<()> {
    validate_algorithm(alg)?;

    if alg != expected.as_str() {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' does not match key algorithm '{expected}'"
        )));
    }

    Ok(())
}

/// Maps a key algorithm onto the `jsonwebtoken` algorithm.
#[must_use]
pub fn jwt_algorithm(algorithm: KeyAlgorithm) -> jsonwebtoken::Algorithm {
    use jsonwebtoken::Algorithm;

    match algorithm {
        KeyAlgorithm::RS256 => Algorithm::RS256,
        KeyAlgorithm::RS384 => Algorithm::RS384,
        KeyAlgorithm::RS512 => Algorithm::RS512,
        KeyAlgorithm::ES256 => Algorithm::ES256,
        KeyAlgorithm::ES384 => Algorithm::ES384,
        KeyAlgorithm::EdDSA => Algorithm::EdDSA,
    }
}
