//! Registration entity.

use serde::{Deserialize, Serialize};

use crate::key_chain::KeyChain;

/// A trusted platform/tool pairing known to this service.
///
/// Registrations are looked up by the OAuth2 `client_id` the platform
/// assigned to the tool. A registration carries at most one platform key
/// chain (used to verify tokens the platform issues) and at most one tool
/// key chain (used to sign tokens the tool issues).
///
/// # Example
///
/// ```
/// use lti_core_registration::{Key, KeyAlgorithm, KeyChain, Registration};
///
/// let registration = Registration::builder()
///     .id("registration-1")
///     .client_id("client-1")
///     .deployment_ids(vec!["deployment-1".to_owned()])
///     .platform_key_chain(
///         KeyChain::builder()
///             .id("platform-kid")
///             .key_set_name("platformSet")
///             .public_key(Key::new(KeyAlgorithm::RS256, "-----BEGIN PUBLIC KEY-----"))
///             .build(),
///     )
///     .build();
///
/// assert!(registration.platform_key_chain().is_some());
/// assert_eq!(registration.default_deployment_id(), Some("deployment-1"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct Registration {
    /// Registration identifier.
    #[builder(into)]
    id: String,

    /// OAuth2 client identifier assigned by the platform.
    #[builder(into)]
    client_id: String,

    /// Deployment identifiers, in declaration order.
    #[serde(default)]
    #[builder(default)]
    deployment_ids: Vec<String>,

    /// Key chain of the platform, used to verify inbound tokens.
    #[serde(default)]
    platform_key_chain: Option<KeyChain>,

    /// Key chain of the tool, used to sign outbound tokens.
    #[serde(default)]
    tool_key_chain: Option<KeyChain>,
}

impl Registration {
    /// Registration identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// OAuth2 client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Deployment identifiers.
    #[must_use]
    pub fn deployment_ids(&self) -> &[String] {
        &self.deployment_ids
    }

    /// Whether `deployment_id` belongs to this registration.
    #[must_use]
    pub fn has_deployment_id(&self, deployment_id: &str) -> bool {
        self.deployment_ids.iter().any(|id| id == deployment_id)
    }

    /// First declared deployment identifier.
    #[must_use]
    pub fn default_deployment_id(&self) -> Option<&str> {
        self.deployment_ids.first().map(String::as_str)
    }

    /// Platform key chain.
    #[must_use]
    pub fn platform_key_chain(&self) -> Option<&KeyChain> {
        self.platform_key_chain.as_ref()
    }

    /// Tool key chain.
    #[must_use]
    pub fn tool_key_chain(&self) -> Option<&KeyChain> {
        self.tool_key_chain.as_ref()
    }
}
