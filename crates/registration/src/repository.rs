//! Lookup contracts for registrations and key chains.
//!
//! The [`RegistrationRepository`] and [`KeyChainRepository`] traits abstract
//! wherever registrations live (configuration files, a database, a remote
//! registry). In-memory implementations are provided for tests and for
//! services that load their registrations once at startup.
//!
//! # Not Found vs. Failure
//!
//! Lookups return `Ok(None)` when nothing matches. `Err` is reserved for
//! infrastructure failures (connection loss, timeouts), letting callers
//! distinguish a permanent miss from a retryable outage.
//!
//! # Usage
//!
//! ```
//! use lti_core_registration::{
//!     MemoryRegistrationRepository, Registration, RegistrationRepository,
//! };
//!
//! let repository = MemoryRegistrationRepository::new();
//! repository
//!     .insert(Registration::builder().id("reg-1").client_id("client-1").build())
//!     .unwrap();
//!
//! let found = repository.find_by_client_id("client-1").unwrap();
//! assert_eq!(found.map(|r| r.id().to_owned()), Some("reg-1".to_owned()));
//! assert!(repository.find_by_client_id("client-2").unwrap().is_none());
//! ```

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    error::{RegistryError, RegistryResult},
    key_chain::KeyChain,
    registration::Registration,
};

/// Read access to registrations.
///
/// Implementations may block (network or database backed). Callers impose no
/// timeout of their own; an implementation that gives up must report it as
/// [`RegistryError::Timeout`].
pub trait RegistrationRepository: Send + Sync {
    /// Finds a registration by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    fn find(&self, id: &str) -> RegistryResult<Option<Registration>>;

    /// Lists every registration.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    fn find_all(&self) -> RegistryResult<Vec<Registration>>;

    /// Finds the registration owning the given OAuth2 client identifier.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    fn find_by_client_id(&self, client_id: &str) -> RegistryResult<Option<Registration>>;
}

impl<R: RegistrationRepository + ?Sized> RegistrationRepository for Arc<R> {
    fn find(&self, id: &str) -> RegistryResult<Option<Registration>> {
        (**self).find(id)
    }

    fn find_all(&self) -> RegistryResult<Vec<Registration>> {
        (**self).find_all()
    }

    fn find_by_client_id(&self, client_id: &str) -> RegistryResult<Option<Registration>> {
        (**self).find_by_client_id(client_id)
    }
}

/// Read access to key chains, for key set discovery.
pub trait KeyChainRepository: Send + Sync {
    /// Finds a key chain by its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    fn find(&self, id: &str) -> RegistryResult<Option<KeyChain>>;

    /// Lists the key chains belonging to a key set, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error only on infrastructure failure.
    fn find_by_key_set_name(&self, key_set_name: &str) -> RegistryResult<Vec<KeyChain>>;
}

/// In-memory [`RegistrationRepository`].
///
/// Clones share the same underlying map.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistrationRepository {
    /// Registrations indexed by identifier.
    registrations: Arc<RwLock<HashMap<String, Registration>>>,
}

impl MemoryRegistrationRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `registrations`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] if two registrations share an
    /// identifier or a client identifier.
    pub fn with_registrations(
        registrations: impl IntoIterator<Item = Registration>,
    ) -> RegistryResult<Self> {
        let repository = Self::new();
        for registration in registrations {
            repository.insert(registration)?;
        }
        Ok(repository)
    }

    /// Adds a registration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] if the identifier or the client
    /// identifier is already registered.
    #[tracing::instrument(skip(self, registration), fields(id = %registration.id()))]
    pub fn insert(&self, registration: Registration) -> RegistryResult<()> {
        let mut registrations = self.registrations.write();

        if registrations.contains_key(registration.id()) {
            return Err(RegistryError::conflict(registration.id()));
        }
        if registrations.values().any(|r| r.client_id() == registration.client_id()) {
            return Err(RegistryError::conflict(registration.client_id()));
        }

        registrations.insert(registration.id().to_owned(), registration);
        Ok(())
    }

    /// Removes a registration.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no registration has this identifier.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: &str) -> RegistryResult<Registration> {
        self.registrations.write().remove(id).ok_or_else(|| RegistryError::not_found(id))
    }

    /// Number of stored registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }
}

impl RegistrationRepository for MemoryRegistrationRepository {
    #[tracing::instrument(skip(self))]
    fn find(&self, id: &str) -> RegistryResult<Option<Registration>> {
        Ok(self.registrations.read().get(id).cloned())
    }

    fn find_all(&self) -> RegistryResult<Vec<Registration>> {
        let mut all: Vec<Registration> = self.registrations.read().values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(all)
    }

    #[tracing::instrument(skip(self))]
    fn find_by_client_id(&self, client_id: &str) -> RegistryResult<Option<Registration>> {
        let registrations = self.registrations.read();
        Ok(registrations.values().find(|r| r.client_id() == client_id).cloned())
    }
}

/// In-memory [`KeyChainRepository`].
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyChainRepository {
    key_chains: Arc<RwLock<HashMap<String, KeyChain>>>,
}

impl MemoryKeyChainRepository {
    /// Creates a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key chain.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] if the identifier is taken.
    pub fn insert(&self, key_chain: KeyChain) -> RegistryResult<()> {
        let mut key_chains = self.key_chains.write();

        if key_chains.contains_key(key_chain.id()) {
            return Err(RegistryError::conflict(key_chain.id()));
        }

        key_chains.insert(key_chain.id().to_owned(), key_chain);
        Ok(())
    }

    /// Removes a key chain.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] if no key chain has this identifier.
    pub fn remove(&self, id: &str) -> RegistryResult<KeyChain> {
        self.key_chains.write().remove(id).ok_or_else(|| RegistryError::not_found(id))
    }
}

impl KeyChainRepository for MemoryKeyChainRepository {
    fn find(&self, id: &str) -> RegistryResult<Option<KeyChain>> {
        Ok(self.key_chains.read().get(id).cloned())
    }

    fn find_by_key_set_name(&self, key_set_name: &str) -> RegistryResult<Vec<KeyChain>> {
        let mut matching: Vec<KeyChain> = self
            .key_chains
            .read()
            .values()
            .filter(|chain| chain.key_set_name() == key_set_name)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(matching)
    }
}
