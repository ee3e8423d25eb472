//! # LTI Core Registration
//!
//! Registration and key chain model shared by LTI Advantage services.
//!
//! This crate provides:
//! - **Key chains**: immutable bundles of public/private key material
//! - **Registrations**: trusted platform/tool pairings, looked up by client id
//! - **Repositories**: lookup contracts plus in-memory implementations
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  find_by_client_id  ┌─────────────────────────┐
//! │ token validation │────────────────────►│ RegistrationRepository  │
//! └──────────────────┘                     │  (memory, db, remote)   │
//!                                          └───────────┬─────────────┘
//!                                                      │ Registration
//!                                                      ▼
//!                                           platform KeyChain → public Key
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Registry error types.
pub mod error;
/// Key chains and key material.
pub mod key_chain;
/// Registration entity.
pub mod registration;
/// Lookup contracts and in-memory implementations.
pub mod repository;

pub use error::{BoxError, RegistryError, RegistryResult};
pub use key_chain::{Key, KeyAlgorithm, KeyChain};
pub use registration::Registration;
pub use repository::{
    KeyChainRepository, MemoryKeyChainRepository, MemoryRegistrationRepository,
    RegistrationRepository,
};
pub use zeroize::Zeroizing;
