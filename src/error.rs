//! Crate-wide error type.
//!
//! Grounded in the teacher's `RegistryError` (packages/service-discovery/src/lib.rs),
//! generalized from a single-registry client error to the two wire backends this
//! daemon talks to.

use thiserror::Error;

/// Errors surfaced by a registry wire client (Eureka or AWS Cloud Map).
///
/// All variants are scoped to a single call; callers decide whether a failure
/// aborts the current item, is logged and skipped, or is treated as success
/// (already-exists collisions).
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("service not found: {service}")]
    ServiceNotFound { service: String },

    #[error("service already exists: {service}")]
    ServiceAlreadyExists { service: String },

    #[error("network error: {message}")]
    NetworkError { message: String },

    #[error("configuration error: {message}")]
    ConfigError { message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("{backend} backend error: {message}")]
    BackendError { backend: &'static str, message: String },
}

impl RegistryError {
    pub fn network(message: impl Into<String>) -> Self {
        RegistryError::NetworkError { message: message.into() }
    }

    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        RegistryError::BackendError { backend, message: message.into() }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        RegistryError::SerializationError { message: message.into() }
    }
}
