//! Error types for Revista operations
//!
//! Every error is `Clone`: a failed batch fetch is handed to every waiter of
//! that batch, so the same value has to be reproduced once per waiter.

use crate::{EntityKind, LookupKey, NaturalKey};
use thiserror::Error;

/// Document store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Collection {kind} unavailable: {reason}")]
    Unavailable { kind: EntityKind, reason: String },

    #[error("Malformed {kind} document: {reason}")]
    MalformedDocument { kind: EntityKind, reason: String },

    #[error("Duplicate {kind} document with id {id}")]
    DuplicateKey { kind: EntityKind, id: NaturalKey },

    #[error("{kind} document {id} does not exist")]
    MissingDocument { kind: EntityKind, id: NaturalKey },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Batching layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Key {key} cannot be loaded by the {loader} loader (expects {expected})")]
    KindMismatch {
        loader: &'static str,
        expected: EntityKind,
        key: LookupKey,
    },

    #[error("Request cache entry for {loader} holds a different value type")]
    CacheTypeMismatch { loader: &'static str },

    #[error("Batch state lock poisoned for {loader}")]
    LockPoisoned { loader: &'static str },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Revista errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevistaError {
    /// A resource or key the caller asked for does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The domain refuses the requested operation.
    #[error("{0}")]
    InvalidOperation(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Claim source error: {0}")]
    ClaimSource(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl RevistaError {
    /// Absence of a single document, worded for the caller.
    pub fn not_found(kind: EntityKind, id: impl std::fmt::Display) -> Self {
        RevistaError::NotFound(format!("{} with id '{}' was not found", kind, id))
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        RevistaError::InvalidOperation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        RevistaError::Unauthorized(message.into())
    }
}

/// Result type alias for Revista operations.
pub type RevistaResult<T> = Result<T, RevistaError>;

// =============================================================================
// TESTS
// =============================================================================
