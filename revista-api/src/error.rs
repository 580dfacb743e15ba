//! Error Types for the Revista API
//!
//! This module defines the service boundary's view of failures:
//! - ErrorCode enum naming every code a caller can observe
//! - ApiError struct, the (code, message) record returned to callers
//! - map_failure, which rewrites domain failures into boundary codes
//! - GraphQL integration that exposes the code as `extensions.code`

use async_graphql::ErrorExtensions;
use revista_core::{RevistaError, RevistaResult, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Boundary codes produced by the error mapper
    // ========================================================================
    /// A requested resource or key does not exist
    ResourceNotFound,

    /// The domain refused the requested operation
    BusinessInvalidOperation,

    // ========================================================================
    // Native codes, one per internal failure kind
    // ========================================================================
    NotFound,
    InvalidOperation,
    AuthNotAuthorized,
    StorageFailure,
    LoaderFailure,
    ClaimSourceFailure,
    ConfigurationInvalid,

    // ========================================================================
    // Transport and authentication
    // ========================================================================
    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    /// Request contains invalid input data
    InvalidInput,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Wire form of the code, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::BusinessInvalidOperation => "BUSINESS_INVALID_OPERATION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidOperation => "INVALID_OPERATION",
            ErrorCode::AuthNotAuthorized => "AUTH_NOT_AUTHORIZED",
            ErrorCode::StorageFailure => "STORAGE_FAILURE",
            ErrorCode::LoaderFailure => "LOADER_FAILURE",
            ErrorCode::ClaimSourceFailure => "CLAIM_SOURCE_FAILURE",
            ErrorCode::ConfigurationInvalid => "CONFIGURATION_INVALID",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error record returned at the service boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The failure under its own code, message untouched.
    pub fn native(err: &RevistaError) -> Self {
        let code = match err {
            RevistaError::NotFound(_) => ErrorCode::NotFound,
            RevistaError::InvalidOperation(_) => ErrorCode::InvalidOperation,
            RevistaError::Unauthorized(_) => ErrorCode::AuthNotAuthorized,
            RevistaError::Storage(_) => ErrorCode::StorageFailure,
            RevistaError::Loader(_) => ErrorCode::LoaderFailure,
            RevistaError::ClaimSource(_) => ErrorCode::ClaimSourceFailure,
            RevistaError::Config(_) => ErrorCode::ConfigurationInvalid,
        };
        Self::new(code, err.to_string())
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired, "Token has expired")
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// ERROR MAPPER
// ============================================================================

/// How the boundary treats an internal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    InvalidOperation,
    Unmapped,
}

impl FailureKind {
    pub fn of(err: &RevistaError) -> Self {
        match err {
            RevistaError::NotFound(_)
            | RevistaError::Storage(StorageError::MissingDocument { .. }) => FailureKind::NotFound,
            RevistaError::InvalidOperation(_) => FailureKind::InvalidOperation,
            _ => FailureKind::Unmapped,
        }
    }
}

/// Translate an internal failure into the record a caller sees.
///
/// Not-found and invalid-operation failures get their boundary codes; every
/// other failure keeps its native code. The message is never rewritten.
pub fn map_failure(err: &RevistaError) -> ApiError {
    match FailureKind::of(err) {
        FailureKind::NotFound => ApiError::new(ErrorCode::ResourceNotFound, err.to_string()),
        FailureKind::InvalidOperation => {
            ApiError::new(ErrorCode::BusinessInvalidOperation, err.to_string())
        }
        FailureKind::Unmapped => ApiError::native(err),
    }
}

impl From<RevistaError> for ApiError {
    fn from(err: RevistaError) -> Self {
        map_failure(&err)
    }
}

// ============================================================================
// GRAPHQL INTEGRATION
// ============================================================================

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        let code = self.code.as_str();
        async_graphql::Error::new(self.message.clone()).extend_with(|_, e| {
            e.set("code", code.to_string());
        })
    }
}

/// Convert a fallible result into a GraphQL result carrying `extensions.code`.
pub trait IntoGraphQL<T> {
    fn into_graphql(self) -> async_graphql::Result<T>;
}

impl<T> IntoGraphQL<T> for RevistaResult<T> {
    fn into_graphql(self) -> async_graphql::Result<T> {
        self.map_err(|err| map_failure(&err).extend())
    }
}

impl<T> IntoGraphQL<T> for ApiResult<T> {
    fn into_graphql(self) -> async_graphql::Result<T> {
        self.map_err(|err| err.extend())
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
