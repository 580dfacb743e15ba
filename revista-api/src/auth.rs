//! Authentication Module
//!
//! Turns an `Authorization: Bearer <jwt>` header into a [`Principal`].
//! Every top-level claim of a valid token becomes a principal claim; array
//! claims expand to one claim per element. A missing or rejected token yields
//! an anonymous principal: the request proceeds and authorization decides.

use crate::error::{ApiError, ApiResult};
use crate::identity::{Claim, Principal, ROLE_CLAIM, SUBJECT_CLAIM};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use revista_core::{ConfigError, RevistaError};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock used for token time validation.
///
/// `jsonwebtoken` only reads the system clock, so expiry and not-before are
/// checked here against an injectable clock instead.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds. Negative before 1970.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Test clock helpers for common scenarios.
#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2020-01-01 00:00:00 UTC
    pub fn expired() -> FixedClock {
        FixedClock(1577836800)
    }

    /// 2030-01-01 00:00:00 UTC
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET
// ============================================================================

/// JWT signing secret that never shows up in logs.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, RevistaError> {
        if secret.is_empty() {
            return Err(RevistaError::Config(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            }));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Lifetime of issued tokens in seconds (default: 1 hour)
    pub jwt_expiration_secs: i64,

    /// Clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for token time validation
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret_str = std::env::var("REVISTA_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            jwt_expiration_secs: 3600,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `REVISTA_JWT_SECRET`: JWT signing secret
    /// - `REVISTA_JWT_EXPIRATION_SECS`: issued token lifetime (default: 3600)
    /// - `REVISTA_JWT_CLOCK_SKEW_SECS`: clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jwt_expiration_secs: std::env::var("REVISTA_JWT_EXPIRATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_expiration_secs),
            jwt_clock_skew_secs: std::env::var("REVISTA_JWT_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.jwt_clock_skew_secs),
            ..defaults
        }
    }

    /// Refuse insecure secrets when `REVISTA_ENVIRONMENT` is production.
    /// Elsewhere the problem is only logged.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let environment = std::env::var("REVISTA_ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase();
        let is_production = environment == "production" || environment == "prod";

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "Cannot start server in production with insecure JWT secret. \
                     Set REVISTA_JWT_SECRET to a secure value. \
                     REVISTA_ENVIRONMENT={}",
                    environment
                )));
            }
            tracing::warn!(
                "Using insecure default JWT secret. Set REVISTA_JWT_SECRET before deploying."
            );
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    length = self.jwt_secret.len(),
                    "JWT secret is short; use at least 32 characters in production"
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// TOKEN VALIDATION
// ============================================================================

fn validate_claim_times(now: i64, exp: i64, nbf: Option<i64>, leeway_secs: i64) -> ApiResult<()> {
    if let Some(nbf) = nbf {
        if now + leeway_secs < nbf {
            return Err(ApiError::invalid_token("Token not yet valid (nbf)"));
        }
    }

    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }

    Ok(())
}

/// Check the signature and times of a token and return its claims.
///
/// Times are checked against `config.clock` with `config.jwt_clock_skew_secs`
/// leeway; `exp` is required.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Map<String, Value>> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation).map_err(
        |e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidToken => {
                ApiError::invalid_token("Token is invalid")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        },
    )?;
    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::invalid_token("Token exp claim is not a number"))?;
    let nbf = claims.get("nbf").and_then(Value::as_i64);
    validate_claim_times(now, exp, nbf, config.jwt_clock_skew_secs)?;

    Ok(claims)
}

fn claim_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Flatten decoded token claims into an authenticated principal.
pub fn principal_from_claims(claims: &Map<String, Value>) -> Principal {
    let mut flattened = Vec::new();
    for (name, value) in claims {
        match value {
            Value::Array(items) => flattened.extend(
                items
                    .iter()
                    .filter_map(claim_value)
                    .map(|v| Claim::new(name.clone(), v)),
            ),
            other => flattened.extend(claim_value(other).map(|v| Claim::new(name.clone(), v))),
        }
    }
    Principal::authenticated(flattened)
}

/// Principal for an optional `Authorization` header value.
///
/// Never fails: anything but a valid bearer token gives an anonymous caller.
pub fn authenticate_bearer(config: &AuthConfig, auth_header: Option<&str>) -> Principal {
    let Some(auth_value) = auth_header else {
        return Principal::anonymous();
    };

    let Some(token) = auth_value.strip_prefix("Bearer ") else {
        tracing::warn!("Authorization header does not use the Bearer scheme; continuing anonymously");
        return Principal::anonymous();
    };

    match validate_jwt_token(config, token.trim()) {
        Ok(claims) => principal_from_claims(&claims),
        Err(e) => {
            tracing::warn!(code = %e.code, error = %e.message, "Bearer token rejected; continuing anonymously");
            Principal::anonymous()
        }
    }
}

// ============================================================================
// TOKEN ISSUING
// ============================================================================

/// Sign `claims` as-is, adding `iat` and `exp` when absent.
pub fn encode_claims(config: &AuthConfig, mut claims: Map<String, Value>) -> ApiResult<String> {
    let now = config.clock.now_epoch_secs();
    claims.entry("iat").or_insert_with(|| Value::from(now));
    claims
        .entry("exp")
        .or_insert_with(|| Value::from(now + config.jwt_expiration_secs));

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Issue a token for `subject` carrying `roles` as role claims.
pub fn generate_jwt_token(config: &AuthConfig, subject: &str, roles: &[&str]) -> ApiResult<String> {
    let mut claims = Map::new();
    claims.insert(SUBJECT_CLAIM.to_string(), Value::from(subject));
    if !roles.is_empty() {
        claims.insert(
            ROLE_CLAIM.to_string(),
            Value::Array(roles.iter().map(|r| Value::from(*r)).collect()),
        );
    }
    encode_claims(config, claims)
}

// ============================================================================
// TESTS
// ============================================================================
