//! API Configuration Module
//!
//! Bind address, CORS and batching settings. Configuration is loaded from
//! environment variables with defaults suitable for local development.

use std::net::SocketAddr;
use std::time::Duration;

use revista_core::{ConfigError, RevistaResult};
use revista_loader::BatchConfig;

/// Front-ends allowed to call the API when `REVISTA_CORS_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "https://revista-v2v5.onrender.com",
];

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_host: String,
    pub port: String,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins. Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Batching Configuration
    // ========================================================================
    /// Collection window of every loader, in milliseconds.
    pub batch_window_ms: u64,

    /// Keys per fetch; zero means unbounded.
    pub batch_max_keys: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: "3000".to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
            cors_max_age_secs: 86400,
            batch_window_ms: 1,
            batch_max_keys: 0,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `REVISTA_API_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT`, then `REVISTA_API_PORT`: bind port (default: 3000)
    /// - `REVISTA_CORS_ORIGINS`: comma-separated allowed origins, `*` allows all
    /// - `REVISTA_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    /// - `REVISTA_BATCH_WINDOW_MS`: loader collection window (default: 1)
    /// - `REVISTA_BATCH_MAX_KEYS`: keys per fetch, 0 = unbounded (default: 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("REVISTA_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty() && o != "*")
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Self {
            bind_host: std::env::var("REVISTA_API_BIND").unwrap_or(defaults.bind_host),
            port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("REVISTA_API_PORT").ok())
                .unwrap_or(defaults.port),
            cors_origins,
            cors_max_age_secs: std::env::var("REVISTA_CORS_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cors_max_age_secs),
            batch_window_ms: std::env::var("REVISTA_BATCH_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_window_ms),
            batch_max_keys: std::env::var("REVISTA_BATCH_MAX_KEYS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_max_keys),
        }
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> RevistaResult<SocketAddr> {
        let port = self.port.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
            field: "port".to_string(),
            value: self.port.clone(),
            reason: "expected a number between 0 and 65535".to_string(),
        })?;

        let addr = format!("{}:{}", self.bind_host, port);
        addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue {
                field: "bind_host".to_string(),
                value: self.bind_host.clone(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loader settings shared by every request.
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new()
            .with_window(Duration::from_millis(self.batch_window_ms))
            .with_max_batch_size(self.batch_max_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revista_core::RevistaError;
    use std::num::NonZeroUsize;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.cors_origins.len(), 3);
        assert!(config.cors_origins.contains(&"http://localhost:5173".to_string()));
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.batch_config(), BatchConfig::default());
    }

    #[test]
    fn test_bind_addr() -> RevistaResult<()> {
        let config = ApiConfig {
            bind_host: "127.0.0.1".to_string(),
            port: "8080".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(config.bind_addr()?.port(), 8080);
        Ok(())
    }

    #[test]
    fn test_invalid_port_is_a_config_error() {
        let config = ApiConfig {
            port: "eighty".to_string(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            config.bind_addr(),
            Err(RevistaError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_batch_config_from_settings() {
        let config = ApiConfig {
            batch_window_ms: 5,
            batch_max_keys: 50,
            ..ApiConfig::default()
        };
        let batch = config.batch_config();
        assert_eq!(batch.window, Duration::from_millis(5));
        assert_eq!(batch.max_batch_size, NonZeroUsize::new(50));
    }
}
