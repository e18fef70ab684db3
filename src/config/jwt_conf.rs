use std::env;
use tracing::{debug, error, info, warn};

use crate::config::ConfigError;

/// Seven days.
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 7 * 24 * 60;

/// JWT configuration structure
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub jwt_secret: String,
    /// Token validity in minutes
    pub expiration_minutes: i64,
    /// JWT issuer (optional)
    pub jwt_issuer: Option<String>,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables
    ///
    /// Expected environment variables:
    /// - JWT_SECRET: Secret key for signing JWT tokens (required, at least 32 characters)
    /// - JWT_EXPIRATION_MINUTES: Token validity in minutes (defaults to 10080 = 7 days)
    /// - JWT_ISSUER: JWT issuer (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from environment variables");
        Self::load("")
    }

    /// Same as [`JwtConfig::from_env`] but reads `TEST_` prefixed variables.
    pub fn from_test_env() -> Result<Self, ConfigError> {
        info!("Loading JWT configuration from test environment variables");
        Self::load("TEST_")
    }

    fn load(prefix: &str) -> Result<Self, ConfigError> {
        let secret_var = format!("{}JWT_SECRET", prefix);
        let jwt_secret = env::var(&secret_var).map_err(|_| {
            error!("{} environment variable not found", secret_var);
            ConfigError::EnvVarNotFound(secret_var.clone())
        })?;
        debug!("JWT secret loaded (length: {} chars)", jwt_secret.len());

        let expiration_var = format!("{}JWT_EXPIRATION_MINUTES", prefix);
        let expiration_minutes = match env::var(&expiration_var) {
            Ok(raw) => raw.parse::<i64>().map_err(|e| {
                error!("Invalid {} value: {}", expiration_var, e);
                ConfigError::ParseError(format!("{}: {}", expiration_var, e))
            })?,
            Err(_) => {
                warn!("{} not set, using default: {} minutes (7 days)", expiration_var, DEFAULT_EXPIRATION_MINUTES);
                DEFAULT_EXPIRATION_MINUTES
            }
        };
        debug!("JWT expiration: {} minutes", expiration_minutes);

        let jwt_issuer = env::var(format!("{}JWT_ISSUER", prefix)).ok();
        if let Some(ref issuer) = jwt_issuer {
            debug!("JWT issuer: {}", issuer);
        }

        let config = JwtConfig {
            jwt_secret,
            expiration_minutes,
            jwt_issuer,
        };
        config.validate()?;

        info!("JWT configuration loaded successfully");
        Ok(config)
    }

    /// Validate the JWT configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!("Validating JWT configuration");

        if self.jwt_secret.len() < 32 {
            error!("JWT secret is too short (minimum 32 characters required)");
            return Err(ConfigError::ValidationError("JWT secret must be at least 32 characters long".to_string()));
        }

        if self.expiration_minutes <= 0 {
            error!("Token expiration must be greater than 0");
            return Err(ConfigError::ValidationError("Token expiration must be greater than 0".to_string()));
        }

        debug!("JWT configuration validation passed");
        Ok(())
    }
}

/// Create JWT configuration for testing with default values
impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig {
            jwt_secret: "test_secret_key_for_jwt_testing_should_be_long_enough_for_security_purposes".to_string(),
            expiration_minutes: DEFAULT_EXPIRATION_MINUTES,
            jwt_issuer: Some("healthcare-plus-test".to_string()),
        }
    }
}
