use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::ConfigError;
use crate::repository::file_store::WriteMode;

/// What deleting an account does to the user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletionMode {
    /// Deactivate, stamp `deletedAt` and free the email address.
    #[default]
    Soft,
    /// Remove the record.
    Hard,
}

impl FromStr for DeletionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(DeletionMode::Soft),
            "hard" => Ok(DeletionMode::Hard),
            other => Err(format!("unknown deletion mode '{}', expected soft or hard", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub deletion_mode: DeletionMode,
    pub write_mode: WriteMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            data_dir: PathBuf::from("./data"),
            deletion_mode: DeletionMode::default(),
            write_mode: WriteMode::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let host = env::var("APP_HOST").unwrap_or(defaults.host);
        let port = match env::var("APP_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| ConfigError::ParseError(format!("APP_PORT: {}", e)))?,
            Err(_) => defaults.port,
        };
        let data_dir = env::var("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir);

        let deletion_mode = match env::var("ACCOUNT_DELETION_MODE") {
            Ok(raw) => raw.parse().map_err(ConfigError::InvalidValue)?,
            Err(_) => defaults.deletion_mode,
        };
        let write_mode = match env::var("STORE_WRITE_MODE") {
            Ok(raw) => raw.parse().map_err(ConfigError::InvalidValue)?,
            Err(_) => defaults.write_mode,
        };
        if write_mode == WriteMode::LastWriterWins {
            warn!("Store runs in last-writer-wins mode; concurrent writes to one collection may be lost");
        }

        info!(
            host = %host,
            port,
            data_dir = %data_dir.display(),
            ?deletion_mode,
            ?write_mode,
            "Application configuration loaded"
        );
        Ok(AppConfig { host, port, data_dir, deletion_mode, write_mode })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
