use crate::auth::ServiceAccountCredentials;
use crate::error::{AppError, Result};
use crate::sheets::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_DIR_PREFIX: &str = "sheets-edge-client";

pub const ENV_CLIENT_EMAIL: &str = "SHEETS_CLIENT_EMAIL";
pub const ENV_PRIVATE_KEY: &str = "SHEETS_PRIVATE_KEY";
pub const ENV_SPREADSHEET_ID: &str = "SHEETS_SPREADSHEET_ID";

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_API_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub google: GoogleConfig,
    pub auth: AuthConfig,
    pub retry: RetryConfig,
    pub sheets: SheetsApiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_email: String,
    pub private_key: String,
    pub spreadsheet_id: String,
}

impl GoogleConfig {
    pub fn credentials(&self) -> ServiceAccountCredentials {
        ServiceAccountCredentials::new(&self.client_email, &self.private_key)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub token_url: String,
    /// Lifetime requested in the JWT `exp` claim
    pub token_lifetime_secs: u64,
    /// Cached tokens are treated as expired this long before their real expiry
    pub expiry_buffer_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token_lifetime_secs: 3600,
            expiry_buffer_secs: 300,
        }
    }
}

impl AuthConfig {
    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_secs)
    }

    pub fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 8000,
            multiplier: 2.0,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SheetsApiConfig {
    pub api_base_url: String,
}

impl Default for SheetsApiConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file()?;

        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(&config_path)?;
            Self::from_toml(&contents)?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Overwrite credential fields with any non-empty value returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = [
            (ENV_CLIENT_EMAIL, &mut self.google.client_email),
            (ENV_PRIVATE_KEY, &mut self.google.private_key),
            (ENV_SPREADSHEET_ID, &mut self.google.spreadsheet_id),
        ];

        for (key, field) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
    }

    fn xdg_dirs() -> xdg::BaseDirectories {
        xdg::BaseDirectories::with_prefix(CONFIG_DIR_PREFIX)
    }

    /// Get the config file path
    pub fn config_file() -> Result<PathBuf> {
        let xdg_dirs = Self::xdg_dirs();
        xdg_dirs
            .place_config_file("config.toml")
            .map_err(|e| AppError::Config(format!("Failed to create config directory: {}", e)))
    }
}
