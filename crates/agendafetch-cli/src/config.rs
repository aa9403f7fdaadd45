//! CLI configuration.
//!
//! Settings live in `~/.config/agendafetch/config.toml` by default:
//!
//! ```toml
//! debug = false
//!
//! [credentials]
//! api_key = "00000000-0000-0000-0000-000000000000"
//! secret_key = "..."
//! use_timestamp = true
//!
//! [http]
//! timeout = 30
//! verify_tls = true
//! ```
//!
//! Keys can also come from a two-line key file (API key, then secret key).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use agendafetch_providers::FetcherConfig;

use crate::error::{CliError, CliResult};

/// Configuration for the agendafetch CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Debug mode.
    pub debug: bool,

    /// API credentials.
    pub credentials: CredentialSettings,

    /// Transport settings.
    pub http: HttpSettings,
}

/// API key pair used to sign requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    /// Add a `timestamp` parameter to signed requests.
    pub use_timestamp: bool,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            use_timestamp: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Request timeout in seconds.
    pub timeout: u64,

    pub user_agent: Option<String>,

    pub verify_tls: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: FetcherConfig::DEFAULT_TIMEOUT_SECS,
            user_agent: None,
            verify_tls: true,
        }
    }
}

impl CliConfig {
    /// Loads configuration from the default path, or defaults when absent.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agendafetch")
            .join("config.toml")
    }

    /// Replaces the configured keys with those of a key file.
    pub fn apply_key_file(&mut self, path: &Path) -> CliResult<()> {
        let (api_key, secret_key) = load_key_file(path)?;
        self.credentials.api_key = Some(api_key);
        self.credentials.secret_key = Some(secret_key);
        Ok(())
    }

    pub fn to_fetcher_config(&self) -> FetcherConfig {
        let mut config = FetcherConfig::new()
            .with_timestamp(self.credentials.use_timestamp)
            .with_timeout(Duration::from_secs(self.http.timeout));
        if let (Some(api), Some(secret)) = (&self.credentials.api_key, &self.credentials.secret_key) {
            config = config.with_credentials(api, secret);
        }
        if let Some(ref agent) = self.http.user_agent {
            config = config.with_user_agent(agent);
        }
        if !self.http.verify_tls {
            config = config.with_insecure_tls();
        }
        config
    }
}

/// Reads an API key and a secret key from the first two non-blank lines of `path`.
pub fn load_key_file(path: &Path) -> CliResult<(String, String)> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(api), Some(secret)) => Ok((api.to_string(), secret.to_string())),
        _ => Err(CliError::Config(format!(
            "{} must hold the API key and the secret key on two lines",
            path.display()
        ))),
    }
}
