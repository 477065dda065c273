//! Runtime configuration, loadable from a TOML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup against the public Sonic Odyssey endpoints.

use crate::error::{OdysseyError, OdysseyResult};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default reward API base URL.
pub const DEFAULT_API_URL: &str = "https://odyssey-api-beta.sonic.game";
/// Default base URL for the stage-claim endpoint.
pub const DEFAULT_CLAIM_API_URL: &str = "https://odyssey-api.sonic.game";
/// Default chain RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://devnet.sonic.game/";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OdysseyConfig {
    pub api: ApiConfig,
    pub chain: ChainConfig,
    pub files: FilesConfig,
    pub retry: RetryConfig,
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub claim_base_url: String,
    pub timeout_secs: u64,
    /// Scheme used when turning `proxy.txt` lines into proxy URLs.
    pub proxy_scheme: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            claim_base_url: DEFAULT_CLAIM_API_URL.to_string(),
            timeout_secs: 30,
            proxy_scheme: "http".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub private_keys: PathBuf,
    pub seed_phrases: PathBuf,
    pub proxies: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            private_keys: PathBuf::from("privateKeys.json"),
            seed_phrases: PathBuf::from("accounts.json"),
            proxies: PathBuf::from("proxy.txt"),
        }
    }
}

/// Retry settings for transaction submission and reward calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.delay_ms))
    }
}

/// Defaults for the fan-out transfer tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub address_count: usize,
    pub amount_sol: f64,
    pub delay_ms: u64,
    /// Retries per transfer. Zero keeps transfers single-shot.
    pub max_retries: u32,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            address_count: 100,
            amount_sol: 0.001,
            delay_ms: 1000,
            max_retries: 0,
        }
    }
}

impl OdysseyConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> OdysseyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            OdysseyError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: OdysseyConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> OdysseyResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> OdysseyResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| OdysseyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> OdysseyResult<()> {
        if self.api.base_url.trim().is_empty() || self.api.claim_base_url.trim().is_empty() {
            return Err(OdysseyError::Config("API base URLs must not be empty".into()));
        }
        if self.chain.rpc_url.trim().is_empty() {
            return Err(OdysseyError::Config("rpc_url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(OdysseyError::Config("api.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
